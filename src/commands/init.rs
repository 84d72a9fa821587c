use anyhow::{bail, Context, Result};
use jurisearch::config::{Config, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use tracing::info;

pub async fn init_config(path: PathBuf, force: bool) -> Result<()> {
    std::fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create directory {}", path.display()))?;
    let config_path = path.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let config = Config::default();
    let body = toml::to_string_pretty(&config).context("Failed to serialize default config")?;
    let content = format!(
        r#"# jurisearch configuration
#
# [embedding] backend is "hash" (offline, deterministic) or "http"
# (OpenAI-compatible /v1/embeddings; the API key may come from OPENAI_API_KEY).
# [lexical] tokenizer is "unicode" or "cjk_bigram".
# [vector] metric is "cosine" or "inner_product".

{}"#,
        body
    );
    std::fs::write(&config_path, content)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    info!("Created configuration at {}", config_path.display());
    println!("Created configuration at {}", config_path.display());
    println!("\nNext steps:");
    println!("  jurisearch index corpus.jsonl");
    println!("  jurisearch search \"your query\"");
    Ok(())
}

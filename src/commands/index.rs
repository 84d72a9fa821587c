use anyhow::{Context, Result};
use jurisearch::{config::Config, import::JsonlSource, RetrievalEngine};
use std::path::PathBuf;
use tracing::{info, warn};

pub async fn index_corpus(config: Config, path: PathBuf, max_docs: Option<usize>) -> Result<()> {
    if !config.storage.persist {
        warn!("storage.persist is false; the indexed corpus will not be kept");
    }

    let engine = RetrievalEngine::from_config(config)?;
    let source = JsonlSource::open(&path)
        .with_context(|| format!("Failed to open corpus {}", path.display()))?;

    info!("Indexing corpus: {}", path.display());
    let stats = engine.import(source, max_docs).await?;
    engine.save()?;

    println!("\nImport complete:");
    println!("  Records read:       {}", stats.records_read);
    println!("  Documents added:    {}", stats.documents_added);
    println!("  Documents replaced: {}", stats.documents_replaced);
    println!("  Records skipped:    {}", stats.records_skipped);
    println!("  Index generation:   {}", stats.generation);
    println!(
        "  Time:               {:.1}s ({:.1} docs/s)",
        stats.elapsed_seconds,
        stats.docs_per_second()
    );
    Ok(())
}

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use jurisearch::{
    config::Config, util::truncate_str, RetrievalEngine, RetrievalOutcome,
};
use std::time::Duration;
use tracing::info;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub async fn search_index(
    config: Config,
    query_text: String,
    top_k: Option<usize>,
    timeout_ms: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    let top_k = top_k.unwrap_or(config.retrieval.default_top_k);
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.retrieval.timeout());

    let engine = RetrievalEngine::from_config(config)?;
    info!("Searching for: {}", query_text);
    let outcome = match engine.retrieve(&query_text, top_k, timeout).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_input_error() => bail!("Invalid search request: {}", e),
        Err(e) => return Err(e).context("Search failed"),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => print_results(&engine, &outcome),
    }
    Ok(())
}

fn print_results(engine: &RetrievalEngine, outcome: &RetrievalOutcome) {
    println!(
        "\nSearch Results ({} documents, {}ms, weights lexical={:.2} semantic={:.2}):",
        outcome.results.len(),
        outcome.elapsed_ms,
        outcome.applied_weights.lexical,
        outcome.applied_weights.semantic,
    );
    if let Some(source) = outcome.missing_source {
        let reason = outcome
            .missing_reason
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_default();
        println!("DEGRADED: {} retrieval unavailable ({})", source, reason);
    }
    println!();

    let snapshot = engine.indexer().snapshot();
    for (i, hit) in outcome.results.iter().enumerate() {
        println!("{}. [Score: {:.5}] {}", i + 1, hit.fused_score, hit.document_id);

        let mut matched = Vec::new();
        if let Some(rank) = hit.contributing_ranks.lexical {
            matched.push(format!("lexical #{} ({:.3})", rank, hit.lexical_score.unwrap_or_default()));
        }
        if let Some(rank) = hit.contributing_ranks.semantic {
            matched.push(format!("semantic #{} ({:.3})", rank, hit.semantic_score.unwrap_or_default()));
        }
        println!("   Matched by: {}", matched.join(", "));

        for (key, value) in &hit.source_metadata {
            println!("   {}: {}", key, value);
        }
        if let Some(doc) = snapshot.documents().get(&hit.document_id) {
            println!("   {}", truncate_str(&doc.text, 200));
        }
        println!();
    }
}

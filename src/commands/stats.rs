use super::OutputFormat;
use anyhow::Result;
use jurisearch::{config::Config, RetrievalEngine};
use tracing::info;

pub async fn show_stats(config: Config, format: OutputFormat) -> Result<()> {
    info!("Loading index statistics...");
    let data_dir = config.storage.data_dir.clone();
    let backend = config.embedding.backend.clone();
    let engine = RetrievalEngine::from_config(config)?;
    let stats = engine.stats();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => {
            println!("\njurisearch Statistics:");
            println!("======================");
            println!("Data directory:       {}", data_dir.display());
            println!("Snapshot generation:  {}", stats.generation);
            println!("Documents:            {}", stats.documents);
            println!("Distinct terms:       {}", stats.terms);
            println!("Total tokens:         {}", stats.total_tokens);
            println!("Average doc length:   {:.1}", stats.avg_doc_length);
            println!("Vectors:              {}", stats.vectors);
            println!("Embedding dimensions: {}", stats.dimensions);
            println!("Embedding backend:    {}", backend);
            println!("Tokenizer:            {}", stats.tokenizer);
        }
    }
    Ok(())
}

use anyhow::Result;
use jurisearch::{config::Config, RetrievalEngine};

pub async fn remove_documents(config: Config, ids: Vec<String>) -> Result<()> {
    let engine = RetrievalEngine::from_config(config)?;
    let report = engine.remove_documents(&ids)?;
    engine.save()?;

    println!(
        "Removed {} of {} documents (index generation {})",
        report.removed,
        ids.len(),
        report.generation
    );
    Ok(())
}

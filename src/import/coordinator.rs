//! Import coordinator: batches records through the embedder into the index

use super::source::{CorpusRecord, CorpusSource, ImportError, ImportStats};
use crate::embedding::EmbeddingBackend;
use crate::retrieval::HybridIndexer;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default records per embedding/indexing batch
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Streams a corpus into a [`HybridIndexer`].
///
/// Each batch is embedded with one `embed_batch` call and published as one
/// snapshot. Malformed records are skipped and counted; embedding or
/// indexing failures abort the import, leaving earlier batches in place.
pub struct ImportCoordinator<'a> {
    indexer: &'a HybridIndexer,
    embedder: Arc<dyn EmbeddingBackend>,
    batch_size: usize,
    max_documents: Option<usize>,
}

impl<'a> ImportCoordinator<'a> {
    pub fn new(indexer: &'a HybridIndexer, embedder: Arc<dyn EmbeddingBackend>) -> Self {
        Self {
            indexer,
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
            max_documents: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Stop after this many records have been indexed
    pub fn with_max_documents(mut self, max_documents: Option<usize>) -> Self {
        self.max_documents = max_documents;
        self
    }

    pub async fn import<S: CorpusSource>(&self, mut source: S) -> Result<ImportStats, ImportError> {
        let start = Instant::now();
        let mut stats = ImportStats {
            generation: self.indexer.snapshot().generation(),
            ..ImportStats::default()
        };
        let name = source.source_name().to_string();
        info!("Importing corpus from {}", name);

        let mut batch: Vec<CorpusRecord> = Vec::with_capacity(self.batch_size);
        let mut accepted = 0usize;

        for item in source.records() {
            if self.max_documents.is_some_and(|max| accepted >= max) {
                break;
            }
            stats.records_read += 1;

            let record = match item {
                Ok(record) => record,
                Err(e) if e.is_record_error() => {
                    warn!("Skipping record from {}: {}", name, e);
                    stats.records_skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if record.id.trim().is_empty() || record.text.trim().is_empty() {
                warn!("Skipping record with empty id or text (id '{}')", record.id);
                stats.records_skipped += 1;
                continue;
            }

            accepted += 1;
            batch.push(record);
            if batch.len() >= self.batch_size {
                self.flush(&mut batch, &mut stats).await?;
            }
        }
        self.flush(&mut batch, &mut stats).await?;

        stats.elapsed_seconds = start.elapsed().as_secs_f64();
        info!(
            "Import complete: {} indexed ({} new, {} replaced), {} skipped in {:.1}s ({:.1} docs/s)",
            stats.documents_indexed(),
            stats.documents_added,
            stats.documents_replaced,
            stats.records_skipped,
            stats.elapsed_seconds,
            stats.docs_per_second()
        );
        Ok(stats)
    }

    async fn flush(
        &self,
        batch: &mut Vec<CorpusRecord>,
        stats: &mut ImportStats,
    ) -> Result<(), ImportError> {
        if batch.is_empty() {
            return Ok(());
        }

        let records = std::mem::take(batch);
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != records.len() {
            return Err(ImportError::Index(format!(
                "embedder returned {} vectors for {} records",
                embeddings.len(),
                records.len()
            )));
        }

        let documents = records
            .into_iter()
            .zip(embeddings)
            .map(|(record, embedding)| record.into_document(embedding))
            .collect();

        let report = self
            .indexer
            .add_documents(documents)
            .map_err(|e| ImportError::Index(format!("{:#}", e)))?;

        stats.documents_added += report.added;
        stats.documents_replaced += report.replaced;
        stats.batches += 1;
        stats.generation = report.generation;
        debug!(
            "Batch {} indexed: {} new, {} replaced (generation {})",
            stats.batches, report.added, report.replaced, report.generation
        );
        Ok(())
    }
}

//! Retrieval engine facade
//!
//! Wires one configuration into the pieces that must agree with each other:
//! the tokenizer shared by indexing and querying, the embedding provider
//! whose dimensionality sizes the vector index, the single index writer and
//! the query coordinator reading its snapshots.

use crate::config::Config;
use crate::embedding::{create_backend_from_config, EmbeddingBackend};
use crate::import::{CorpusSource, ImportCoordinator, ImportStats};
use crate::index::{Bm25Params, CorpusStorage, IndexSnapshot, IndexStats};
use crate::query::{QueryCoordinator, RetrievalError};
use crate::retrieval::{BatchReport, HybridIndexer, LegalQueryClassifier, RrfConfig};
use crate::text::build_tokenizer;
use crate::types::{DocumentId, Metadata, NewDocument, RetrievalOutcome};
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Hybrid retrieval engine over one corpus
pub struct RetrievalEngine {
    config: Config,
    embedder: Arc<dyn EmbeddingBackend>,
    indexer: HybridIndexer,
    coordinator: QueryCoordinator,
}

impl RetrievalEngine {
    /// Build the engine with the embedding backend named in the config
    pub fn from_config(config: Config) -> Result<Self> {
        let embedder = create_backend_from_config(&config.embedding)
            .context("Failed to create embedding backend")?;
        Self::with_embedder(config, embedder)
    }

    /// Build the engine around an existing embedding backend.
    ///
    /// Opens the on-disk corpus when `storage.persist` is set.
    pub fn with_embedder(config: Config, embedder: Arc<dyn EmbeddingBackend>) -> Result<Self> {
        config.validate()?;
        if embedder.dimensions() != config.embedding.dimensions {
            bail!(
                "Embedding backend '{}' produces {} dimensions, config expects {}",
                embedder.name(),
                embedder.dimensions(),
                config.embedding.dimensions
            );
        }

        let tokenizer = build_tokenizer(&config.lexical);
        let empty = IndexSnapshot::empty(
            tokenizer,
            Bm25Params::from(&config.lexical),
            embedder.dimensions(),
            &config.vector,
        );

        let indexer = if config.storage.persist {
            let storage = CorpusStorage::open(&config.storage.data_dir)?;
            HybridIndexer::open(empty, storage)?
        } else {
            HybridIndexer::new(empty)
        };

        let classifier = Arc::new(LegalQueryClassifier::new(
            config.weighting.clone(),
            config.fusion.weight_total,
        ));
        let coordinator = QueryCoordinator::new(
            indexer.handle(),
            Arc::clone(&embedder),
            classifier,
            RrfConfig::from(&config.fusion),
            config.retrieval.clone(),
        );

        info!(
            "Retrieval engine ready: {} documents, embedder {} ({} dims), persistent={}",
            indexer.snapshot().len(),
            embedder.name(),
            embedder.dimensions(),
            indexer.is_persistent()
        );

        Ok(Self {
            config,
            embedder,
            indexer,
            coordinator,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn indexer(&self) -> &HybridIndexer {
        &self.indexer
    }

    pub fn coordinator(&self) -> &QueryCoordinator {
        &self.coordinator
    }

    pub fn embedder(&self) -> Arc<dyn EmbeddingBackend> {
        Arc::clone(&self.embedder)
    }

    /// Hybrid retrieval with an explicit result count and timeout
    pub async fn retrieve(
        &self,
        query_text: &str,
        top_k: usize,
        timeout: Duration,
    ) -> Result<RetrievalOutcome, RetrievalError> {
        self.coordinator.retrieve(query_text, top_k, timeout).await
    }

    pub async fn retrieve_with_cancel(
        &self,
        query_text: &str,
        top_k: usize,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<RetrievalOutcome, RetrievalError> {
        self.coordinator
            .retrieve_with_cancel(query_text, top_k, timeout, cancel)
            .await
    }

    /// Hybrid retrieval with the configured default top-k and timeout
    pub async fn search(&self, query_text: &str) -> Result<RetrievalOutcome, RetrievalError> {
        let retrieval = &self.config.retrieval;
        self.retrieve(query_text, retrieval.default_top_k, retrieval.timeout())
            .await
    }

    /// Embed and index one document, replacing any previous version
    pub async fn index_text(
        &self,
        id: impl Into<DocumentId>,
        text: impl Into<String>,
        metadata: Metadata,
    ) -> Result<bool> {
        let text = text.into();
        let embedding = self
            .embedder
            .embed(&text)
            .await
            .context("Failed to embed document")?;
        self.indexer.upsert(NewDocument {
            id: id.into(),
            text,
            metadata,
            embedding,
        })
    }

    /// Index documents that already carry embeddings
    pub fn add_documents(&self, documents: Vec<NewDocument>) -> Result<BatchReport> {
        self.indexer.add_documents(documents)
    }

    pub fn remove_documents(&self, ids: &[DocumentId]) -> Result<BatchReport> {
        self.indexer.remove_documents(ids)
    }

    /// Stream a corpus into the index in embedding batches
    pub async fn import<S: CorpusSource>(
        &self,
        source: S,
        max_documents: Option<usize>,
    ) -> Result<ImportStats> {
        let stats = ImportCoordinator::new(&self.indexer, Arc::clone(&self.embedder))
            .with_batch_size(self.config.embedding.max_batch_size)
            .with_max_documents(max_documents)
            .import(source)
            .await?;
        Ok(stats)
    }

    pub fn stats(&self) -> IndexStats {
        self.indexer.stats()
    }

    /// Flush persisted documents
    pub fn save(&self) -> Result<()> {
        self.indexer.save()
    }
}

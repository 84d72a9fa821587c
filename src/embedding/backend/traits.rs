//! Embedding backend trait definitions
//!
//! Defines the capability every embedding provider implements. The retrieval
//! path treats it as an external, possibly slow and failing dependency.

use crate::types::Embedding;
use async_trait::async_trait;
use std::fmt::Debug;

/// Errors that can occur during embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// Embedding generation failed
    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    /// Rate limited by the API
    #[error("Rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited {
        /// Suggested retry delay in milliseconds, if provided by the API
        retry_after_ms: Option<u64>,
    },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider returned vectors of the wrong length
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Core trait for embedding backends
///
/// Object-safe for use as `Arc<dyn EmbeddingBackend>`.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync + Debug {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> EmbeddingResult<Embedding>;

    /// Generate embeddings for a batch of texts, in input order
    ///
    /// The default implementation calls `embed` for each text.
    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Get the embedding dimensions
    fn dimensions(&self) -> usize;

    /// Get the backend name (e.g., "http", "hash")
    fn name(&self) -> &str;
}

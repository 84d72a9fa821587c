//! Vector similarity retriever

use super::{SearchError, CANCEL_CHECK_INTERVAL};
use crate::index::{dot, VectorIndex};
use crate::types::{rank_scored, DocumentId, RankedCandidate};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Ranks stored embeddings against a precomputed query embedding.
///
/// Never embeds text itself; the caller supplies the query vector.
#[derive(Debug, Clone, Copy)]
pub struct SemanticRetriever<'a> {
    index: &'a VectorIndex,
}

impl<'a> SemanticRetriever<'a> {
    pub fn new(index: &'a VectorIndex) -> Self {
        Self { index }
    }

    /// Top `top_k` documents by similarity, ties broken by id.
    ///
    /// Fails if the query has the wrong dimensionality or, under the
    /// inner-product metric, is not unit length.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<RankedCandidate>, SearchError> {
        self.search_cancellable(query_embedding, top_k, &CancellationToken::new())
    }

    pub fn search_cancellable(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<RankedCandidate>, SearchError> {
        let query = self.index.prepare_query(query_embedding)?;
        if top_k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(DocumentId, f64)> = Vec::with_capacity(self.index.len());
        for (i, (id, vector)) in self.index.iter().enumerate() {
            if i % CANCEL_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return Err(SearchError::Cancelled);
            }
            scored.push((id.clone(), dot(&query, vector) as f64));
        }

        let ranked = rank_scored(scored, top_k);
        debug!("Dense search: {} vectors scanned, {} returned", self.index.len(), ranked.len());
        Ok(ranked)
    }
}

//! BM25 lexical retriever

use super::SearchError;
use crate::index::{distinct_terms, LexicalIndex};
use crate::types::{rank_scored, DocumentId, RankedCandidate};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Turns tokenized queries into ranked candidates via BM25
#[derive(Debug, Clone, Copy)]
pub struct LexicalRetriever<'a> {
    index: &'a LexicalIndex,
}

impl<'a> LexicalRetriever<'a> {
    pub fn new(index: &'a LexicalIndex) -> Self {
        Self { index }
    }

    /// Top `top_k` documents by BM25 score.
    ///
    /// Terms missing from the index contribute nothing; a query with no
    /// matching term returns an empty list.
    pub fn search(&self, query_tokens: &[String], top_k: usize) -> Vec<RankedCandidate> {
        // A fresh token is never cancelled
        self.search_cancellable(query_tokens, top_k, &CancellationToken::new())
            .unwrap_or_default()
    }

    /// Like [`search`](Self::search), checking `cancel` between query terms
    pub fn search_cancellable(
        &self,
        query_tokens: &[String],
        top_k: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<RankedCandidate>, SearchError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut scores: HashMap<DocumentId, f64> = HashMap::new();
        for term in distinct_terms(query_tokens) {
            if cancel.is_cancelled() {
                return Err(SearchError::Cancelled);
            }
            self.index.accumulate(term, &mut scores);
        }
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let matched = scores.len();
        let ranked = rank_scored(scores.into_iter().collect(), top_k);
        debug!("BM25 search: {} matching documents, {} returned", matched, ranked.len());
        Ok(ranked)
    }
}

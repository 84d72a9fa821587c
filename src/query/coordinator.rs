//! Hybrid query coordinator
//!
//! Runs the lexical and semantic retrievers concurrently against one index
//! snapshot under a shared deadline, then fuses whatever came back. When
//! one source fails or runs out of time the call degrades to the other
//! source instead of failing.

use super::{RetrievalError, SearchExecutor, SourceFailure};
use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingBackend;
use crate::index::{IndexSnapshot, SnapshotHandle};
use crate::retrieval::{fuse, LexicalRetriever, QueryClassifier, RrfConfig, SemanticRetriever};
use crate::types::{
    FusionResult, FusionWeights, RankedCandidate, RetrievalOutcome, RetrievalSource,
    RetrievedDocument,
};
use crate::util::truncate_str;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type SourceResult = Result<Vec<RankedCandidate>, SourceFailure>;

/// Entry point for hybrid retrieval
pub struct QueryCoordinator {
    snapshots: Arc<SnapshotHandle>,
    embedder: Arc<dyn EmbeddingBackend>,
    classifier: Arc<dyn QueryClassifier>,
    rrf: RrfConfig,
    config: RetrievalConfig,
}

impl QueryCoordinator {
    pub fn new(
        snapshots: Arc<SnapshotHandle>,
        embedder: Arc<dyn EmbeddingBackend>,
        classifier: Arc<dyn QueryClassifier>,
        rrf: RrfConfig,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            snapshots,
            embedder,
            classifier,
            rrf,
            config,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Weights the policy would assign to `query_text`
    pub fn classify(&self, query_text: &str) -> FusionWeights {
        self.classifier.classify(query_text)
    }

    /// Retrieve the `top_k` best documents for `query_text` within `timeout`
    pub async fn retrieve(
        &self,
        query_text: &str,
        top_k: usize,
        timeout: Duration,
    ) -> Result<RetrievalOutcome, RetrievalError> {
        self.retrieve_with_cancel(query_text, top_k, timeout, CancellationToken::new())
            .await
    }

    /// Like [`retrieve`](Self::retrieve), aborting when `cancel` fires.
    ///
    /// Sub-searches still running when this returns (or when the future is
    /// dropped) are cancelled.
    pub async fn retrieve_with_cancel(
        &self,
        query_text: &str,
        top_k: usize,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<RetrievalOutcome, RetrievalError> {
        if query_text.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }
        if top_k == 0 {
            return Err(RetrievalError::InvalidTopK(top_k));
        }
        if timeout.is_zero() {
            return Err(RetrievalError::InvalidTimeout);
        }
        if cancel.is_cancelled() {
            return Err(RetrievalError::Cancelled);
        }

        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + timeout;
        let snapshot = self.snapshots.load();
        let policy_weights = self.classifier.classify(query_text);
        let candidate_count = self.config.candidate_count.max(top_k);

        info!(
            "Retrieving '{}' (top_k={}, generation={}, weights={:.2}/{:.2})",
            truncate_str(query_text, 60),
            top_k,
            snapshot.generation(),
            policy_weights.lexical,
            policy_weights.semantic
        );

        let scope = cancel.child_token();
        let _scope_guard = scope.clone().drop_guard();

        let (lexical, semantic) = tokio::join!(
            self.lexical_source(
                Arc::clone(&snapshot),
                query_text,
                candidate_count,
                SearchExecutor::new(deadline, scope.child_token()),
            ),
            self.semantic_source(
                Arc::clone(&snapshot),
                query_text,
                candidate_count,
                SearchExecutor::new(deadline, scope.child_token()),
            ),
        );

        if cancel.is_cancelled() {
            info!("Retrieval cancelled after {:?}", start.elapsed());
            return Err(RetrievalError::Cancelled);
        }

        let (lexical, semantic, missing) = match (lexical, semantic) {
            (Ok(l), Ok(s)) => (l, s, None),
            (Ok(l), Err(reason)) => (l, Vec::new(), Some((RetrievalSource::Semantic, reason))),
            (Err(reason), Ok(s)) => (Vec::new(), s, Some((RetrievalSource::Lexical, reason))),
            (Err(l), Err(s)) => {
                warn!("Both retrieval sources failed (lexical: {}, semantic: {})", l, s);
                return Err(RetrievalError::Unavailable {
                    lexical: l,
                    semantic: s,
                });
            }
        };

        let applied_weights = match &missing {
            Some((source, reason)) => {
                warn!(
                    "Degraded retrieval: {} source unavailable ({}), using {} only",
                    source,
                    reason,
                    source.counterpart()
                );
                policy_weights.without(*source)
            }
            None => policy_weights,
        };

        let fused = fuse(&lexical, &semantic, applied_weights, &self.rrf, Some(top_k));
        let degraded = missing.is_some();
        let results = enrich(&snapshot, fused, &lexical, &semantic, degraded);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            "Retrieved {} results in {}ms (lexical={}, semantic={}, degraded={})",
            results.len(),
            elapsed_ms,
            lexical.len(),
            semantic.len(),
            degraded
        );

        let (missing_source, missing_reason) = match missing {
            Some((source, reason)) => (Some(source), Some(reason)),
            None => (None, None),
        };

        Ok(RetrievalOutcome {
            results,
            degraded,
            missing_source,
            missing_reason,
            policy_weights,
            applied_weights,
            lexical_candidates: lexical.len(),
            semantic_candidates: semantic.len(),
            snapshot_generation: snapshot.generation(),
            elapsed_ms,
        })
    }

    async fn lexical_source(
        &self,
        snapshot: Arc<IndexSnapshot>,
        query_text: &str,
        candidate_count: usize,
        executor: SearchExecutor,
    ) -> SourceResult {
        if !self.config.enable_lexical {
            return Err(SourceFailure::Disabled);
        }

        let query_text = query_text.to_string();
        let result = executor
            .search(move |cancel| {
                let tokens = snapshot.lexical().tokenize(&query_text);
                LexicalRetriever::new(snapshot.lexical()).search_cancellable(
                    &tokens,
                    candidate_count,
                    cancel,
                )
            })
            .await;

        if let Err(reason) = &result {
            debug!("Lexical source failed: {}", reason);
        }
        result
    }

    async fn semantic_source(
        &self,
        snapshot: Arc<IndexSnapshot>,
        query_text: &str,
        candidate_count: usize,
        executor: SearchExecutor,
    ) -> SourceResult {
        if !self.config.enable_semantic {
            return Err(SourceFailure::Disabled);
        }

        let embedding = executor.embed(&*self.embedder, query_text).await?;
        let result = executor
            .search(move |cancel| {
                SemanticRetriever::new(snapshot.vector()).search_cancellable(
                    &embedding,
                    candidate_count,
                    cancel,
                )
            })
            .await;

        if let Err(reason) = &result {
            debug!("Semantic source failed: {}", reason);
        }
        result
    }
}

/// Attach raw scores and document metadata to fused hits
fn enrich(
    snapshot: &IndexSnapshot,
    fused: Vec<FusionResult>,
    lexical: &[RankedCandidate],
    semantic: &[RankedCandidate],
    degraded: bool,
) -> Vec<RetrievedDocument> {
    let lexical_scores = raw_scores(lexical);
    let semantic_scores = raw_scores(semantic);

    fused
        .into_iter()
        .map(|hit| {
            let source_metadata = snapshot
                .documents()
                .get(&hit.document_id)
                .map(|doc| doc.metadata.clone())
                .unwrap_or_default();
            RetrievedDocument {
                lexical_score: lexical_scores.get(hit.document_id.as_str()).copied(),
                semantic_score: semantic_scores.get(hit.document_id.as_str()).copied(),
                document_id: hit.document_id,
                fused_score: hit.fused_score,
                contributing_ranks: hit.contributing_ranks,
                source_metadata,
                degraded,
            }
        })
        .collect()
}

fn raw_scores(list: &[RankedCandidate]) -> HashMap<&str, f32> {
    let mut scores = HashMap::with_capacity(list.len());
    for candidate in list {
        scores
            .entry(candidate.document_id.as_str())
            .or_insert(candidate.raw_score);
    }
    scores
}

//! Deadline- and cancellation-bounded execution of one retrieval source

use super::SourceFailure;
use crate::embedding::EmbeddingBackend;
use crate::retrieval::SearchError;
use crate::types::{Embedding, RankedCandidate};
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs the steps of one source (embedding, scoring) against a shared
/// deadline. The token is private to the source: cancelling it stops this
/// source only, and it is cancelled when the source gives up on a timeout
/// so the blocking scan stops early.
#[derive(Debug, Clone)]
pub struct SearchExecutor {
    deadline: Instant,
    cancel: CancellationToken,
}

impl SearchExecutor {
    pub fn new(deadline: Instant, cancel: CancellationToken) -> Self {
        Self { deadline, cancel }
    }

    /// Embed the query text within the remaining budget
    pub async fn embed(
        &self,
        backend: &dyn EmbeddingBackend,
        text: &str,
    ) -> Result<Embedding, SourceFailure> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SourceFailure::Cancelled),
            result = timeout_at(self.deadline, backend.embed(text)) => match result {
                Err(_) => {
                    debug!("Query embedding via {} timed out", backend.name());
                    Err(SourceFailure::TimedOut)
                }
                Ok(Err(e)) => Err(SourceFailure::Failed(format!("embedding: {}", e))),
                Ok(Ok(embedding)) => Ok(embedding),
            },
        }
    }

    /// Run a scoring closure on the blocking pool within the remaining budget
    pub async fn search<F>(&self, f: F) -> Result<Vec<RankedCandidate>, SourceFailure>
    where
        F: FnOnce(&CancellationToken) -> Result<Vec<RankedCandidate>, SearchError> + Send + 'static,
    {
        let token = self.cancel.clone();
        let task = tokio::task::spawn_blocking(move || f(&token));

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SourceFailure::Cancelled),
            result = timeout_at(self.deadline, task) => match result {
                Err(_) => {
                    self.cancel.cancel();
                    Err(SourceFailure::TimedOut)
                }
                Ok(Err(join_error)) => Err(SourceFailure::Failed(format!("search task: {}", join_error))),
                Ok(Ok(Err(SearchError::Cancelled))) => Err(SourceFailure::Cancelled),
                Ok(Ok(Err(SearchError::Index(e)))) => Err(SourceFailure::Failed(e.to_string())),
                Ok(Ok(Ok(candidates))) => Ok(candidates),
            },
        }
    }
}

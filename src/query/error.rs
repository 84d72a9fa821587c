//! Retrieval errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why one source did not contribute a candidate list
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SourceFailure {
    /// Did not finish within the call's timeout (embedding included)
    #[error("timed out")]
    TimedOut,

    #[error("failed: {0}")]
    Failed(String),

    /// Turned off in configuration
    #[error("disabled")]
    Disabled,

    #[error("cancelled")]
    Cancelled,
}

/// Errors surfaced by `retrieve`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("top_k must be positive, got {0}")]
    InvalidTopK(usize),

    #[error("timeout must be positive")]
    InvalidTimeout,

    /// Neither source produced a list
    #[error("retrieval unavailable (lexical: {lexical}, semantic: {semantic})")]
    Unavailable {
        lexical: SourceFailure,
        semantic: SourceFailure,
    },

    /// The caller cancelled the call
    #[error("retrieval cancelled")]
    Cancelled,
}

impl RetrievalError {
    /// Input errors are rejected before any work is done
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyQuery | Self::InvalidTopK(_) | Self::InvalidTimeout
        )
    }
}

//! Hybrid retrieval system
//!
//! Combines:
//! - BM25 lexical search over the inverted index
//! - Dense vector search over document embeddings
//! - Weighted Reciprocal Rank Fusion (RRF) with per-query adaptive weights

mod bm25;
mod fusion;
mod hybrid;
mod semantic;
mod weighting;

pub use bm25::*;
pub use fusion::*;
pub use hybrid::*;
pub use semantic::*;
pub use weighting::*;

use crate::index::IndexError;
use thiserror::Error;

/// Why a single-source search produced no list
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("search cancelled")]
    Cancelled,

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Scan stride between cancellation checks
pub(crate) const CANCEL_CHECK_INTERVAL: usize = 1024;

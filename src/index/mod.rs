//! Index structures
//!
//! - Document store holding the corpus by id
//! - BM25 inverted index with incrementally maintained corpus statistics
//! - Exact vector index with dimensionality and normalization guards
//! - Immutable snapshots of all three, swapped atomically on every write batch
//! - sled persistence of the submitted corpus

mod lexical;
mod shards;
mod snapshot;
mod storage;
mod store;
mod vector;

pub use lexical::*;
pub use shards::*;
pub use snapshot::*;
pub use storage::*;
pub use store::*;
pub use vector::*;

use crate::types::DocumentId;
use thiserror::Error;

/// Errors raised while mutating an index
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("document id must not be empty")]
    EmptyId,

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding for '{id}' is not unit length (norm {norm})")]
    NotNormalized { id: DocumentId, norm: f32 },

    #[error("embedding for '{0}' is the zero vector")]
    ZeroVector(DocumentId),

    #[error("embedding for '{0}' contains NaN or infinite values")]
    NonFinite(DocumentId),
}

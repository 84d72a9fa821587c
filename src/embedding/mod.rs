//! Embedding providers
//!
//! The engine never runs a model itself. Query and document vectors come
//! from an [`EmbeddingBackend`], which may be remote and slow.

pub mod backend;

pub use backend::{
    create_backend, create_backend_from_config, hash_based_embedding, EmbeddingBackend,
    EmbeddingError, EmbeddingResult, HashBackend,
};

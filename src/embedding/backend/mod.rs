//! Pluggable embedding backend system
//!
//! - **HTTP backend**: OpenAI-compatible APIs (OpenAI, Azure, LM Studio, vLLM, etc.)
//! - **Hash backend**: deterministic feature hashing, no model required
//!
//! # Example Configuration
//!
//! ```toml
//! # OpenAI
//! [embedding]
//! backend = "http"
//! endpoint = "https://api.openai.com/v1/embeddings"
//! model = "text-embedding-3-small"
//! dimensions = 1536
//! # api_key from OPENAI_API_KEY env var
//!
//! # Offline
//! [embedding]
//! backend = "hash"
//! dimensions = 384
//! ```

mod factory;
mod hash;
mod http;
mod traits;

pub use factory::{create_backend, create_backend_from_config};
pub use hash::{hash_based_embedding, HashBackend};
pub use http::{HttpBackend, HttpConfig};
pub use traits::{EmbeddingBackend, EmbeddingError, EmbeddingResult};

//! Corpus import
//!
//! Streams `(id, text, metadata)` records into the index. The only built-in
//! source is newline-delimited JSON:
//!
//! ```text
//! {"id": "2019do1234", "text": "...", "metadata": {"court": "Supreme Court"}}
//! ```
//!
//! Records are embedded in batches through the configured
//! [`EmbeddingBackend`](crate::embedding::EmbeddingBackend) and each batch is
//! published as one index snapshot.

pub mod coordinator;
pub mod source;

pub use coordinator::{ImportCoordinator, DEFAULT_BATCH_SIZE};
pub use source::{CorpusRecord, CorpusSource, ImportError, ImportStats, JsonlSource};

//! jurisearch: hybrid retrieval engine for legal corpora
//!
//! Combines two complementary retrievers over one corpus:
//! - BM25 lexical search over an inverted index, for exact statute and
//!   case-number matches
//! - Dense vector search over document embeddings, for paraphrased facts
//!
//! and merges them with weighted Reciprocal Rank Fusion, where the weights
//! come from a per-query classification. Queries run both retrievers
//! concurrently under one timeout and degrade to a single source when the
//! other fails. Index updates are published as atomic snapshot swaps, so
//! readers never observe a half-applied batch.

pub mod config;
pub mod embedding;
pub mod engine;
pub mod import;
pub mod index;
pub mod query;
pub mod retrieval;
pub mod text;
pub mod types;
pub mod util;

pub use config::Config;
pub use engine::RetrievalEngine;
pub use types::*;

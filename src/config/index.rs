//! Storage and index configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// On-disk corpus storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the sled corpus database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Persist indexed documents so they survive restarts
    #[serde(default = "default_true")]
    pub persist: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".jurisearch")
}

fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            persist: true,
        }
    }
}

/// Tokenization strategy shared by the lexical index and the query path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// Unicode word boundaries only
    Unicode,
    /// Unicode words plus overlapping bigrams over Hangul/CJK runs
    CjkBigram,
}

/// BM25 lexical index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalConfig {
    /// Term-frequency saturation
    #[serde(default = "default_k1")]
    pub k1: f64,
    /// Document-length normalization strength
    #[serde(default = "default_b")]
    pub b: f64,
    #[serde(default = "default_tokenizer")]
    pub tokenizer: TokenizerKind,
    /// Remove English stop words
    #[serde(default = "default_true")]
    pub stop_words: bool,
    /// Minimum token length in characters
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,
}

fn default_k1() -> f64 {
    1.2
}

fn default_b() -> f64 {
    0.75
}

fn default_tokenizer() -> TokenizerKind {
    TokenizerKind::CjkBigram
}

fn default_min_token_len() -> usize {
    1
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
            tokenizer: default_tokenizer(),
            stop_words: true,
            min_token_len: default_min_token_len(),
        }
    }
}

/// Similarity metric for the vector index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Vectors are normalized on insertion; score is the cosine
    Cosine,
    /// Vectors must already be unit length; score is the dot product
    InnerProduct,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    #[serde(default = "default_metric")]
    pub metric: SimilarityMetric,
    /// Allowed deviation of the L2 norm from 1.0 under `inner_product`
    #[serde(default = "default_normalization_tolerance")]
    pub normalization_tolerance: f32,
}

fn default_metric() -> SimilarityMetric {
    SimilarityMetric::Cosine
}

fn default_normalization_tolerance() -> f32 {
    1e-3
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            metric: default_metric(),
            normalization_tolerance: default_normalization_tolerance(),
        }
    }
}

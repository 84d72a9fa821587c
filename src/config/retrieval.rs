//! Fusion, weighting and retrieval configuration

use serde::{Deserialize, Serialize};

/// Reciprocal Rank Fusion parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// RRF k parameter
    #[serde(default = "default_rrf_k")]
    pub rrf_k: usize,
    /// Sum of the lexical and semantic weights for every query
    #[serde(default = "default_weight_total")]
    pub weight_total: f32,
}

fn default_rrf_k() -> usize {
    60
}

fn default_weight_total() -> f32 {
    2.0
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rrf_k: default_rrf_k(),
            weight_total: default_weight_total(),
        }
    }
}

/// Thresholds for the rule-based query classifier.
///
/// Shares are the lexical (or semantic) fraction of `weight_total`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightingConfig {
    /// Lexical share when the query contains a citation or case number
    #[serde(default = "default_citation_lexical_share")]
    pub citation_lexical_share: f32,
    /// Token count at which a query counts as long natural language
    #[serde(default = "default_long_query_tokens")]
    pub long_query_tokens: usize,
    #[serde(default = "default_long_query_semantic_share")]
    pub long_query_semantic_share: f32,
    /// Semantic share for questions shorter than `long_query_tokens`
    #[serde(default = "default_question_semantic_share")]
    pub question_semantic_share: f32,
    /// Token count at or below which a query counts as a keyword lookup
    #[serde(default = "default_short_query_tokens")]
    pub short_query_tokens: usize,
    #[serde(default = "default_short_query_lexical_share")]
    pub short_query_lexical_share: f32,
    /// Floor for either source's share
    #[serde(default = "default_min_share")]
    pub min_share: f32,
}

fn default_citation_lexical_share() -> f32 {
    0.75
}

fn default_long_query_tokens() -> usize {
    8
}

fn default_long_query_semantic_share() -> f32 {
    0.65
}

fn default_question_semantic_share() -> f32 {
    0.6
}

fn default_short_query_tokens() -> usize {
    2
}

fn default_short_query_lexical_share() -> f32 {
    0.55
}

fn default_min_share() -> f32 {
    0.1
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self {
            citation_lexical_share: default_citation_lexical_share(),
            long_query_tokens: default_long_query_tokens(),
            long_query_semantic_share: default_long_query_semantic_share(),
            question_semantic_share: default_question_semantic_share(),
            short_query_tokens: default_short_query_tokens(),
            short_query_lexical_share: default_short_query_lexical_share(),
            min_share: default_min_share(),
        }
    }
}

impl WeightingConfig {
    /// Named shares, for validation messages
    pub(crate) fn shares(&self) -> [(&'static str, f32); 4] {
        [
            ("citation_lexical_share", self.citation_lexical_share),
            ("long_query_semantic_share", self.long_query_semantic_share),
            ("question_semantic_share", self.question_semantic_share),
            ("short_query_lexical_share", self.short_query_lexical_share),
        ]
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates fetched from each source before fusion
    #[serde(default = "default_candidate_count")]
    pub candidate_count: usize,
    /// Results returned when the caller does not ask for a count
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    /// Budget for one retrieve call, embedding included
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Enable BM25 retrieval
    #[serde(default = "default_true")]
    pub enable_lexical: bool,
    /// Enable vector retrieval
    #[serde(default = "default_true")]
    pub enable_semantic: bool,
}

fn default_candidate_count() -> usize {
    50
}

fn default_top_k() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_count: default_candidate_count(),
            default_top_k: default_top_k(),
            timeout_ms: default_timeout_ms(),
            enable_lexical: true,
            enable_semantic: true,
        }
    }
}

impl RetrievalConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

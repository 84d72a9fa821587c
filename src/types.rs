//! Core types for the retrieval engine

use crate::query::SourceFailure;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Opaque identifier of a corpus document
pub type DocumentId = String;

/// Embedding vector type
pub type Embedding = Vec<f32>;

/// Structured document metadata (court, date, citation, ...)
pub type Metadata = BTreeMap<String, String>;

/// A document as submitted by the corpus loader, before derivation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub id: DocumentId,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub embedding: Embedding,
}

impl NewDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::new(),
            embedding,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// An indexed document.
///
/// Immutable once indexed. Replacing the text means building a new
/// `Document` (fresh tokens and embedding) and re-inserting it under the
/// same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub text: String,
    /// Tokens derived from `text` by the index tokenizer
    pub tokens: Vec<String>,
    pub embedding: Embedding,
    pub metadata: Metadata,
}

/// Entry in a term's postings list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub document_id: DocumentId,
    /// Occurrences of the term in the document (always >= 1)
    pub term_frequency: u32,
}

/// Which retriever produced a candidate list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalSource {
    Lexical,
    Semantic,
}

impl RetrievalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Semantic => "semantic",
        }
    }

    /// The other source
    pub fn counterpart(&self) -> Self {
        match self {
            Self::Lexical => Self::Semantic,
            Self::Semantic => Self::Lexical,
        }
    }
}

impl fmt::Display for RetrievalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ranked hit from a single retriever
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub document_id: DocumentId,
    /// 1-indexed rank, 1 is best
    pub rank: usize,
    /// Retriever-native score (BM25 or cosine); never compared across sources
    pub raw_score: f32,
}

/// Rank of a document in each source list, if present there
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributingRanks {
    pub lexical: Option<usize>,
    pub semantic: Option<usize>,
}

impl ContributingRanks {
    pub fn get(&self, source: RetrievalSource) -> Option<usize> {
        match source {
            RetrievalSource::Lexical => self.lexical,
            RetrievalSource::Semantic => self.semantic,
        }
    }

    fn slot(&mut self, source: RetrievalSource) -> &mut Option<usize> {
        match source {
            RetrievalSource::Lexical => &mut self.lexical,
            RetrievalSource::Semantic => &mut self.semantic,
        }
    }

    pub(crate) fn set(&mut self, source: RetrievalSource, rank: usize) {
        *self.slot(source) = Some(rank);
    }
}

/// A document's position in the fused ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    pub document_id: DocumentId,
    pub fused_score: f32,
    pub contributing_ranks: ContributingRanks,
}

/// Per-query fusion weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub lexical: f32,
    pub semantic: f32,
}

impl FusionWeights {
    pub fn new(lexical: f32, semantic: f32) -> Self {
        Self { lexical, semantic }
    }

    /// Equal weights summing to `total`
    pub fn balanced(total: f32) -> Self {
        Self::new(total / 2.0, total / 2.0)
    }

    pub fn get(&self, source: RetrievalSource) -> f32 {
        match source {
            RetrievalSource::Lexical => self.lexical,
            RetrievalSource::Semantic => self.semantic,
        }
    }

    pub fn total(&self) -> f32 {
        self.lexical + self.semantic
    }

    /// Copy with the weight of `source` forced to zero
    pub fn without(&self, source: RetrievalSource) -> Self {
        match source {
            RetrievalSource::Lexical => Self::new(0.0, self.semantic),
            RetrievalSource::Semantic => Self::new(self.lexical, 0.0),
        }
    }
}

/// A fused hit enriched with source metadata for the calling layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub document_id: DocumentId,
    pub fused_score: f32,
    pub contributing_ranks: ContributingRanks,
    /// Raw BM25 score, when the lexical list contained the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexical_score: Option<f32>,
    /// Raw similarity, when the semantic list contained the document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f32>,
    pub source_metadata: Metadata,
    /// Mirrors the outcome-level flag so each hit is self-describing
    pub degraded: bool,
}

/// Result of one `retrieve` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub results: Vec<RetrievedDocument>,
    /// True when only one source contributed
    pub degraded: bool,
    /// The source that did not contribute, in degraded mode
    pub missing_source: Option<RetrievalSource>,
    /// Why the missing source did not contribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_reason: Option<SourceFailure>,
    /// Weights produced by the classification policy
    pub policy_weights: FusionWeights,
    /// Weights actually used for fusion (missing source zeroed)
    pub applied_weights: FusionWeights,
    pub lexical_candidates: usize,
    pub semantic_candidates: usize,
    /// Generation of the index snapshot that served the query
    pub snapshot_generation: u64,
    pub elapsed_ms: u64,
}

impl RetrievalOutcome {
    pub fn document_ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.document_id.as_str()).collect()
    }
}

/// Orders (score desc, id asc). Used by every ranked list in the crate.
///
/// Scores are compared at full precision; narrowing to `f32` happens only
/// when a ranked entry is built.
pub(crate) fn score_then_id(a_score: f64, a_id: &str, b_score: f64, b_id: &str) -> Ordering {
    b_score
        .partial_cmp(&a_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a_id.cmp(b_id))
}

/// Turn scored hits into ranked candidates: sort, truncate, assign ranks.
pub(crate) fn rank_scored(mut scored: Vec<(DocumentId, f64)>, top_k: usize) -> Vec<RankedCandidate> {
    scored.sort_by(|a, b| score_then_id(a.1, &a.0, b.1, &b.0));
    scored.truncate(top_k);
    scored
        .into_iter()
        .enumerate()
        .map(|(i, (document_id, raw_score))| RankedCandidate {
            document_id,
            rank: i + 1,
            raw_score: raw_score as f32,
        })
        .collect()
}

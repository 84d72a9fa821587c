//! Result fusion
//!
//! Weighted Reciprocal Rank Fusion over the lexical and semantic lists.
//! Only rank positions enter the fused score; raw BM25 and cosine scores
//! live on different scales and are carried through for explanation only.

use crate::config::FusionConfig;
use crate::types::{
    score_then_id, ContributingRanks, DocumentId, FusionResult, FusionWeights, RankedCandidate,
    RetrievalSource,
};
use std::collections::HashMap;

/// Reciprocal Rank Fusion (RRF) parameters
#[derive(Debug, Clone)]
pub struct RrfConfig {
    /// K parameter for RRF (default: 60)
    pub k: usize,
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self { k: 60 }
    }
}

impl From<&FusionConfig> for RrfConfig {
    fn from(config: &FusionConfig) -> Self {
        Self { k: config.rrf_k }
    }
}

impl RrfConfig {
    /// Contribution of one list entry: `weight / (k + rank)`
    pub fn contribution(&self, weight: f32, rank: usize) -> f64 {
        weight as f64 / (self.k as f64 + rank as f64)
    }
}

/// Weighted RRF over the two source lists.
///
/// A document's fused score is the sum of `w_source / (k + rank)` over the
/// lists that contain it. Output is sorted by fused score descending with
/// ties broken by document id, and holds the union of input ids, capped at
/// `top_k` when given. Negative or non-finite weights count as zero.
pub fn fuse(
    lexical: &[RankedCandidate],
    semantic: &[RankedCandidate],
    weights: FusionWeights,
    config: &RrfConfig,
    top_k: Option<usize>,
) -> Vec<FusionResult> {
    let mut acc: HashMap<&str, (f64, ContributingRanks)> = HashMap::new();

    for (source, list) in [
        (RetrievalSource::Lexical, lexical),
        (RetrievalSource::Semantic, semantic),
    ] {
        let weight = sanitize(weights.get(source));
        for candidate in list {
            let entry = acc
                .entry(candidate.document_id.as_str())
                .or_insert((0.0, ContributingRanks::default()));
            // A list should not repeat an id; only the first entry counts
            if entry.1.get(source).is_some() {
                continue;
            }
            entry.0 += config.contribution(weight, candidate.rank);
            entry.1.set(source, candidate.rank);
        }
    }

    let mut scored: Vec<(&str, f64, ContributingRanks)> = acc
        .into_iter()
        .map(|(id, (score, ranks))| (id, score, ranks))
        .collect();
    scored.sort_by(|a, b| score_then_id(a.1, a.0, b.1, b.0));
    if let Some(k) = top_k {
        scored.truncate(k);
    }
    scored
        .into_iter()
        .map(|(id, score, contributing_ranks)| FusionResult {
            document_id: DocumentId::from(id),
            fused_score: score as f32,
            contributing_ranks,
        })
        .collect()
}

fn sanitize(weight: f32) -> f32 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

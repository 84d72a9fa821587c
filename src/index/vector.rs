//! Exact nearest-neighbor index over document embeddings
//!
//! A flat scan: every query compares against every stored vector. Stored
//! vectors are unit length under both metrics, so similarity is a dot
//! product either way; the metric decides whether insertion normalizes or
//! rejects.

use super::{IndexError, ShardedMap};
use crate::config::{SimilarityMetric, VectorConfig};
use crate::types::DocumentId;
use std::sync::Arc;

/// A vector that passed the index's guards and is ready to store
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedVector(Arc<[f32]>);

impl PreparedVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Flat vector index keyed by document id
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimensions: usize,
    metric: SimilarityMetric,
    tolerance: f32,
    vectors: ShardedMap<Arc<[f32]>>,
}

impl VectorIndex {
    pub fn new(dimensions: usize, config: &VectorConfig) -> Self {
        Self {
            dimensions,
            metric: config.metric,
            tolerance: config.normalization_tolerance,
            vectors: ShardedMap::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.vectors.contains_key(document_id)
    }

    pub fn get(&self, document_id: &str) -> Option<&[f32]> {
        self.vectors.get(document_id).map(|v| &v[..])
    }

    /// Validate an embedding for insertion under `document_id`
    pub fn prepare(&self, document_id: &str, embedding: &[f32]) -> Result<PreparedVector, IndexError> {
        self.unit_vector(document_id, embedding)
            .map(|v| PreparedVector(v.into()))
    }

    /// Validate and normalize a query embedding
    pub fn prepare_query(&self, embedding: &[f32]) -> Result<Vec<f32>, IndexError> {
        self.unit_vector("<query>", embedding)
    }

    fn unit_vector(&self, id: &str, embedding: &[f32]) -> Result<Vec<f32>, IndexError> {
        if embedding.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(IndexError::NonFinite(id.to_string()));
        }
        let norm = l2_norm(embedding);
        match self.metric {
            SimilarityMetric::Cosine => {
                if norm == 0.0 {
                    return Err(IndexError::ZeroVector(id.to_string()));
                }
                Ok(embedding.iter().map(|x| x / norm).collect())
            }
            SimilarityMetric::InnerProduct => {
                if (norm - 1.0).abs() > self.tolerance {
                    return Err(IndexError::NotNormalized {
                        id: id.to_string(),
                        norm,
                    });
                }
                Ok(embedding.to_vec())
            }
        }
    }

    /// Store a prepared vector, replacing any previous one for the id
    pub fn insert(&mut self, document_id: &str, vector: PreparedVector) {
        self.vectors.insert(document_id.to_string(), vector.0);
    }

    pub fn remove(&mut self, document_id: &str) -> bool {
        self.vectors.remove(document_id).is_some()
    }

    pub fn clear(&mut self) {
        self.vectors.clear();
    }

    /// All stored vectors, unordered
    pub fn iter(&self) -> impl Iterator<Item = (&DocumentId, &[f32])> {
        self.vectors.iter().map(|(id, v)| (id, &v[..]))
    }
}

/// Dot product; equals cosine similarity for unit vectors
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

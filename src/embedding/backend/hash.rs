//! Deterministic hashing embedder
//!
//! Feature-hashes words and character bigrams into a fixed number of
//! signed buckets and normalizes the result. Texts that share vocabulary
//! land near each other, which is enough for offline use and tests; there
//! is no model behind it.

use super::traits::{EmbeddingBackend, EmbeddingError, EmbeddingResult};
use crate::types::Embedding;
use async_trait::async_trait;
use unicode_segmentation::UnicodeSegmentation;
use xxhash_rust::xxh3::{xxh3_64, xxh3_64_with_seed};

/// Embedding backend backed by xxh3 feature hashing
#[derive(Debug, Clone)]
pub struct HashBackend {
    dimensions: usize,
}

impl HashBackend {
    pub fn new(dimensions: usize) -> EmbeddingResult<Self> {
        if dimensions == 0 {
            return Err(EmbeddingError::Config("dimensions must be positive".to_string()));
        }
        Ok(Self { dimensions })
    }
}

#[async_trait]
impl EmbeddingBackend for HashBackend {
    async fn embed(&self, text: &str) -> EmbeddingResult<Embedding> {
        Ok(hash_based_embedding(text, self.dimensions))
    }

    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Embedding>> {
        Ok(texts
            .iter()
            .map(|t| hash_based_embedding(t, self.dimensions))
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Unit-length embedding of `content` by signed feature hashing.
///
/// Never returns the zero vector: text without words (or whose features
/// cancel out) falls back to a vector seeded from the whole content.
pub fn hash_based_embedding(content: &str, dims: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dims];
    if dims == 0 {
        return vector;
    }

    for word in content.unicode_words() {
        let word = word.to_lowercase();
        add_feature(&mut vector, &word, 1.0);
        let chars: Vec<char> = word.chars().collect();
        for pair in chars.windows(2) {
            let bigram: String = pair.iter().collect();
            add_feature(&mut vector, &bigram, 0.5);
        }
    }

    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        return vector.iter().map(|x| x / norm).collect();
    }

    let fallback: Vec<f32> = (0..dims)
        .map(|i| {
            let hash = xxh3_64_with_seed(content.as_bytes(), i as u64);
            ((hash % 1000) as f32 / 500.0) - 1.0 + f32::EPSILON
        })
        .collect();
    let norm = fallback.iter().map(|x| x * x).sum::<f32>().sqrt();
    fallback.iter().map(|x| x / norm).collect()
}

fn add_feature(vector: &mut [f32], feature: &str, weight: f32) {
    let hash = xxh3_64(feature.as_bytes());
    let bucket = (hash % vector.len() as u64) as usize;
    let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
    vector[bucket] += sign * weight;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{dot, l2_norm};

    #[test]
    fn test_deterministic_and_unit_length() {
        let a = hash_based_embedding("폭행죄 상해", 64);
        let b = hash_based_embedding("폭행죄 상해", 64);
        assert_eq!(a, b);
        assert!((l2_norm(&a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_vocabulary_is_closer() {
        let doc = hash_based_embedding("폭행죄 상해", 256);
        let paraphrase = hash_based_embedding("폭행으로 인한 상해", 256);
        let unrelated = hash_based_embedding("손해배상 청구", 256);
        assert!(dot(&doc, &paraphrase) > dot(&doc, &unrelated));
    }

    #[test]
    fn test_empty_text_is_not_zero() {
        let v = hash_based_embedding("", 8);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-5);
        let v = hash_based_embedding("!!! ???", 8);
        assert!(l2_norm(&v) > 0.0);
    }

    #[tokio::test]
    async fn test_backend() {
        let backend = HashBackend::new(32).unwrap();
        assert_eq!(backend.name(), "hash");
        let batch = backend
            .embed_batch(&["one".to_string(), "two".to_string()])
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], backend.embed("one").await.unwrap());
        assert!(HashBackend::new(0).is_err());
    }
}

//! Deterministic local embedder based on feature hashing.

use std::hash::{DefaultHasher, Hash, Hasher};

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;

/// An [`EmbeddingProvider`] that hashes tokens into a fixed number of
/// signed buckets and L2-normalizes the result.
///
/// Purely lexical: two texts score as similar when they share vocabulary,
/// not meaning. That is enough for offline operation and for deterministic
/// tests, and it needs no network, no API key, and no model weights.
///
/// # Example
///
/// ```rust,ignore
/// use quill_rag::HashingEmbedder;
///
/// let embedder = HashingEmbedder::new(256);
/// let vector = embedder.embed("the quarterly pricing call").await?;
/// ```
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in text.split_whitespace() {
            let token: String =
                token.chars().filter(|c| c.is_alphanumeric()).flat_map(|c| c.to_lowercase()).collect();
            if token.is_empty() {
                continue;
            }

            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let hash = hasher.finish();

            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash & (1u64 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embedding_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("pricing discussion in the second call").await.unwrap();
        let b = embedder.embed("pricing discussion in the second call").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_closer_than_disjoint() {
        let embedder = HashingEmbedder::new(64);
        let query = embedder.embed("pricing strategy for the product").await.unwrap();
        let related = embedder.embed("our pricing strategy works").await.unwrap();
        let unrelated = embedder.embed("migrating birds cross the delta").await.unwrap();

        let dot = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() };
        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let embedder = HashingEmbedder::new(16);
        let vector = embedder.embed("").await.unwrap();
        assert!(vector.iter().all(|&x| x == 0.0));
    }
}

//! Embedding provider trait.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that maps text to fixed-length embedding vectors.
///
/// The engine indexes and searches with whatever provider it is given, so
/// every vector a provider returns must have exactly
/// [`dimensions()`](EmbeddingProvider::dimensions) components — the flat
/// index rejects anything else. The default
/// [`embed_batch`](EmbeddingProvider::embed_batch) calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends with native
/// batching should override it.
///
/// Failures surface as [`RetrievalError::Embedding`](crate::RetrievalError);
/// providers never retry internally.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, one vector per input, in order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// The dimensionality of every vector this provider produces.
    fn dimensions(&self) -> usize;
}

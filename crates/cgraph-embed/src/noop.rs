//! No-op embedder.
//!
//! Returns zero vectors for every input. The binary falls back to it when no
//! embedding endpoint is configured, so graph ingestion still runs.

use async_trait::async_trait;
use cgraph_core::{EmbedError, Embedder, EmbeddingOutput};

/// Default dimension of [`NoopEmbedder`].
pub const DEFAULT_DIMENSION: usize = 384;

/// No-op embedder that returns zero vectors.
///
/// ```rust
/// use cgraph_core::Embedder;
/// use cgraph_embed::NoopEmbedder;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let embedder = NoopEmbedder::with_dimension(8);
/// let output = embedder.embed_one("Photosynthesis").await?;
/// assert_eq!(output.embedding, vec![0.0; 8]);
/// # Ok(())
/// # }
/// ```
pub struct NoopEmbedder {
    dimension: usize,
}

impl NoopEmbedder {
    /// Create a no-op embedder with the default dimension.
    #[must_use]
    pub fn new() -> Self {
        Self::with_dimension(DEFAULT_DIMENSION)
    }

    /// Create a no-op embedder with a custom dimension.
    #[must_use]
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for NoopEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for NoopEmbedder {
    fn model_name(&self) -> &str {
        "noop"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        Ok(texts
            .iter()
            .map(|_| EmbeddingOutput {
                embedding: vec![0.0; self.dimension],
                token_count: 0,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_defaults() {
        let embedder = NoopEmbedder::default();
        assert_eq!(embedder.dimension(), DEFAULT_DIMENSION);
        assert_eq!(embedder.model_name(), "noop");
    }

    #[tokio::test]
    async fn test_noop_embed_text() {
        let embedder = NoopEmbedder::with_dimension(768);
        let outputs = embedder.embed_text(&["Cell", "Mitochondria"]).await.unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1].embedding.len(), 768);
        assert!(outputs[0].embedding.iter().all(|&v| v == 0.0));
    }

    #[tokio::test]
    async fn test_noop_embed_empty() {
        let outputs = NoopEmbedder::new().embed_text(&[]).await.unwrap();
        assert!(outputs.is_empty());
    }
}

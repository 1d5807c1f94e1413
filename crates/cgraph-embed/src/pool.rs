//! Embedder pool for concurrent embedding operations.

use async_trait::async_trait;
use cgraph_core::{EmbedError, Embedder, EmbeddingOutput};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Wraps an embedder and limits how many calls run at once.
///
/// Documents ingested concurrently share one pool, so the embedding backend
/// sees at most `max_concurrent` requests regardless of batch size.
pub struct EmbedderPool {
    embedder: Arc<dyn Embedder>,
    semaphore: Semaphore,
    max_concurrent: usize,
}

impl EmbedderPool {
    /// Create a new embedder pool. `max_concurrent` is clamped to at least 1.
    pub fn new(embedder: Arc<dyn Embedder>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            embedder,
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
        }
    }

    /// Get the underlying embedder.
    pub fn inner(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    /// Permits currently free.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get max concurrent operations.
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

#[async_trait]
impl Embedder for EmbedderPool {
    fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| EmbedError::Inference(format!("semaphore error: {e}")))?;

        self.embedder.embed_text(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const TEST_DIM: usize = 16;

    /// Mock embedder that tracks peak concurrency.
    struct MockEmbedder {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl MockEmbedder {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        fn model_name(&self) -> &str {
            "mock-embedder"
        }

        fn dimension(&self) -> usize {
            TEST_DIM
        }

        async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(texts
                .iter()
                .map(|text| EmbeddingOutput {
                    embedding: (0..TEST_DIM)
                        .map(|i| ((i + text.len()) as f32 * 0.001).sin())
                        .collect(),
                    token_count: text.split_whitespace().count(),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn test_pool_creation() {
        let pool = EmbedderPool::new(Arc::new(MockEmbedder::new()), 4);

        assert_eq!(pool.dimension(), TEST_DIM);
        assert_eq!(pool.model_name(), "mock-embedder");
        assert_eq!(pool.max_concurrent(), 4);
        assert_eq!(pool.available_permits(), 4);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped() {
        let pool = EmbedderPool::new(Arc::new(MockEmbedder::new()), 0);
        assert_eq!(pool.max_concurrent(), 1);
    }

    #[tokio::test]
    async fn test_embed_one_through_pool() {
        let pool = EmbedderPool::new(Arc::new(MockEmbedder::new()), 2);
        let output = pool.embed_one("light reaction").await.unwrap();

        assert_eq!(output.embedding.len(), TEST_DIM);
        assert_eq!(output.token_count, 2);
    }

    #[tokio::test]
    async fn test_semaphore_limits_concurrency() {
        let mock = Arc::new(MockEmbedder::new());
        let pool = Arc::new(EmbedderPool::new(mock.clone(), 2));

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move {
                    let text = format!("chapter {i}");
                    pool.embed_text(&[text.as_str()]).await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert!(mock.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available_permits(), 2);
    }
}

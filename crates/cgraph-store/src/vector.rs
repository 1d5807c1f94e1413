//! In-memory vector index.

use async_trait::async_trait;
use cgraph_core::{Embedder, IndexError, IndexMetadata, VectorIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// One indexed text.
#[derive(Debug, Clone)]
pub struct IndexedText {
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: IndexMetadata,
}

/// Vector index that keeps entries in memory.
///
/// Entries are keyed by `(collection, content_hash)`: indexing the same text
/// twice replaces the entry instead of adding a second one.
pub struct MemoryVectorIndex {
    embedder: Arc<dyn Embedder>,
    dimension: usize,
    entries: Arc<RwLock<HashMap<(String, String), IndexedText>>>,
}

impl MemoryVectorIndex {
    /// Create an index that expects embeddings of `dimension`.
    pub fn new(embedder: Arc<dyn Embedder>, dimension: usize) -> Self {
        Self {
            embedder,
            dimension,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of entries in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.entries
            .read()
            .await
            .keys()
            .filter(|(c, _)| c == collection)
            .count()
    }

    /// Look up an entry by collection and content hash.
    pub async fn get(&self, collection: &str, content_hash: &str) -> Option<IndexedText> {
        self.entries
            .read()
            .await
            .get(&(collection.to_string(), content_hash.to_string()))
            .cloned()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    async fn init(&self) -> Result<(), IndexError> {
        if self.embedder.dimension() != self.dimension {
            return Err(IndexError::Dimension {
                expected: self.dimension,
                actual: self.embedder.dimension(),
            });
        }
        Ok(())
    }

    async fn index_text(&self, text: &str, metadata: &IndexMetadata) -> Result<(), IndexError> {
        let output = self.embedder.embed_one(text).await?;
        if output.embedding.len() != self.dimension {
            return Err(IndexError::Dimension {
                expected: self.dimension,
                actual: output.embedding.len(),
            });
        }

        let key = (metadata.collection.clone(), metadata.content_hash.clone());
        self.entries.write().await.insert(
            key,
            IndexedText {
                text: text.to_string(),
                embedding: output.embedding,
                metadata: metadata.clone(),
            },
        );

        debug!(
            "Indexed {} chars from {} into {}",
            text.len(),
            metadata.source,
            metadata.collection
        );
        Ok(())
    }
}

//! Core traits for cgraph components.
//!
//! The ingestion pipeline depends only on these contracts:
//!
//! - [`TextExtractor`]: document handle to plain text
//! - [`GraphExtractionService`]: text plus policy to an [`ExtractedGraph`]
//! - [`ConceptGraphStore`]: idempotent concept/relation upserts
//! - [`VectorIndex`]: raw text plus embedding, write-only from the pipeline's view
//!
//! [`FormatExtractor`] and [`Embedder`] are the seams one level below, used by
//! the registry and the vector index adapters.

use async_trait::async_trait;
use std::path::Path;

use crate::error::{EmbedError, ExtractError, GraphExtractionError, IndexError, StoreError};
use crate::types::{
    Concept, DocumentHandle, EmbeddingOutput, ExtractedGraph, ExtractedText, ExtractionPolicy,
    GraphStats, IndexMetadata, MergeStats, Relation,
};

// ============================================================================
// Text Extraction
// ============================================================================

/// Turns a document into linear text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the text of `document`. Any error is terminal for that document.
    async fn extract(&self, document: &DocumentHandle) -> Result<ExtractedText, ExtractError>;
}

/// A single-format extractor, registered with a routing registry.
#[async_trait]
pub trait FormatExtractor: Send + Sync {
    /// Returns the MIME types this extractor can handle.
    fn supported_types(&self) -> &[&str];

    /// Check if this extractor can handle the given file.
    fn can_extract(&self, path: &Path, mime_type: &str) -> bool {
        self.supported_types().contains(&mime_type) || self.can_extract_by_extension(path)
    }

    /// Check if extractor can handle based on file extension.
    fn can_extract_by_extension(&self, _path: &Path) -> bool {
        false
    }

    /// Extract text from a file.
    async fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractError>;

    /// Extract text from in-memory bytes.
    async fn extract_bytes(
        &self,
        _data: &[u8],
        _mime_type: &str,
    ) -> Result<ExtractedText, ExtractError> {
        Err(ExtractError::UnsupportedType(
            "byte extraction not supported".to_string(),
        ))
    }
}

// ============================================================================
// Graph Extraction
// ============================================================================

/// Structured extraction of concepts and relations from text.
#[async_trait]
pub trait GraphExtractionService: Send + Sync {
    /// Extract a graph from `text`, guided by `policy`.
    async fn extract_graph(
        &self,
        text: &str,
        policy: &ExtractionPolicy,
    ) -> Result<ExtractedGraph, GraphExtractionError>;
}

// ============================================================================
// Graph Storage
// ============================================================================

/// A persistent concept graph with idempotent upserts keyed by name.
#[async_trait]
pub trait ConceptGraphStore: Send + Sync {
    /// Initialize the store (constraints, indexes).
    async fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Create the concept if absent, otherwise overwrite its type.
    async fn upsert_concept(&self, name: &str, concept_type: &str) -> Result<(), StoreError>;

    /// Create the directed edge if absent; no-op if `(source, target, kind)` exists.
    ///
    /// Fails with [`StoreError::ConceptNotFound`] when either endpoint is missing.
    async fn upsert_relation(&self, source: &str, target: &str, kind: &str)
    -> Result<(), StoreError>;

    /// Merge one document's concepts, then its relations.
    ///
    /// The default runs sequential upserts and stops at the first failure,
    /// reporting how far it got in [`StoreError::MergeAborted`]. Writes made
    /// before the failure stay committed. Stores with transactions may
    /// override this to write everything as one unit.
    async fn merge_graph(
        &self,
        concepts: &[Concept],
        relations: &[Relation],
    ) -> Result<MergeStats, StoreError> {
        let mut stats = MergeStats::default();

        for concept in concepts {
            if let Err(e) = self
                .upsert_concept(&concept.name, &concept.concept_type)
                .await
            {
                return Err(merge_aborted(stats, e));
            }
            stats.concepts_written += 1;
        }

        for relation in relations {
            if let Err(e) = self
                .upsert_relation(&relation.source, &relation.target, &relation.kind)
                .await
            {
                return Err(merge_aborted(stats, e));
            }
            stats.relations_written += 1;
        }

        Ok(stats)
    }

    /// Look up a concept by its key.
    async fn get_concept(&self, name: &str) -> Result<Option<Concept>, StoreError>;

    /// All relations whose source is `name`.
    async fn relations_from(&self, name: &str) -> Result<Vec<Relation>, StoreError>;

    /// Get store statistics.
    async fn stats(&self) -> Result<GraphStats, StoreError>;
}

fn merge_aborted(stats: MergeStats, source: StoreError) -> StoreError {
    StoreError::MergeAborted {
        concepts_written: stats.concepts_written,
        relations_written: stats.relations_written,
        source: Box::new(source),
    }
}

// ============================================================================
// Embedding
// ============================================================================

/// Trait for generating embeddings.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts, one output per input.
    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<EmbeddingOutput, EmbedError> {
        let results = self.embed_text(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Inference("empty embedding result".to_string()))
    }
}

// ============================================================================
// Vector Indexing
// ============================================================================

/// Stores raw text with its embedding for later semantic lookup.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Initialize the index.
    async fn init(&self) -> Result<(), IndexError> {
        Ok(())
    }

    /// Embed and store `text` under `metadata.collection`.
    async fn index_text(&self, text: &str, metadata: &IndexMetadata) -> Result<(), IndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Store that records calls and fails on a chosen relation call.
    struct RecordingStore {
        calls: Mutex<Vec<String>>,
        fail_relation_at: Option<usize>,
    }

    impl RecordingStore {
        fn new(fail_relation_at: Option<usize>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_relation_at,
            }
        }
    }

    #[async_trait]
    impl ConceptGraphStore for RecordingStore {
        async fn upsert_concept(&self, name: &str, concept_type: &str) -> Result<(), StoreError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("concept:{name}:{concept_type}"));
            Ok(())
        }

        async fn upsert_relation(
            &self,
            source: &str,
            target: &str,
            kind: &str,
        ) -> Result<(), StoreError> {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.iter().filter(|c| c.starts_with("relation:")).count();
            if self.fail_relation_at == Some(index) {
                return Err(StoreError::Write("connection reset".to_string()));
            }
            calls.push(format!("relation:{source}:{target}:{kind}"));
            Ok(())
        }

        async fn get_concept(&self, _name: &str) -> Result<Option<Concept>, StoreError> {
            Ok(None)
        }

        async fn relations_from(&self, _name: &str) -> Result<Vec<Relation>, StoreError> {
            Ok(Vec::new())
        }

        async fn stats(&self) -> Result<GraphStats, StoreError> {
            Ok(GraphStats::default())
        }
    }

    fn sample() -> (Vec<Concept>, Vec<Relation>) {
        (
            vec![
                Concept::new("Photosynthesis", "Process"),
                Concept::new("Glucose", "Substance"),
            ],
            vec![
                Relation::new("Photosynthesis", "Glucose", "PRODUCES"),
                Relation::new("Glucose", "Photosynthesis", "RELATES_TO"),
            ],
        )
    }

    #[tokio::test]
    async fn test_default_merge_writes_concepts_before_relations() {
        let store = RecordingStore::new(None);
        let (concepts, relations) = sample();

        let stats = store.merge_graph(&concepts, &relations).await.unwrap();
        assert_eq!(stats.concepts_written, 2);
        assert_eq!(stats.relations_written, 2);

        let calls = store.calls.lock().unwrap();
        assert_eq!(calls[0], "concept:Photosynthesis:Process");
        assert_eq!(calls[1], "concept:Glucose:Substance");
        assert_eq!(calls[2], "relation:Photosynthesis:Glucose:PRODUCES");
    }

    #[tokio::test]
    async fn test_default_merge_reports_partial_progress() {
        let store = RecordingStore::new(Some(1));
        let (concepts, relations) = sample();

        let err = store.merge_graph(&concepts, &relations).await.unwrap_err();
        match err {
            StoreError::MergeAborted {
                concepts_written,
                relations_written,
                source,
            } => {
                assert_eq!(concepts_written, 2);
                assert_eq!(relations_written, 1);
                assert!(matches!(*source, StoreError::Write(_)));
            }
            other => panic!("expected MergeAborted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_default_init_is_noop() {
        let store = RecordingStore::new(None);
        assert!(store.init().await.is_ok());
    }
}

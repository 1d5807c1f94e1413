//! The ingestion pipeline.

use chrono::{DateTime, Utc};
use cgraph_core::{
    ConceptGraphStore, DocumentHandle, Error, ExactNameResolver, ExtractionPolicy,
    ExtractionStrategy, GraphExtractionService, IdentityResolver, IndexMetadata, Strictness,
    TextExtractor, VectorIndex,
};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore, broadcast};
use tracing::{debug, error, info, warn};

use crate::error::IngestError;
use crate::validate::{InvalidEdge, validate_graph};

/// Default collection label for indexed text.
pub const DEFAULT_COLLECTION: &str = "Chunk";

/// Ingestion events.
#[derive(Debug, Clone)]
pub enum IngestUpdate {
    DocumentStarted {
        document: String,
    },
    DocumentIngested {
        document: String,
        entity_count: usize,
        relation_count: usize,
    },
    EdgesSkipped {
        document: String,
        count: usize,
    },
    IndexWriteFailed {
        document: String,
        error: String,
    },
    DocumentFailed {
        document: String,
        error: String,
    },
}

/// Configuration fixed for the lifetime of a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Instructions handed to the graph extractor
    pub policy: ExtractionPolicy,
    /// Handling of relations that reference unknown entities
    pub strictness: Strictness,
    /// Collection label for indexed text
    pub collection: String,
    /// Routing of documents to text extractors. Read by whoever builds the
    /// `TextExtractor`; the pipeline only reports it.
    pub strategy: ExtractionStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            policy: ExtractionPolicy::default(),
            strictness: Strictness::default(),
            collection: DEFAULT_COLLECTION.to_string(),
            strategy: ExtractionStrategy::default(),
        }
    }
}

/// What a successful ingestion wrote.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionSummary {
    /// Document label
    pub document: String,
    /// Distinct concepts merged
    pub entity_count: usize,
    /// Distinct relations merged
    pub relation_count: usize,
    /// Relations left out in lenient mode
    pub skipped_edges: Vec<InvalidEdge>,
    /// Entities dropped for having no identity
    pub dropped_concepts: usize,
    /// Vector index failure, if any. Does not affect success.
    pub index_error: Option<String>,
    /// blake3 hash of the extracted text
    pub content_hash: String,
}

/// Outcome of one `ingest` call.
#[derive(Debug)]
pub enum IngestionResult {
    Succeeded(IngestionSummary),
    Failed(IngestError),
}

impl IngestionResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    #[must_use]
    pub fn summary(&self) -> Option<&IngestionSummary> {
        match self {
            Self::Succeeded(summary) => Some(summary),
            Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&IngestError> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(err) => Some(err),
        }
    }

    /// `(entity_count, relation_count)` of a success.
    #[must_use]
    pub fn counts(&self) -> Option<(usize, usize)> {
        self.summary()
            .map(|s| (s.entity_count, s.relation_count))
    }
}

impl From<Result<IngestionSummary, IngestError>> for IngestionResult {
    fn from(result: Result<IngestionSummary, IngestError>) -> Self {
        match result {
            Ok(summary) => Self::Succeeded(summary),
            Err(err) => Self::Failed(err),
        }
    }
}

/// Running totals across all `ingest` calls of one pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub documents_ingested: u64,
    pub documents_failed: u64,
    pub concepts_written: u64,
    pub relations_written: u64,
    pub index_failures: u64,
    pub last_update: Option<DateTime<Utc>>,
}

/// Document → text → graph → validation → index + merge.
pub struct IngestionPipeline {
    /// Text extractor
    extractor: Arc<dyn TextExtractor>,
    /// Graph extractor
    graph_extractor: Arc<dyn GraphExtractionService>,
    /// Concept graph store
    store: Arc<dyn ConceptGraphStore>,
    /// Vector index
    index: Arc<dyn VectorIndex>,
    /// Name → concept key
    resolver: Arc<dyn IdentityResolver>,
    /// Configuration
    config: Arc<PipelineConfig>,
    /// Current stats
    stats: Arc<RwLock<IngestStats>>,
    /// Update broadcast
    update_tx: broadcast::Sender<IngestUpdate>,
}

impl IngestionPipeline {
    /// Create a pipeline with exact-name identity.
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        graph_extractor: Arc<dyn GraphExtractionService>,
        store: Arc<dyn ConceptGraphStore>,
        index: Arc<dyn VectorIndex>,
        config: PipelineConfig,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(256);

        Self {
            extractor,
            graph_extractor,
            store,
            index,
            resolver: Arc::new(ExactNameResolver),
            config: Arc::new(config),
            stats: Arc::new(RwLock::new(IngestStats::default())),
            update_tx,
        }
    }

    /// Replace the identity resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Subscribe to ingestion updates.
    pub fn subscribe(&self) -> broadcast::Receiver<IngestUpdate> {
        self.update_tx.subscribe()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Snapshot of the running totals.
    pub async fn stats(&self) -> IngestStats {
        self.stats.read().await.clone()
    }

    /// Prepare the store and index (constraints, collections).
    pub async fn init(&self) -> Result<(), Error> {
        self.store.init().await?;
        self.index.init().await?;
        Ok(())
    }

    /// Ingest one document.
    pub async fn ingest(&self, document: &DocumentHandle) -> IngestionResult {
        let label = document.label();
        let _ = self.update_tx.send(IngestUpdate::DocumentStarted {
            document: label.clone(),
        });

        match self.run(document, &label).await {
            Ok(summary) => {
                info!(
                    "Ingested {} ({} concepts, {} relations)",
                    label, summary.entity_count, summary.relation_count
                );
                {
                    let mut stats = self.stats.write().await;
                    stats.documents_ingested += 1;
                    stats.concepts_written += summary.entity_count as u64;
                    stats.relations_written += summary.relation_count as u64;
                    if summary.index_error.is_some() {
                        stats.index_failures += 1;
                    }
                    stats.last_update = Some(Utc::now());
                }
                let _ = self.update_tx.send(IngestUpdate::DocumentIngested {
                    document: label,
                    entity_count: summary.entity_count,
                    relation_count: summary.relation_count,
                });
                IngestionResult::Succeeded(summary)
            }
            Err(e) => {
                error!("Failed to ingest {}: {}", label, e);
                {
                    let mut stats = self.stats.write().await;
                    stats.documents_failed += 1;
                    stats.last_update = Some(Utc::now());
                }
                let _ = self.update_tx.send(IngestUpdate::DocumentFailed {
                    document: label,
                    error: e.to_string(),
                });
                IngestionResult::Failed(e)
            }
        }
    }

    /// Ingest several documents, at most `max_concurrent` at a time.
    ///
    /// Results are returned in input order.
    pub async fn ingest_all(
        &self,
        documents: &[DocumentHandle],
        max_concurrent: usize,
    ) -> Vec<IngestionResult> {
        let semaphore = Semaphore::new(max_concurrent.max(1));
        let semaphore = &semaphore;

        join_all(documents.iter().map(|document| async move {
            let _permit = semaphore.acquire().await;
            self.ingest(document).await
        }))
        .await
    }

    async fn run(
        &self,
        document: &DocumentHandle,
        label: &str,
    ) -> Result<IngestionSummary, IngestError> {
        let extracted = self.extractor.extract(document).await?;
        debug!(
            "Extracted {} chars from {} ({:?} pages, {} elements, {:?} strategy)",
            extracted.text.len(),
            label,
            extracted.metadata.page_count,
            extracted.metadata.element_count,
            self.config.strategy
        );

        let graph = self
            .graph_extractor
            .extract_graph(&extracted.text, &self.config.policy)
            .await?;
        debug!(
            "Graph for {}: {} entities, {} relationships",
            label,
            graph.entities.len(),
            graph.relationships.len()
        );

        let (validated, report) = validate_graph(&graph, self.resolver.as_ref());
        if !report.dropped_concepts.is_empty() {
            warn!(
                "Dropped {} unnamed entities from {}",
                report.dropped_concepts.len(),
                label
            );
        }
        if !report.invalid_edges.is_empty() {
            match self.config.strictness {
                Strictness::AbortOnInvalid => {
                    return Err(IngestError::InvalidEdges(report.invalid_edges));
                }
                Strictness::SkipInvalidEdges => {
                    warn!(
                        "Skipping {} invalid relations in {}",
                        report.invalid_edges.len(),
                        label
                    );
                    let _ = self.update_tx.send(IngestUpdate::EdgesSkipped {
                        document: label.to_string(),
                        count: report.invalid_edges.len(),
                    });
                }
            }
        }

        let content_hash = blake3::hash(extracted.text.as_bytes()).to_hex().to_string();
        let metadata = IndexMetadata {
            collection: self.config.collection.clone(),
            source: label.to_string(),
            content_hash: content_hash.clone(),
            ingested_at: Utc::now(),
        };
        let index_error = match self.index.index_text(&extracted.text, &metadata).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Index write failed for {}: {}", label, e);
                let _ = self.update_tx.send(IngestUpdate::IndexWriteFailed {
                    document: label.to_string(),
                    error: e.to_string(),
                });
                Some(e.to_string())
            }
        };

        let merged = self
            .store
            .merge_graph(&validated.concepts, &validated.relations)
            .await?;

        Ok(IngestionSummary {
            document: label.to_string(),
            entity_count: merged.concepts_written,
            relation_count: merged.relations_written,
            skipped_edges: report.invalid_edges,
            dropped_concepts: report.dropped_concepts.len(),
            index_error,
            content_hash,
        })
    }
}

//! # cgraph-ingest
//!
//! The ingestion pipeline: document → text → extracted graph → validation →
//! vector index + concept graph merge.
//!
//! ```text
//! ingest(doc)
//!   1. TextExtractor::extract            fail-fast
//!   2. GraphExtractionService::extract   fail-fast
//!   3. validate_graph + strictness       fail-fast in strict mode
//!   4. VectorIndex::index_text           failure logged, not fatal
//!   5. ConceptGraphStore::merge_graph    concepts before relations
//! ```
//!
//! Concurrent ingestion of different documents is safe because every store
//! write is an idempotent upsert.

pub mod error;
pub mod pipeline;
pub mod validate;

pub use error::IngestError;
pub use pipeline::{
    IngestStats, IngestUpdate, IngestionPipeline, IngestionResult, IngestionSummary,
    PipelineConfig,
};
pub use validate::{InvalidEdge, InvalidEdgeReason, ValidatedGraph, ValidationReport, validate_graph};

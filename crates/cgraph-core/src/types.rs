//! Core types for cgraph.
//!
//! ## Graph Model
//! - [`Concept`]: A named node, unique by name
//! - [`Relation`]: A directed, typed edge between two concept names
//! - [`ExtractedGraph`]: The transient output of graph extraction for one document
//! - [`MergeStats`] / [`GraphStats`]: Write and store counters
//!
//! ## Documents
//! - [`DocumentHandle`]: A file path or an in-memory upload
//! - [`ExtractedText`]: Linear text produced from a document
//!
//! ## Configuration Values
//! - [`ExtractionPolicy`]: Instructions for the graph extractor
//! - [`Strictness`]: Invalid-edge handling
//! - [`ExtractionStrategy`]: How documents are routed to text extractors
//!
//! ## Indexing
//! - [`IndexMetadata`]: Labels stored next to indexed text
//! - [`EmbeddingOutput`]: One embedding vector

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// Graph Model
// ============================================================================

/// A curriculum entity (term, law, formula, figure).
///
/// Identity is the `name`; `concept_type` is last-write-wins on re-ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Concept {
    /// Name of the concept
    pub name: String,
    /// Category label
    #[serde(rename = "type")]
    pub concept_type: String,
}

impl Concept {
    /// Create a new concept.
    pub fn new(name: impl Into<String>, concept_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            concept_type: concept_type.into(),
        }
    }
}

/// A directed, typed edge between two concepts, referenced by name.
///
/// Two relations are the same edge when `(source, target, kind)` match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Relation {
    /// The subject concept
    pub source: String,
    /// The object concept
    pub target: String,
    /// The relationship kind, e.g. `PREREQUISITE_FOR`
    #[serde(alias = "relation")]
    pub kind: String,
}

impl Relation {
    /// Create a new relation.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: kind.into(),
        }
    }

    /// The identity tuple of this edge.
    #[must_use]
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.source, &self.target, &self.kind)
    }
}

/// Normalize a relation kind to upper snake case (`"part of"` → `PART_OF`).
#[must_use]
pub fn normalize_relation_kind(kind: &str) -> String {
    kind.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Entities and relationships extracted from one document or chunk.
///
/// Ordered as produced; never persisted as-is, only merged into a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedGraph {
    /// Extracted concepts
    #[serde(default)]
    pub entities: Vec<Concept>,
    /// Extracted relationships between concepts
    #[serde(default)]
    pub relationships: Vec<Relation>,
}

impl ExtractedGraph {
    /// Create a graph from entity and relationship lists.
    #[must_use]
    pub fn new(entities: Vec<Concept>, relationships: Vec<Relation>) -> Self {
        Self {
            entities,
            relationships,
        }
    }

    /// True when the graph contains neither entities nor relationships.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}

/// Counters for one merge into a graph store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Concepts upserted
    pub concepts_written: usize,
    /// Relations upserted
    pub relations_written: usize,
}

/// Graph store statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    /// Number of distinct concepts
    pub concept_count: u64,
    /// Number of distinct relations
    pub relation_count: u64,
    /// Last write time
    pub last_updated: Option<DateTime<Utc>>,
}

// ============================================================================
// Documents
// ============================================================================

/// A document to ingest.
#[derive(Debug, Clone)]
pub enum DocumentHandle {
    /// A file on disk
    Path(PathBuf),
    /// An in-memory upload
    Bytes {
        /// Display name (usually the original file name)
        name: String,
        /// MIME type, if known
        mime_type: Option<String>,
        /// Raw document bytes
        data: Vec<u8>,
    },
}

impl DocumentHandle {
    /// Create a handle for a file on disk.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Create a handle for an in-memory document.
    pub fn bytes(name: impl Into<String>, mime_type: Option<&str>, data: Vec<u8>) -> Self {
        Self::Bytes {
            name: name.into(),
            mime_type: mime_type.map(str::to_string),
            data,
        }
    }

    /// Human-readable label used in logs and results.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes { name, .. } => name.clone(),
        }
    }

    /// Name used for extension-based routing.
    #[must_use]
    pub fn file_name(&self) -> &Path {
        match self {
            Self::Path(path) => path.as_path(),
            Self::Bytes { name, .. } => Path::new(name.as_str()),
        }
    }
}

/// Linear text produced from a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedText {
    /// The full text
    pub text: String,
    /// Extraction metadata
    pub metadata: TextMetadata,
}

/// Metadata gathered while extracting text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextMetadata {
    /// MIME type the document was routed by
    pub mime_type: Option<String>,
    /// Page count (for paged formats)
    pub page_count: Option<u32>,
    /// Number of non-empty text elements (paragraphs, headings)
    pub element_count: usize,
}

// ============================================================================
// Configuration Values
// ============================================================================

/// Instructions describing what the graph extractor should produce.
///
/// This is configuration: it is built once and never mutated during ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionPolicy {
    /// Role and task description
    pub instructions: String,
    /// Entity categories to look for
    pub entity_categories: Vec<String>,
    /// Relationship kinds to look for, with a short gloss each
    pub relation_kinds: Vec<RelationKindSpec>,
}

/// A relationship kind the extractor is asked to identify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationKindSpec {
    /// Upper snake case label, e.g. `PART_OF`
    pub kind: String,
    /// What the kind means
    pub description: String,
}

impl RelationKindSpec {
    fn new(kind: &str, description: &str) -> Self {
        Self {
            kind: kind.to_string(),
            description: description.to_string(),
        }
    }
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            instructions: "You are an expert curriculum librarian. Extract a knowledge graph \
                from textbook text: identify the key entities and the relationships between them."
                .to_string(),
            entity_categories: vec![
                "Scientific concept".to_string(),
                "Law".to_string(),
                "Formula".to_string(),
                "Historical figure".to_string(),
            ],
            relation_kinds: vec![
                RelationKindSpec::new(
                    "PREREQUISITE_FOR",
                    "Concept A is needed to understand concept B",
                ),
                RelationKindSpec::new("PART_OF", "A is a component of B"),
                RelationKindSpec::new("RELATES_TO", "A is linked to B across topics or subjects"),
                RelationKindSpec::new("PRODUCES", "A produces B"),
                RelationKindSpec::new("CAUSES", "A causes B"),
            ],
        }
    }
}

impl ExtractionPolicy {
    /// Relation kind labels in policy order.
    pub fn kind_labels(&self) -> impl Iterator<Item = &str> {
        self.relation_kinds.iter().map(|k| k.kind.as_str())
    }
}

/// Handling of relations that reference entities missing from the same graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strictness {
    /// Abort the whole merge before any write
    AbortOnInvalid,
    /// Merge the valid subset and report the skipped edges
    #[default]
    SkipInvalidEdges,
}

/// How documents are routed to text extractors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionStrategy {
    /// By MIME type, then by file extension
    #[default]
    Auto,
    /// By MIME type only
    MimeOnly,
}

// ============================================================================
// Indexing
// ============================================================================

/// Labels stored alongside indexed text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Collection (node label) the text is stored under
    pub collection: String,
    /// Document label the text came from
    pub source: String,
    /// blake3 hash of the text
    pub content_hash: String,
    /// When the document was ingested
    pub ingested_at: DateTime<Utc>,
}

/// Result of embedding one text.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    /// The embedding vector
    pub embedding: Vec<f32>,
    /// Tokens consumed, when reported
    pub token_count: usize,
}

//! # cgraph-core
//!
//! Core types and traits for cgraph, a pipeline that turns textbook documents
//! into a deduplicated concept graph.
//!
//! This crate provides the foundational abstractions shared by every other crate:
//!
//! - **Text Extraction**: [`TextExtractor`] turns a [`DocumentHandle`] into plain text
//! - **Graph Extraction**: [`GraphExtractionService`] turns text into an [`ExtractedGraph`]
//! - **Graph Storage**: [`ConceptGraphStore`] offers idempotent concept/relation upserts
//! - **Vector Indexing**: [`VectorIndex`] stores raw text with an embedding
//! - **Embedding**: [`Embedder`] converts text to vectors for the index
//! - **Identity**: [`IdentityResolver`] maps extracted names to concept keys
//!
//! ## Architecture
//!
//! ```text
//! DocumentHandle → TextExtractor → GraphExtractionService → validate → ConceptGraphStore
//!                         └──────────────→ VectorIndex (independent, non-fatal)
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Concept`] | A named curriculum entity, keyed by name |
//! | [`Relation`] | A directed, typed edge between two concepts |
//! | [`ExtractedGraph`] | Transient extraction output for one document |
//! | [`ExtractionPolicy`] | Fixed instructions handed to the graph extractor |
//! | [`Strictness`] | What to do with relations that reference unknown entities |
//!
//! ## Related Crates
//!
//! - `cgraph-extract`: text extraction adapters
//! - `cgraph-llm`: language-model graph extraction
//! - `cgraph-embed`: embedding generation
//! - `cgraph-store`: in-memory and Neo4j stores
//! - `cgraph-ingest`: the ingestion pipeline

pub mod error;
pub mod identity;
pub mod traits;
pub mod types;

pub use error::{
    EmbedError, Error, ExtractError, GraphExtractionError, IndexError, Result, StoreError,
};
pub use identity::{ExactNameResolver, IdentityResolver, concept_key};
pub use traits::*;
pub use types::*;

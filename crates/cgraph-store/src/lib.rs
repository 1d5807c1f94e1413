//! Storage layer for cgraph.
//!
//! Implements [`ConceptGraphStore`](cgraph_core::ConceptGraphStore) and
//! [`VectorIndex`](cgraph_core::VectorIndex).
//!
//! # Backends
//!
//! | Type | Feature | Notes |
//! |------|---------|-------|
//! | [`MemoryGraphStore`] | always | Atomic per-document merge under one write lock |
//! | [`MemoryVectorIndex`] | always | Keyed by collection and content hash |
//! | `Neo4jGraphStore` | `neo4j` | `MERGE`-based upserts, one transaction per document |
//! | `Neo4jVectorIndex` | `neo4j` | Nodes labelled with the collection label |
//!
//! # Example
//!
//! ```rust
//! use cgraph_core::ConceptGraphStore;
//! use cgraph_store::MemoryGraphStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryGraphStore::new();
//! store.upsert_concept("Cell", "Scientific concept").await?;
//! store.upsert_concept("Mitochondria", "Scientific concept").await?;
//! store.upsert_relation("Mitochondria", "Cell", "PART_OF").await?;
//!
//! let stats = store.stats().await?;
//! assert_eq!(stats.concept_count, 2);
//! assert_eq!(stats.relation_count, 1);
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod vector;

#[cfg(feature = "neo4j")]
pub mod cypher;
#[cfg(feature = "neo4j")]
pub mod neo4j;

pub use memory::MemoryGraphStore;
pub use vector::{IndexedText, MemoryVectorIndex};

#[cfg(feature = "neo4j")]
pub use neo4j::{Neo4jConfig, Neo4jGraphStore, Neo4jVectorIndex};

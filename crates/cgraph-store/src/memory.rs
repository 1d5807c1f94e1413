//! In-memory concept graph store.
//!
//! Used by the binary when no graph database is configured and by tests that
//! need a real store without a server.

use async_trait::async_trait;
use cgraph_core::{Concept, ConceptGraphStore, GraphStats, MergeStats, Relation, StoreError};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

type RelationKey = (String, String, String);

/// In-memory concept graph.
///
/// Concepts are keyed by name; relations by `(source, target, kind)`. A whole
/// [`merge_graph`](ConceptGraphStore::merge_graph) call is applied under one
/// write lock, so it either lands completely or not at all.
#[derive(Clone, Default)]
pub struct MemoryGraphStore {
    concepts: Arc<RwLock<BTreeMap<String, String>>>,
    relations: Arc<RwLock<BTreeSet<RelationKey>>>,
    last_updated: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl MemoryGraphStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All concepts, ordered by name.
    pub async fn concepts(&self) -> Vec<Concept> {
        self.concepts
            .read()
            .await
            .iter()
            .map(|(name, concept_type)| Concept::new(name, concept_type))
            .collect()
    }

    /// All relations, ordered by `(source, target, kind)`.
    pub async fn relations(&self) -> Vec<Relation> {
        self.relations
            .read()
            .await
            .iter()
            .map(|(s, t, k)| Relation::new(s, t, k))
            .collect()
    }

    async fn touch(&self) {
        *self.last_updated.write().await = Some(Utc::now());
    }
}

#[async_trait]
impl ConceptGraphStore for MemoryGraphStore {
    async fn init(&self) -> Result<(), StoreError> {
        debug!("MemoryGraphStore initialized");
        Ok(())
    }

    async fn upsert_concept(&self, name: &str, concept_type: &str) -> Result<(), StoreError> {
        self.concepts
            .write()
            .await
            .insert(name.to_string(), concept_type.to_string());
        self.touch().await;
        Ok(())
    }

    async fn upsert_relation(
        &self,
        source: &str,
        target: &str,
        kind: &str,
    ) -> Result<(), StoreError> {
        let concepts = self.concepts.read().await;
        for endpoint in [source, target] {
            if !concepts.contains_key(endpoint) {
                return Err(StoreError::ConceptNotFound(endpoint.to_string()));
            }
        }

        self.relations
            .write()
            .await
            .insert((source.to_string(), target.to_string(), kind.to_string()));
        drop(concepts);
        self.touch().await;
        Ok(())
    }

    async fn merge_graph(
        &self,
        concepts: &[Concept],
        relations: &[Relation],
    ) -> Result<MergeStats, StoreError> {
        let mut stored_concepts = self.concepts.write().await;
        let mut stored_relations = self.relations.write().await;

        // Check every endpoint before the first write.
        for relation in relations {
            for endpoint in [&relation.source, &relation.target] {
                let known = stored_concepts.contains_key(endpoint)
                    || concepts.iter().any(|c| &c.name == endpoint);
                if !known {
                    return Err(StoreError::ConceptNotFound(endpoint.clone()));
                }
            }
        }

        for concept in concepts {
            stored_concepts.insert(concept.name.clone(), concept.concept_type.clone());
        }
        for relation in relations {
            stored_relations.insert((
                relation.source.clone(),
                relation.target.clone(),
                relation.kind.clone(),
            ));
        }

        drop(stored_relations);
        drop(stored_concepts);
        self.touch().await;

        debug!(
            "Merged {} concepts and {} relations",
            concepts.len(),
            relations.len()
        );
        Ok(MergeStats {
            concepts_written: concepts.len(),
            relations_written: relations.len(),
        })
    }

    async fn get_concept(&self, name: &str) -> Result<Option<Concept>, StoreError> {
        Ok(self
            .concepts
            .read()
            .await
            .get(name)
            .map(|concept_type| Concept::new(name, concept_type)))
    }

    async fn relations_from(&self, name: &str) -> Result<Vec<Relation>, StoreError> {
        Ok(self
            .relations
            .read()
            .await
            .iter()
            .filter(|(source, _, _)| source == name)
            .map(|(s, t, k)| Relation::new(s, t, k))
            .collect())
    }

    async fn stats(&self) -> Result<GraphStats, StoreError> {
        Ok(GraphStats {
            concept_count: self.concepts.read().await.len() as u64,
            relation_count: self.relations.read().await.len() as u64,
            last_updated: *self.last_updated.read().await,
        })
    }
}

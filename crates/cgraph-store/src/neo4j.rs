//! Neo4j-backed concept graph store and vector index.
//!
//! Concepts are `(:Concept {name, type})` nodes, relations are
//! `[:RELATED_TO {type}]` edges, and indexed text lives on nodes labelled with
//! the collection label.

use async_trait::async_trait;
use cgraph_core::{
    Concept, ConceptGraphStore, Embedder, GraphStats, IndexError, IndexMetadata, MergeStats,
    Relation, StoreError, VectorIndex,
};
use neo4rs::{ConfigBuilder, Graph, Query, Row, Txn, query};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cypher;

/// Connection parameters.
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    /// Database name; the server default when `None`
    pub database: Option<String>,
    pub max_connections: usize,
}

/// Open a pooled connection.
pub async fn connect(config: &Neo4jConfig) -> Result<Graph, StoreError> {
    let mut builder = ConfigBuilder::default()
        .uri(config.uri.as_str())
        .user(config.user.as_str())
        .password(config.password.as_str())
        .max_connections(config.max_connections);
    if let Some(db) = &config.database {
        builder = builder.db(db.as_str());
    }

    let neo_config = builder
        .build()
        .map_err(|e| StoreError::Connection(e.to_string()))?;
    let graph = Graph::connect(neo_config)
        .await
        .map_err(|e| StoreError::Connection(e.to_string()))?;

    info!("Connected to Neo4j at {}", config.uri);
    Ok(graph)
}

fn relation_query(source: &str, target: &str, kind: &str) -> Query {
    query(cypher::UPSERT_RELATION)
        .param("source", source)
        .param("target", target)
        .param("kind", kind)
}

fn concept_query(name: &str, concept_type: &str) -> Query {
    query(cypher::UPSERT_CONCEPT)
        .param("name", name)
        .param("type", concept_type)
}

/// Map the endpoint flags returned by [`cypher::UPSERT_RELATION`].
fn check_endpoints(row: Option<Row>, source: &str, target: &str) -> Result<(), StoreError> {
    let row = row.ok_or_else(|| StoreError::Query("relation upsert returned no row".into()))?;
    let has_source: bool = row
        .get("has_source")
        .map_err(|e| StoreError::Query(e.to_string()))?;
    let has_target: bool = row
        .get("has_target")
        .map_err(|e| StoreError::Query(e.to_string()))?;

    if !has_source {
        return Err(StoreError::ConceptNotFound(source.to_string()));
    }
    if !has_target {
        return Err(StoreError::ConceptNotFound(target.to_string()));
    }
    Ok(())
}

async fn write_batch(
    txn: &mut Txn,
    concepts: &[Concept],
    relations: &[Relation],
) -> Result<(), StoreError> {
    for concept in concepts {
        txn.run(concept_query(&concept.name, &concept.concept_type))
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
    }

    for relation in relations {
        let mut stream = txn
            .execute(relation_query(
                &relation.source,
                &relation.target,
                &relation.kind,
            ))
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        let row = stream
            .next(txn.handle())
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        check_endpoints(row, &relation.source, &relation.target)?;
    }

    Ok(())
}

// ============================================================================
// Graph Store
// ============================================================================

/// Concept graph stored in Neo4j.
pub struct Neo4jGraphStore {
    graph: Graph,
}

impl Neo4jGraphStore {
    /// Wrap an open connection.
    #[must_use]
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    /// Connect using `config`.
    pub async fn connect(config: &Neo4jConfig) -> Result<Self, StoreError> {
        Ok(Self::new(connect(config).await?))
    }

    async fn count(&self, statement: &str) -> Result<u64, StoreError> {
        let mut stream = self
            .graph
            .execute(query(statement))
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        let row = stream
            .next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let n: i64 = row.get("n").map_err(|e| StoreError::Query(e.to_string()))?;
                Ok(n.max(0) as u64)
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl ConceptGraphStore for Neo4jGraphStore {
    async fn init(&self) -> Result<(), StoreError> {
        self.graph
            .run(query(cypher::CONCEPT_CONSTRAINT))
            .await
            .map_err(|e| StoreError::Init(e.to_string()))?;
        debug!("Concept name constraint ensured");
        Ok(())
    }

    async fn upsert_concept(&self, name: &str, concept_type: &str) -> Result<(), StoreError> {
        self.graph
            .run(concept_query(name, concept_type))
            .await
            .map_err(|e| StoreError::Write(e.to_string()))
    }

    async fn upsert_relation(
        &self,
        source: &str,
        target: &str,
        kind: &str,
    ) -> Result<(), StoreError> {
        let mut stream = self
            .graph
            .execute(relation_query(source, target, kind))
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        let row = stream
            .next()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;

        check_endpoints(row, source, target)
    }

    /// Writes the whole document in one transaction; any failure rolls it back.
    async fn merge_graph(
        &self,
        concepts: &[Concept],
        relations: &[Relation],
    ) -> Result<MergeStats, StoreError> {
        let mut txn = self
            .graph
            .start_txn()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        if let Err(e) = write_batch(&mut txn, concepts, relations).await {
            if let Err(rollback) = txn.rollback().await {
                warn!("Rollback failed: {}", rollback);
            }
            return Err(e);
        }

        txn.commit()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;

        debug!(
            "Committed {} concepts and {} relations",
            concepts.len(),
            relations.len()
        );
        Ok(MergeStats {
            concepts_written: concepts.len(),
            relations_written: relations.len(),
        })
    }

    async fn get_concept(&self, name: &str) -> Result<Option<Concept>, StoreError> {
        let mut stream = self
            .graph
            .execute(query(cypher::GET_CONCEPT).param("name", name))
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let Some(row) = stream
            .next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        else {
            return Ok(None);
        };

        let concept_type: Option<String> =
            row.get("type").map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(Some(Concept::new(name, concept_type.unwrap_or_default())))
    }

    async fn relations_from(&self, name: &str) -> Result<Vec<Relation>, StoreError> {
        let mut stream = self
            .graph
            .execute(query(cypher::RELATIONS_FROM).param("name", name))
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut relations = Vec::new();
        while let Some(row) = stream
            .next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            let target: String = row
                .get("target")
                .map_err(|e| StoreError::Query(e.to_string()))?;
            let kind: String = row
                .get("kind")
                .map_err(|e| StoreError::Query(e.to_string()))?;
            relations.push(Relation::new(name, target, kind));
        }
        Ok(relations)
    }

    async fn stats(&self) -> Result<GraphStats, StoreError> {
        Ok(GraphStats {
            concept_count: self.count(cypher::COUNT_CONCEPTS).await?,
            relation_count: self.count(cypher::COUNT_RELATIONS).await?,
            last_updated: None,
        })
    }
}

// ============================================================================
// Vector Index
// ============================================================================

/// Text nodes with embeddings, labelled with the collection label.
pub struct Neo4jVectorIndex {
    graph: Graph,
    embedder: Arc<dyn Embedder>,
    dimension: usize,
}

impl Neo4jVectorIndex {
    pub fn new(graph: Graph, embedder: Arc<dyn Embedder>, dimension: usize) -> Self {
        Self {
            graph,
            embedder,
            dimension,
        }
    }

    fn checked_label(collection: &str) -> Result<&str, IndexError> {
        if cypher::is_valid_label(collection) {
            Ok(collection)
        } else {
            Err(IndexError::Write(format!(
                "invalid collection label: {collection:?}"
            )))
        }
    }

    /// Create the vector index for `collection` if it does not exist.
    pub async fn ensure_collection(&self, collection: &str) -> Result<(), IndexError> {
        let label = Self::checked_label(collection)?;
        self.graph
            .run(query(&cypher::vector_index(label, self.dimension)))
            .await
            .map_err(|e| IndexError::Write(e.to_string()))
    }
}

#[async_trait]
impl VectorIndex for Neo4jVectorIndex {
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
        let label = Self::checked_label(&metadata.collection)?;
        let output = self.embedder.embed_one(text).await?;
        if output.embedding.len() != self.dimension {
            return Err(IndexError::Dimension {
                expected: self.dimension,
                actual: output.embedding.len(),
            });
        }

        let embedding: Vec<f64> = output.embedding.iter().map(|&v| f64::from(v)).collect();
        let statement = cypher::upsert_text(label);
        self.graph
            .run(
                query(&statement)
                    .param("content_hash", metadata.content_hash.as_str())
                    .param("text", text)
                    .param("embedding", embedding)
                    .param("source", metadata.source.as_str())
                    .param("ingested_at", metadata.ingested_at.to_rfc3339()),
            )
            .await
            .map_err(|e| IndexError::Write(e.to_string()))?;

        debug!("Indexed {} chars into :{}", text.len(), label);
        Ok(())
    }
}

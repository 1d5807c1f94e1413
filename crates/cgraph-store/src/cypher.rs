//! Cypher statements used by the Neo4j backend.

/// One concept node per name.
pub const CONCEPT_CONSTRAINT: &str =
    "CREATE CONSTRAINT concept_name IF NOT EXISTS FOR (c:Concept) REQUIRE c.name IS UNIQUE";

pub const UPSERT_CONCEPT: &str = "MERGE (c:Concept {name: $name}) SET c.type = $type";

/// Merges the edge only when both endpoints exist and reports which do, so a
/// missing endpoint never creates a node.
pub const UPSERT_RELATION: &str = "\
OPTIONAL MATCH (s:Concept {name: $source})
OPTIONAL MATCH (t:Concept {name: $target})
FOREACH (_ IN CASE WHEN s IS NOT NULL AND t IS NOT NULL THEN [1] ELSE [] END |
  MERGE (s)-[:RELATED_TO {type: $kind}]->(t))
RETURN s IS NOT NULL AS has_source, t IS NOT NULL AS has_target";

pub const GET_CONCEPT: &str =
    "MATCH (c:Concept {name: $name}) RETURN c.name AS name, c.type AS type";

pub const RELATIONS_FROM: &str = "\
MATCH (s:Concept {name: $name})-[r:RELATED_TO]->(t:Concept)
RETURN s.name AS source, t.name AS target, r.type AS kind
ORDER BY target, kind";

pub const COUNT_CONCEPTS: &str = "MATCH (c:Concept) RETURN count(c) AS n";

pub const COUNT_RELATIONS: &str =
    "MATCH (:Concept)-[r:RELATED_TO]->(:Concept) RETURN count(r) AS n";

/// Whether `label` can be spliced into a statement as a node label.
///
/// Labels cannot be query parameters, so collection labels are restricted to
/// plain identifiers.
#[must_use]
pub fn is_valid_label(label: &str) -> bool {
    let mut chars = label.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Vector index over `embedding` for nodes labelled `label`.
#[must_use]
pub fn vector_index(label: &str, dimension: usize) -> String {
    format!(
        "CREATE VECTOR INDEX {index} IF NOT EXISTS FOR (n:`{label}`) ON (n.embedding) \
         OPTIONS {{indexConfig: {{`vector.dimensions`: {dimension}, \
         `vector.similarity_function`: 'cosine'}}}}",
        index = index_name(label),
    )
}

/// Upsert of one text node, keyed by content hash.
#[must_use]
pub fn upsert_text(label: &str) -> String {
    format!(
        "MERGE (n:`{label}` {{content_hash: $content_hash}}) \
         SET n.text = $text, n.embedding = $embedding, n.source = $source, \
         n.ingested_at = $ingested_at"
    )
}

fn index_name(label: &str) -> String {
    format!("{}_embedding", label.to_lowercase())
}

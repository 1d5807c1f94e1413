//! Validation of an extracted graph before it is merged.
//!
//! Turns the raw [`ExtractedGraph`] into the exact list of upserts the merge
//! will perform:
//!
//! - concept names and relation endpoints are resolved through one
//!   [`IdentityResolver`]; concepts without an identity are dropped
//! - repeated concepts collapse to their first position, carrying the last
//!   type seen (the same end state as upserting them in order)
//! - repeated `(source, target, kind)` relations collapse
//! - relations with a blank kind, or an endpoint missing from the graph's own
//!   entity list, become [`InvalidEdge`]s for the strictness policy to handle

use cgraph_core::{Concept, ExtractedGraph, IdentityResolver, Relation};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Why a relation cannot be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidEdgeReason {
    UnknownSource,
    UnknownTarget,
    BlankKind,
}

impl fmt::Display for InvalidEdgeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnknownSource => "unknown source entity",
            Self::UnknownTarget => "unknown target entity",
            Self::BlankKind => "blank relation kind",
        })
    }
}

/// A relation that references an entity the same graph does not define.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{reason}: {} -[{}]-> {}", .relation.source, .relation.kind, .relation.target)]
pub struct InvalidEdge {
    pub relation: Relation,
    pub reason: InvalidEdgeReason,
}

/// The upserts one document will perform, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedGraph {
    pub concepts: Vec<Concept>,
    pub relations: Vec<Relation>,
}

/// What validation changed or rejected.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Entities whose name has no identity (blank)
    pub dropped_concepts: Vec<Concept>,
    /// Entities folded into an earlier entity with the same key
    pub duplicate_concepts: usize,
    /// Relations folded into an identical earlier relation
    pub duplicate_relations: usize,
    pub invalid_edges: Vec<InvalidEdge>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dropped_concepts.is_empty() && self.invalid_edges.is_empty()
    }
}

/// Validate `graph`, resolving every name through `resolver`.
#[must_use]
pub fn validate_graph(
    graph: &ExtractedGraph,
    resolver: &dyn IdentityResolver,
) -> (ValidatedGraph, ValidationReport) {
    let mut report = ValidationReport::default();
    let mut concepts: Vec<Concept> = Vec::with_capacity(graph.entities.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for entity in &graph.entities {
        let Some(key) = resolver.resolve(&entity.name) else {
            report.dropped_concepts.push(entity.clone());
            continue;
        };

        match positions.get(&key) {
            Some(&pos) => {
                concepts[pos].concept_type.clone_from(&entity.concept_type);
                report.duplicate_concepts += 1;
            }
            None => {
                positions.insert(key.clone(), concepts.len());
                concepts.push(Concept::new(key, entity.concept_type.clone()));
            }
        }
    }

    let mut relations = Vec::with_capacity(graph.relationships.len());
    let mut seen: HashSet<(String, String, String)> = HashSet::new();

    for relation in &graph.relationships {
        let source = resolver
            .resolve(&relation.source)
            .filter(|key| positions.contains_key(key));
        let target = resolver
            .resolve(&relation.target)
            .filter(|key| positions.contains_key(key));

        let reason = if relation.kind.trim().is_empty() {
            Some(InvalidEdgeReason::BlankKind)
        } else if source.is_none() {
            Some(InvalidEdgeReason::UnknownSource)
        } else if target.is_none() {
            Some(InvalidEdgeReason::UnknownTarget)
        } else {
            None
        };

        let (Some(source), Some(target), None) = (source, target, reason) else {
            report.invalid_edges.push(InvalidEdge {
                relation: relation.clone(),
                reason: reason.unwrap_or(InvalidEdgeReason::UnknownSource),
            });
            continue;
        };

        if seen.insert((source.clone(), target.clone(), relation.kind.clone())) {
            relations.push(Relation::new(source, target, relation.kind.clone()));
        } else {
            report.duplicate_relations += 1;
        }
    }

    (ValidatedGraph { concepts, relations }, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgraph_core::ExactNameResolver;

    fn validate(graph: &ExtractedGraph) -> (ValidatedGraph, ValidationReport) {
        validate_graph(graph, &ExactNameResolver)
    }

    #[test]
    fn test_valid_graph_passes_through() {
        let graph = ExtractedGraph::new(
            vec![
                Concept::new("Photosynthesis", "Process"),
                Concept::new("Glucose", "Substance"),
            ],
            vec![Relation::new("Photosynthesis", "Glucose", "PRODUCES")],
        );

        let (validated, report) = validate(&graph);
        assert_eq!(validated.concepts, graph.entities);
        assert_eq!(validated.relations, graph.relationships);
        assert!(report.is_clean());
    }

    #[test]
    fn test_unknown_endpoints_are_invalid() {
        let graph = ExtractedGraph::new(
            vec![Concept::new("Glucose", "Substance")],
            vec![
                Relation::new("Glucose", "Starch", "PART_OF"),
                Relation::new("Chlorophyll", "Glucose", "PRODUCES"),
            ],
        );

        let (validated, report) = validate(&graph);
        assert_eq!(validated.concepts.len(), 1);
        assert!(validated.relations.is_empty());

        let reasons: Vec<_> = report.invalid_edges.iter().map(|e| e.reason).collect();
        assert_eq!(
            reasons,
            vec![
                InvalidEdgeReason::UnknownTarget,
                InvalidEdgeReason::UnknownSource
            ]
        );
    }

    #[test]
    fn test_blank_kind_is_invalid() {
        let graph = ExtractedGraph::new(
            vec![Concept::new("A", "Law"), Concept::new("B", "Law")],
            vec![Relation::new("A", "B", "  ")],
        );

        let (_, report) = validate(&graph);
        assert_eq!(report.invalid_edges[0].reason, InvalidEdgeReason::BlankKind);
    }

    #[test]
    fn test_blank_names_are_dropped() {
        let graph = ExtractedGraph::new(
            vec![Concept::new("", "Law"), Concept::new("Ohm's law", "Law")],
            vec![Relation::new("", "Ohm's law", "RELATES_TO")],
        );

        let (validated, report) = validate(&graph);
        assert_eq!(validated.concepts, vec![Concept::new("Ohm's law", "Law")]);
        assert_eq!(report.dropped_concepts.len(), 1);
        assert_eq!(
            report.invalid_edges[0].reason,
            InvalidEdgeReason::UnknownSource
        );
    }

    #[test]
    fn test_duplicate_concepts_keep_first_position_last_type() {
        let graph = ExtractedGraph::new(
            vec![
                Concept::new("Energy", "Physics"),
                Concept::new("Cell", "Biology"),
                Concept::new("Energy", "Chemistry"),
            ],
            Vec::new(),
        );

        let (validated, report) = validate(&graph);
        assert_eq!(
            validated.concepts,
            vec![
                Concept::new("Energy", "Chemistry"),
                Concept::new("Cell", "Biology")
            ]
        );
        assert_eq!(report.duplicate_concepts, 1);
    }

    #[test]
    fn test_duplicate_relations_collapse() {
        let graph = ExtractedGraph::new(
            vec![Concept::new("A", "Law"), Concept::new("B", "Law")],
            vec![
                Relation::new("A", "B", "CAUSES"),
                Relation::new("A", "B", "CAUSES"),
                Relation::new("A", "B", "RELATES_TO"),
            ],
        );

        let (validated, report) = validate(&graph);
        assert_eq!(validated.relations.len(), 2);
        assert_eq!(report.duplicate_relations, 1);
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let graph = ExtractedGraph::new(
            vec![Concept::new("Cell", "Biology")],
            vec![Relation::new("cell", "Cell", "RELATES_TO")],
        );

        let (_, report) = validate(&graph);
        assert_eq!(report.invalid_edges.len(), 1);
    }

    #[test]
    fn test_invalid_edge_display() {
        let edge = InvalidEdge {
            relation: Relation::new("Glucose", "Starch", "PART_OF"),
            reason: InvalidEdgeReason::UnknownTarget,
        };
        assert_eq!(
            edge.to_string(),
            "unknown target entity: Glucose -[PART_OF]-> Starch"
        );
    }
}

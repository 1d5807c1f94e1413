//! Why an ingestion failed.

use cgraph_core::{ExtractError, GraphExtractionError, StoreError};
use thiserror::Error;

use crate::validate::InvalidEdge;

/// Reason carried by [`IngestionResult::Failed`](crate::IngestionResult::Failed).
#[derive(Error, Debug)]
pub enum IngestError {
    /// The document could not be turned into text. Nothing was written.
    #[error("text extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    /// The graph extractor failed or returned unusable data. Nothing was written.
    #[error("graph extraction failed: {0}")]
    GraphExtraction(#[from] GraphExtractionError),

    /// Strict mode found relations referencing unknown entities. Nothing was written.
    #[error("{} invalid relation(s), first: {}", .0.len(), first_edge(.0))]
    InvalidEdges(Vec<InvalidEdge>),

    /// The graph merge stopped part-way. Earlier upserts may be committed;
    /// re-running the ingestion is safe.
    #[error("store write failed: {0}")]
    StoreWrite(#[from] StoreError),
}

fn first_edge(edges: &[InvalidEdge]) -> String {
    edges
        .first()
        .map_or_else(|| "none".to_string(), ToString::to_string)
}

impl IngestError {
    /// Whether any write may have reached the graph store.
    #[must_use]
    pub fn may_have_written(&self) -> bool {
        matches!(self, Self::StoreWrite(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::InvalidEdgeReason;
    use cgraph_core::Relation;

    #[test]
    fn test_invalid_edges_display() {
        let err = IngestError::InvalidEdges(vec![InvalidEdge {
            relation: Relation::new("Glucose", "Starch", "PART_OF"),
            reason: InvalidEdgeReason::UnknownTarget,
        }]);
        assert_eq!(
            err.to_string(),
            "1 invalid relation(s), first: unknown target entity: Glucose -[PART_OF]-> Starch"
        );
        assert!(!err.may_have_written());
    }

    #[test]
    fn test_from_layer_errors() {
        let err: IngestError = ExtractError::Empty("scan.pdf".to_string()).into();
        assert!(matches!(err, IngestError::Extraction(_)));
        assert!(!err.may_have_written());

        let err: IngestError = StoreError::ConceptNotFound("Cell".to_string()).into();
        assert!(matches!(err, IngestError::StoreWrite(_)));
        assert!(err.may_have_written());
        assert_eq!(err.to_string(), "store write failed: concept not found: Cell");
    }
}

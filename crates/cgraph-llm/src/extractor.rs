//! Graph extraction through a chat-completions model.

use async_trait::async_trait;
use cgraph_core::{
    ExtractedGraph, ExtractionPolicy, GraphExtractionError, GraphExtractionService,
    normalize_relation_kind,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::client::ChatClient;
use crate::json::find_json_object;
use crate::prompts::build_messages;

const SCHEMA_NAME: &str = "knowledge_graph";

/// [`GraphExtractionService`] that asks a language model for JSON matching the
/// [`ExtractedGraph`] schema.
pub struct LlmGraphExtractor {
    client: ChatClient,
    schema: Value,
}

impl LlmGraphExtractor {
    pub fn new(client: ChatClient) -> Result<Self, GraphExtractionError> {
        let schema = serde_json::to_value(schemars::schema_for!(ExtractedGraph))
            .map_err(|e| GraphExtractionError::Malformed(format!("schema: {e}")))?;
        Ok(Self { client, schema })
    }
}

/// Decode a model reply into a graph with upper-snake-case relation kinds.
///
/// Kinds outside the policy are kept: the policy guides the model, it does
/// not filter its output.
pub fn parse_graph(reply: &str) -> Result<ExtractedGraph, GraphExtractionError> {
    let json = find_json_object(reply)
        .ok_or_else(|| GraphExtractionError::Malformed("no JSON object in reply".to_string()))?;

    let mut graph: ExtractedGraph =
        serde_json::from_str(json).map_err(|e| GraphExtractionError::Malformed(e.to_string()))?;

    for relation in &mut graph.relationships {
        relation.kind = normalize_relation_kind(&relation.kind);
    }
    Ok(graph)
}

#[async_trait]
impl GraphExtractionService for LlmGraphExtractor {
    async fn extract_graph(
        &self,
        text: &str,
        policy: &ExtractionPolicy,
    ) -> Result<ExtractedGraph, GraphExtractionError> {
        if policy.entity_categories.is_empty() {
            return Err(GraphExtractionError::PolicyViolation(
                "policy names no entity categories".to_string(),
            ));
        }

        let messages = build_messages(policy, text);
        debug!(
            "Requesting graph extraction from {} for {} chars",
            self.client.model(),
            text.len()
        );

        let reply = self
            .client
            .complete_json(&messages, SCHEMA_NAME, self.schema.clone())
            .await?;
        let graph = parse_graph(&reply)?;

        info!(
            "Model extracted {} entities and {} relationships",
            graph.entities.len(),
            graph.relationships.len()
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ChatConfig, RetryPolicy};
    use cgraph_core::{Concept, Relation};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor_for(server: &MockServer) -> LlmGraphExtractor {
        let client = ChatClient::new(ChatConfig {
            base_url: server.uri(),
            api_key: Some("test-key".to_string()),
            retry: RetryPolicy {
                initial_interval: Duration::from_millis(10),
                max_interval: Duration::from_millis(50),
                max_elapsed: Duration::from_millis(300),
            },
            ..ChatConfig::default()
        })
        .unwrap();
        LlmGraphExtractor::new(client).unwrap()
    }

    fn completion(content: &str) -> Value {
        json!({
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop",
            }],
        })
    }

    // ========== parse_graph Tests ==========

    #[test]
    fn test_parse_graph_accepts_type_and_relation_fields() {
        let reply = r#"{
            "entities": [
                {"name": "Photosynthesis", "type": "Process"},
                {"name": "Glucose", "type": "Substance"}
            ],
            "relationships": [
                {"source": "Photosynthesis", "target": "Glucose", "relation": "produces"}
            ]
        }"#;

        let graph = parse_graph(reply).unwrap();
        assert_eq!(graph.entities[0], Concept::new("Photosynthesis", "Process"));
        assert_eq!(
            graph.relationships,
            vec![Relation::new("Photosynthesis", "Glucose", "PRODUCES")]
        );
    }

    #[test]
    fn test_parse_graph_keeps_unlisted_kinds() {
        let reply = r#"{"entities": [], "relationships": [
            {"source": "A", "target": "B", "kind": "discovered by"}
        ]}"#;
        let graph = parse_graph(reply).unwrap();
        assert_eq!(graph.relationships[0].kind, "DISCOVERED_BY");
    }

    #[test]
    fn test_parse_graph_fenced_reply() {
        let reply = "```json\n{\"entities\": [{\"name\": \"Cell\", \"type\": \"Biology\"}]}\n```";
        let graph = parse_graph(reply).unwrap();
        assert_eq!(graph.entities.len(), 1);
        assert!(graph.relationships.is_empty());
    }

    #[test]
    fn test_parse_graph_malformed() {
        assert!(matches!(
            parse_graph("no graph here"),
            Err(GraphExtractionError::Malformed(_))
        ));
        assert!(matches!(
            parse_graph(r#"{"entities": [{"name": 42}]}"#),
            Err(GraphExtractionError::Malformed(_))
        ));
    }

    #[test]
    fn test_schema_describes_graph() {
        let schema = serde_json::to_value(schemars::schema_for!(ExtractedGraph)).unwrap();
        let properties = &schema["properties"];
        assert!(properties.get("entities").is_some());
        assert!(properties.get("relationships").is_some());
    }

    // ========== Service Tests ==========

    #[tokio::test]
    async fn test_extract_graph_end_to_end() {
        let server = MockServer::start().await;
        let reply = json!({
            "entities": [
                {"name": "Photosynthesis", "type": "Process"},
                {"name": "Glucose", "type": "Substance"}
            ],
            "relationships": [
                {"source": "Photosynthesis", "target": "Glucose", "kind": "PRODUCES"}
            ]
        })
        .to_string();

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains(
                "Extract the graph from this textbook section: Photosynthesis produces Glucose.",
            ))
            .and(body_string_contains("knowledge_graph"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(&reply)))
            .expect(1)
            .mount(&server)
            .await;

        let graph = extractor_for(&server)
            .extract_graph(
                "Photosynthesis produces Glucose.",
                &ExtractionPolicy::default(),
            )
            .await
            .unwrap();

        assert_eq!(graph.entities.len(), 2);
        assert_eq!(graph.relationships.len(), 1);
    }

    #[tokio::test]
    async fn test_extract_graph_empty_policy_is_violation() {
        let server = MockServer::start().await;
        let policy = ExtractionPolicy {
            entity_categories: Vec::new(),
            ..ExtractionPolicy::default()
        };

        let err = extractor_for(&server)
            .extract_graph("text", &policy)
            .await
            .unwrap_err();
        assert!(matches!(err, GraphExtractionError::PolicyViolation(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extract_graph_malformed_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion("Sorry, I can't do that.")),
            )
            .mount(&server)
            .await;

        let err = extractor_for(&server)
            .extract_graph("text", &ExtractionPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphExtractionError::Malformed(_)));
    }
}

//! Integration tests for the full cgraph pipeline.
//!
//! Tests the complete flow: file → text → model graph extraction → validation
//! → embedding + vector index → concept graph merge, with the model and the
//! embedding endpoint served by wiremock.

use cgraph_core::{
    Concept, ConceptGraphStore, DocumentHandle, Embedder, ExtractionStrategy, Relation,
    Strictness,
};
use cgraph_embed::{EmbedderPool, HttpEmbedder};
use cgraph_extract::ExtractorRegistry;
use cgraph_ingest::{IngestError, IngestionPipeline, PipelineConfig};
use cgraph_llm::{ChatClient, ChatConfig, LlmGraphExtractor, RetryPolicy};
use cgraph_store::{MemoryGraphStore, MemoryVectorIndex};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_DIM: usize = 4;

fn completion(graph: &Value) -> Value {
    json!({
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": graph.to_string() },
            "finish_reason": "stop",
        }],
    })
}

fn embeddings() -> Value {
    json!({
        "data": [{ "index": 0, "embedding": [0.1, 0.2, 0.3, 0.4] }],
        "usage": { "prompt_tokens": 6, "total_tokens": 6 },
    })
}

async fn mount_model(server: &MockServer, section: &str, graph: Value) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains(section))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&graph)))
        .mount(server)
        .await;
}

async fn mount_embeddings(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embeddings()))
        .mount(server)
        .await;
}

struct Harness {
    pipeline: IngestionPipeline,
    store: Arc<MemoryGraphStore>,
    index: Arc<MemoryVectorIndex>,
}

fn harness(server: &MockServer, strictness: Strictness) -> Harness {
    let client = ChatClient::new(ChatConfig {
        base_url: server.uri(),
        api_key: Some("test-key".to_string()),
        retry: RetryPolicy {
            initial_interval: Duration::from_millis(10),
            max_interval: Duration::from_millis(20),
            max_elapsed: Duration::from_millis(200),
        },
        ..ChatConfig::default()
    })
    .unwrap();

    let embedder = HttpEmbedder::new(server.uri(), "test-embedding", TEST_DIM, None)
        .unwrap()
        .with_max_elapsed(Duration::from_millis(200));
    let embedder = Arc::new(EmbedderPool::new(Arc::new(embedder) as Arc<dyn Embedder>, 2));

    let store = Arc::new(MemoryGraphStore::new());
    let index = Arc::new(MemoryVectorIndex::new(embedder, TEST_DIM));

    let pipeline = IngestionPipeline::new(
        Arc::new(ExtractorRegistry::with_defaults(ExtractionStrategy::Auto)),
        Arc::new(LlmGraphExtractor::new(client).unwrap()),
        store.clone(),
        index.clone(),
        PipelineConfig {
            strictness,
            ..PipelineConfig::default()
        },
    );

    Harness {
        pipeline,
        store,
        index,
    }
}

#[tokio::test]
async fn test_full_pipeline_photosynthesis() {
    let server = MockServer::start().await;
    mount_model(
        &server,
        "Photosynthesis produces Glucose.",
        json!({
            "entities": [
                { "name": "Photosynthesis", "type": "Process" },
                { "name": "Glucose", "type": "Substance" }
            ],
            "relationships": [
                { "source": "Photosynthesis", "target": "Glucose", "relation": "produces" }
            ]
        }),
    )
    .await;
    mount_embeddings(&server).await;

    let dir = tempdir().unwrap();
    let file = dir.path().join("biology.txt");
    std::fs::write(&file, "Photosynthesis produces Glucose.").unwrap();

    let h = harness(&server, Strictness::SkipInvalidEdges);
    h.pipeline.init().await.unwrap();

    let result = h.pipeline.ingest(&DocumentHandle::path(&file)).await;
    assert_eq!(result.counts(), Some((2, 1)));

    let summary = result.summary().unwrap();
    assert!(summary.index_error.is_none());
    let indexed = h.index.get("Chunk", &summary.content_hash).await.unwrap();
    assert_eq!(indexed.text, "Photosynthesis produces Glucose.");
    assert_eq!(indexed.embedding, vec![0.1, 0.2, 0.3, 0.4]);

    assert_eq!(
        h.store.get_concept("Glucose").await.unwrap(),
        Some(Concept::new("Glucose", "Substance"))
    );
    assert_eq!(
        h.store.relations().await,
        vec![Relation::new("Photosynthesis", "Glucose", "PRODUCES")]
    );
}

#[tokio::test]
async fn test_full_pipeline_is_idempotent() {
    let server = MockServer::start().await;
    mount_model(
        &server,
        "Ohm",
        json!({
            "entities": [
                { "name": "Ohm's law", "type": "Law" },
                { "name": "Voltage", "type": "Scientific concept" }
            ],
            "relationships": [
                { "source": "Voltage", "target": "Ohm's law", "kind": "PREREQUISITE_FOR" }
            ]
        }),
    )
    .await;
    mount_embeddings(&server).await;

    let dir = tempdir().unwrap();
    let file = dir.path().join("physics.md");
    std::fs::write(&file, "# Circuits\n\nOhm's law relates voltage and current.").unwrap();
    let document = DocumentHandle::path(&file);

    let h = harness(&server, Strictness::SkipInvalidEdges);
    assert!(h.pipeline.ingest(&document).await.is_success());
    assert!(h.pipeline.ingest(&document).await.is_success());

    let stats = h.store.stats().await.unwrap();
    assert_eq!(stats.concept_count, 2);
    assert_eq!(stats.relation_count, 1);
    assert_eq!(h.index.len("Chunk").await, 1);
}

#[tokio::test]
async fn test_strict_mode_rejects_dangling_relation() {
    let server = MockServer::start().await;
    mount_model(
        &server,
        "starch",
        json!({
            "entities": [{ "name": "Glucose", "type": "Substance" }],
            "relationships": [
                { "source": "Glucose", "target": "Starch", "kind": "PART_OF" }
            ]
        }),
    )
    .await;
    mount_embeddings(&server).await;

    let h = harness(&server, Strictness::AbortOnInvalid);
    let document = DocumentHandle::bytes(
        "upload.txt",
        Some("text/plain"),
        b"Glucose is stored as starch.".to_vec(),
    );

    let result = h.pipeline.ingest(&document).await;
    assert!(matches!(result.error(), Some(IngestError::InvalidEdges(_))));
    assert!(h.store.concepts().await.is_empty());
    assert_eq!(h.index.len("Chunk").await, 0);
}

#[tokio::test]
async fn test_embedding_outage_does_not_block_merge() {
    let server = MockServer::start().await;
    mount_model(
        &server,
        "Mitosis",
        json!({
            "entities": [{ "name": "Mitosis", "type": "Scientific concept" }]
        }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad model"))
        .mount(&server)
        .await;

    let h = harness(&server, Strictness::SkipInvalidEdges);
    let document = DocumentHandle::bytes("cells.txt", None, b"Mitosis divides cells.".to_vec());

    let result = h.pipeline.ingest(&document).await;
    assert_eq!(result.counts(), Some((1, 0)));
    assert!(result.summary().unwrap().index_error.is_some());
    assert_eq!(h.store.concepts().await.len(), 1);
}

#[tokio::test]
async fn test_model_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let h = harness(&server, Strictness::SkipInvalidEdges);
    let document = DocumentHandle::bytes("notes.txt", None, b"Some text.".to_vec());

    let result = h.pipeline.ingest(&document).await;
    assert!(matches!(result.error(), Some(IngestError::GraphExtraction(_))));
    assert!(h.store.concepts().await.is_empty());
}

#[tokio::test]
async fn test_unsupported_document_fails_fast() {
    let server = MockServer::start().await;
    let h = harness(&server, Strictness::SkipInvalidEdges);
    let document = DocumentHandle::bytes("diagram.png", None, vec![0x89, 0x50, 0x4e, 0x47]);

    let result = h.pipeline.ingest(&document).await;
    assert!(matches!(result.error(), Some(IngestError::Extraction(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

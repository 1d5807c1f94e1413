//! Embedder backed by an OpenAI-compatible `/embeddings` endpoint.

use async_trait::async_trait;
use backoff::{ExponentialBackoffBuilder, future::retry};
use cgraph_core::{EmbedError, Embedder, EmbeddingOutput};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of inputs per request.
const BATCH_CHUNK_SIZE: usize = 512;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: usize,
}

/// HTTP embedding client.
pub struct HttpEmbedder {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    max_elapsed: Duration,
}

impl HttpEmbedder {
    /// Create an embedder for `model` at `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
        api_key: Option<String>,
    ) -> Result<Self, EmbedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| EmbedError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            dimension,
            max_elapsed: Duration::from_secs(60),
        })
    }

    /// Total time budget for retries of one request.
    #[must_use]
    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    async fn embed_chunk(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_interval(Duration::from_secs(10))
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build();

        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response: EmbeddingResponse = retry(policy, || async {
            let mut request = self.client.post(&url).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = request.send().await.map_err(|e| {
                let err = EmbedError::Request(e.to_string());
                if e.is_timeout() || e.is_connect() {
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                warn!("Embedding endpoint returned {}, retrying", status);
                return Err(backoff::Error::transient(EmbedError::Request(format!(
                    "HTTP {status}"
                ))));
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(backoff::Error::permanent(EmbedError::Request(format!(
                    "HTTP {status}: {message}"
                ))));
            }

            response
                .json::<EmbeddingResponse>()
                .await
                .map_err(|e| backoff::Error::permanent(EmbedError::Response(e.to_string())))
        })
        .await?;

        self.collect_outputs(response, texts.len())
    }

    fn collect_outputs(
        &self,
        response: EmbeddingResponse,
        expected: usize,
    ) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        if response.data.len() != expected {
            return Err(EmbedError::Response(format!(
                "expected {expected} embeddings, got {}",
                response.data.len()
            )));
        }

        let mut data = response.data;
        data.sort_by_key(|d| d.index);

        if let Some(bad) = data.iter().find(|d| d.embedding.len() != self.dimension) {
            return Err(EmbedError::Response(format!(
                "expected dimension {}, got {}",
                self.dimension,
                bad.embedding.len()
            )));
        }

        // Usage is reported per request; spread it evenly.
        let tokens = response.usage.map_or(0, |u| u.prompt_tokens);
        let per_input = tokens / expected.max(1);

        Ok(data
            .into_iter()
            .map(|d| EmbeddingOutput {
                embedding: d.embedding,
                token_count: per_input,
            })
            .collect())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_text(&self, texts: &[&str]) -> Result<Vec<EmbeddingOutput>, EmbedError> {
        let mut outputs = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(BATCH_CHUNK_SIZE) {
            outputs.extend(self.embed_chunk(chunk).await?);
        }
        debug!("Embedded {} texts with {}", outputs.len(), self.model);
        Ok(outputs)
    }
}

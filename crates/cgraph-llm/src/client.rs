//! Chat-completions HTTP client.

use backoff::{ExponentialBackoffBuilder, future::retry};
use cgraph_core::GraphExtractionError;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Bounds for exponential backoff on transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Give up once this much time has passed since the first attempt
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(30),
            max_elapsed: Duration::from_secs(120),
        }
    }
}

/// Endpoint and model settings.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

/// Client for `POST {base_url}/chat/completions`.
#[derive(Clone)]
pub struct ChatClient {
    http: Client,
    config: ChatConfig,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .field("api_key", &self.config.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, GraphExtractionError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GraphExtractionError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Request a completion constrained to `schema` and return the raw content.
    pub async fn complete_json(
        &self,
        messages: &[Message],
        schema_name: &str,
        schema: Value,
    ) -> Result<String, GraphExtractionError> {
        let request = json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "schema": schema,
                    "strict": false,
                }
            }
        });

        let response = self.call_with_retry(&request).await?;
        extract_content(&response)
    }

    async fn call_with_retry(&self, request: &Value) -> Result<Value, GraphExtractionError> {
        let retry_policy = &self.config.retry;
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(retry_policy.initial_interval)
            .with_max_interval(retry_policy.max_interval)
            .with_max_elapsed_time(Some(retry_policy.max_elapsed))
            .build();

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        retry(policy, || async {
            match self.send(&url, request).await {
                Ok(response) => Ok(response),
                Err(e) if e.is_transient() => {
                    warn!("Chat completion failed ({}), retrying with backoff", e);
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }

    async fn send(&self, url: &str, request: &Value) -> Result<Value, GraphExtractionError> {
        let mut builder = self.http.post(url).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                GraphExtractionError::Transport(e.to_string())
            } else {
                GraphExtractionError::Api {
                    status: 0,
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        debug!("Chat completion returned {}", status);
        if status.is_success() {
            return response
                .json::<Value>()
                .await
                .map_err(|e| GraphExtractionError::Malformed(e.to_string()));
        }

        let message = response.text().await.unwrap_or_default();
        Err(map_status(status, message))
    }
}

fn map_status(status: StatusCode, message: String) -> GraphExtractionError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => GraphExtractionError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GraphExtractionError::Authentication,
        _ => GraphExtractionError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// The assistant message text of the first choice.
fn extract_content(response: &Value) -> Result<String, GraphExtractionError> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .filter(|content| !content.trim().is_empty())
        .map(ToOwned::to_owned)
        .ok_or(GraphExtractionError::EmptyResponse)
}

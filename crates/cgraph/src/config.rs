//! Configuration handling for cgraph.
//!
//! Settings live in `config.toml` under the XDG config directory. Secrets
//! (API keys, the Neo4j password) are never read from the file; they come
//! from the environment, optionally seeded from a `.env` file.

use anyhow::{Context, Result};
use cgraph_core::{ExtractionPolicy, ExtractionStrategy, Strictness};
use cgraph_ingest::PipelineConfig;
use cgraph_llm::{ChatConfig, RetryPolicy};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    /// Language model used for graph extraction
    #[serde(default)]
    #[validate(nested)]
    pub llm: LlmConfig,

    /// Embeddings for the vector index
    #[serde(default)]
    #[validate(nested)]
    pub embedding: EmbeddingConfig,

    /// Graph store and vector index backend
    #[serde(default)]
    #[validate(nested)]
    pub store: StoreConfig,

    /// Pipeline behaviour
    #[serde(default)]
    #[validate(nested)]
    pub ingest: IngestConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Chat-completions endpoint used for graph extraction.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    #[validate(length(min = 1))]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    #[validate(length(min = 1))]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,

    /// First retry delay (ms)
    #[serde(default = "default_retry_initial_ms")]
    pub retry_initial_ms: u64,

    /// Longest retry delay (ms)
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,

    /// Stop retrying after this long (seconds)
    #[serde(default = "default_retry_max_elapsed_secs")]
    pub retry_max_elapsed_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_retry_initial_ms() -> u64 {
    500
}

fn default_retry_max_ms() -> u64 {
    30_000
}

fn default_retry_max_elapsed_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_llm_model(),
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
            retry_initial_ms: default_retry_initial_ms(),
            retry_max_ms: default_retry_max_ms(),
            retry_max_elapsed_secs: default_retry_max_elapsed_secs(),
        }
    }
}

/// Which embedder feeds the vector index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Zero vectors; keeps the index write path without a model
    #[default]
    Noop,
    /// OpenAI-compatible `/embeddings` endpoint
    Http,
}

/// Embedding-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    #[serde(default = "default_base_url")]
    #[validate(length(min = 1))]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    #[validate(length(min = 1))]
    pub model: String,

    /// Vector dimension produced by the model
    #[serde(default = "default_dimension")]
    #[validate(range(min = 1))]
    pub dimension: usize,

    /// Max concurrent embedding requests
    #[serde(default = "default_max_concurrent")]
    #[validate(range(min = 1))]
    pub max_concurrent: usize,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_dimension() -> usize {
    1536
}

fn default_max_concurrent() -> usize {
    4
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            base_url: default_base_url(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Storage backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store, discarded on exit
    #[default]
    Memory,
    /// Neo4j (requires the `neo4j` feature)
    Neo4j,
}

/// Store connection configuration. The password comes from `NEO4J_PASSWORD`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default = "default_neo4j_uri")]
    #[validate(length(min = 1))]
    pub uri: String,

    #[serde(default = "default_neo4j_user")]
    pub user: String,

    /// Database name (server default when unset)
    #[serde(default)]
    pub database: Option<String>,

    #[serde(default = "default_max_connections")]
    #[validate(range(min = 1))]
    pub max_connections: usize,
}

fn default_neo4j_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_neo4j_user() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> usize {
    16
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            uri: default_neo4j_uri(),
            user: default_neo4j_user(),
            database: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestConfig {
    #[serde(default)]
    pub strictness: Strictness,

    #[serde(default)]
    pub strategy: ExtractionStrategy,

    /// Label of the vector index collection
    #[serde(default = "default_collection")]
    #[validate(length(min = 1))]
    pub collection: String,

    /// Documents ingested at once
    #[serde(default = "default_concurrency")]
    #[validate(range(min = 1))]
    pub concurrency: usize,

    /// Graph extraction instructions
    #[serde(default)]
    pub policy: ExtractionPolicy,
}

fn default_collection() -> String {
    cgraph_ingest::pipeline::DEFAULT_COLLECTION.to_string()
}

fn default_concurrency() -> usize {
    2
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::default(),
            strategy: ExtractionStrategy::default(),
            collection: default_collection(),
            concurrency: default_concurrency(),
            policy: ExtractionPolicy::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive, e.g. `info` or `cgraph_ingest=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Credentials taken from the environment.
#[derive(Clone, Default)]
pub struct Secrets {
    pub llm_api_key: Option<String>,
    pub embedding_api_key: Option<String>,
    pub neo4j_password: Option<String>,
    /// `NEO4J_URI` overrides `[store] uri`
    pub neo4j_uri: Option<String>,
    /// `NEO4J_USERNAME` overrides `[store] user`
    pub neo4j_user: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("Secrets")
            .field("llm_api_key", &redact(&self.llm_api_key))
            .field("embedding_api_key", &redact(&self.embedding_api_key))
            .field("neo4j_password", &redact(&self.neo4j_password))
            .field("neo4j_uri", &self.neo4j_uri)
            .field("neo4j_user", &self.neo4j_user)
            .finish()
    }
}

impl Secrets {
    /// Read secrets from the process environment, after loading `.env` from
    /// the working directory and the data directory.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        if let Some(path) = dotenv_path() {
            dotenvy::from_path(path).ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read secrets through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let openai = get("OPENAI_API_KEY");

        Self {
            llm_api_key: get("CGRAPH_LLM_API_KEY").or_else(|| openai.clone()),
            embedding_api_key: get("CGRAPH_EMBEDDING_API_KEY").or(openai),
            neo4j_password: get("NEO4J_PASSWORD"),
            neo4j_uri: get("NEO4J_URI"),
            neo4j_user: get("NEO4J_USERNAME"),
        }
    }
}

impl Config {
    /// Load from the default config path, or defaults if no file exists.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load from an explicit `path`, which must exist, or from the default
    /// config path, which may be missing.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => match Self::config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Parse and validate TOML.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file path.
    pub fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// The immutable configuration handed to the pipeline.
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            policy: self.ingest.policy.clone(),
            strictness: self.ingest.strictness,
            collection: self.ingest.collection.clone(),
            strategy: self.ingest.strategy,
        }
    }

    /// Chat client settings with the API key from `secrets`.
    pub fn chat_config(&self, secrets: &Secrets) -> ChatConfig {
        ChatConfig {
            base_url: self.llm.base_url.clone(),
            api_key: secrets.llm_api_key.clone(),
            model: self.llm.model.clone(),
            temperature: self.llm.temperature,
            timeout: Duration::from_secs(self.llm.timeout_secs),
            retry: RetryPolicy {
                initial_interval: Duration::from_millis(self.llm.retry_initial_ms),
                max_interval: Duration::from_millis(self.llm.retry_max_ms),
                max_elapsed: Duration::from_secs(self.llm.retry_max_elapsed_secs),
            },
        }
    }

    /// Commented sample configuration.
    pub fn sample_toml() -> &'static str {
        r#"# cgraph configuration
#
# Secrets are read from the environment (or a .env file), never from here:
#   CGRAPH_LLM_API_KEY / OPENAI_API_KEY   graph extraction model
#   CGRAPH_EMBEDDING_API_KEY              embedding endpoint (falls back to OPENAI_API_KEY)
#   NEO4J_PASSWORD                        graph database
#   NEO4J_URI, NEO4J_USERNAME             override [store] uri and user

[llm]
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"
temperature = 0.0
timeout_secs = 120
retry_initial_ms = 500
retry_max_ms = 30000
retry_max_elapsed_secs = 120

[embedding]
# "noop" writes zero vectors; "http" calls {base_url}/embeddings
provider = "noop"
base_url = "https://api.openai.com/v1"
model = "text-embedding-3-small"
dimension = 1536
max_concurrent = 4

[store]
# "memory" or "neo4j" (the binary must be built with --features neo4j)
backend = "memory"
uri = "bolt://localhost:7687"
user = "neo4j"
max_connections = 16

[ingest]
# "skip-invalid-edges" merges the valid subset; "abort-on-invalid" writes nothing
strictness = "skip-invalid-edges"
# "auto" routes by MIME type then extension; "mime-only" by MIME type only
strategy = "auto"
collection = "Chunk"
concurrency = 2

[logging]
level = "info"
"#
    }
}

/// Get the XDG config directory for cgraph.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("CGRAPH_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "cgraph").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the XDG data directory for cgraph.
pub fn data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("CGRAPH_DATA_DIR") {
        return Some(PathBuf::from(dir));
    }

    ProjectDirs::from("", "", "cgraph").map(|dirs| dirs.data_dir().to_path_buf())
}

/// `.env` file in the data directory, if present.
pub fn dotenv_path() -> Option<PathBuf> {
    data_dir()
        .map(|dir| dir.join(".env"))
        .filter(|path| path.exists())
}

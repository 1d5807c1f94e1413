//! Error types for cgraph.

use thiserror::Error;

/// Main error type for cgraph operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Text extraction failed
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractError),

    /// Graph extraction failed
    #[error("graph extraction error: {0}")]
    GraphExtraction(#[from] GraphExtractionError),

    /// Graph store operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Vector index operation failed
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbedError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Document-to-text errors.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("document contains no text: {0}")]
    Empty(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("extraction failed: {0}")]
    Failed(String),
}

/// Structured graph extraction errors.
#[derive(Error, Debug)]
pub enum GraphExtractionError {
    #[error("rate limited")]
    RateLimited,

    #[error("authentication failed")]
    Authentication,

    #[error("api error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("empty response")]
    EmptyResponse,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("policy violation: {0}")]
    PolicyViolation(String),
}

impl GraphExtractionError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited | Self::Transport(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Concept graph store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("store initialization failed: {0}")]
    Init(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("query failed: {0}")]
    Query(String),

    /// A relation endpoint does not exist at call time
    #[error("concept not found: {0}")]
    ConceptNotFound(String),

    /// A sequential merge stopped part-way; earlier upserts stay committed
    #[error(
        "merge aborted after {concepts_written} concepts and {relations_written} relations: {source}"
    )]
    MergeAborted {
        concepts_written: usize,
        relations_written: usize,
        #[source]
        source: Box<StoreError>,
    },
}

/// Vector index errors.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),

    #[error("dimension mismatch: index expects {expected}, embedder produced {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("index write failed: {0}")]
    Write(String),
}

/// Embedding errors.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("invalid embedding response: {0}")]
    Response(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Result type alias for cgraph operations.
pub type Result<T> = std::result::Result<T, Error>;

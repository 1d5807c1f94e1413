//! # cgraph-embed
//!
//! Embedding generation for the vector index.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`HttpEmbedder`] | OpenAI-compatible `/embeddings` endpoint |
//! | [`NoopEmbedder`] | Zero vectors, for dry runs and tests |
//! | [`EmbedderPool`] | Bounds concurrent embedding calls across documents |

pub mod http;
pub mod noop;
pub mod pool;

pub use http::HttpEmbedder;
pub use noop::NoopEmbedder;
pub use pool::EmbedderPool;

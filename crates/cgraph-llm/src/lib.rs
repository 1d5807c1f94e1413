//! # cgraph-llm
//!
//! [`GraphExtractionService`](cgraph_core::GraphExtractionService) backed by an
//! OpenAI-compatible chat-completions endpoint.
//!
//! - [`ChatClient`]: HTTP transport with bounded exponential backoff
//! - [`prompts`]: renders an [`ExtractionPolicy`](cgraph_core::ExtractionPolicy) into messages
//! - [`LlmGraphExtractor`]: requests JSON-schema output and decodes it into an
//!   [`ExtractedGraph`](cgraph_core::ExtractedGraph)

pub mod client;
pub mod extractor;
pub mod json;
pub mod prompts;

pub use client::{ChatClient, ChatConfig, Message, RetryPolicy, Role};
pub use extractor::LlmGraphExtractor;

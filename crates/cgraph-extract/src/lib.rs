//! # cgraph-extract
//!
//! Turns documents into the linear text the graph extractor and the vector
//! index consume.
//!
//! ## Supported Formats
//!
//! | Extractor | Formats | Notes |
//! |-----------|---------|-------|
//! | [`PlainTextExtractor`] | `.txt`, `.md`, `.markdown`, `.rst`, `.adoc` | UTF-8 only |
//! | [`PdfExtractor`] | `.pdf` | Text layer only, no OCR |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cgraph_core::{DocumentHandle, ExtractionStrategy, TextExtractor};
//! use cgraph_extract::ExtractorRegistry;
//!
//! let registry = ExtractorRegistry::with_defaults(ExtractionStrategy::Auto);
//! let text = registry.extract(&DocumentHandle::path("biology.pdf")).await?;
//! println!("Extracted {} bytes", text.text.len());
//! ```

pub mod pdf;
pub mod registry;
pub mod text;

pub use pdf::PdfExtractor;
pub use registry::ExtractorRegistry;
pub use text::PlainTextExtractor;

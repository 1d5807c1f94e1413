//! Plain text and Markdown extractor.

use async_trait::async_trait;
use cgraph_core::{ExtractError, ExtractedText, FormatExtractor, TextMetadata};
use std::path::Path;
use tokio::fs;

const EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "rst", "adoc"];

/// Extractor for UTF-8 text documents.
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    /// Create a new text extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FormatExtractor for PlainTextExtractor {
    fn supported_types(&self) -> &[&str] {
        &[
            "text/plain",
            "text/markdown",
            "text/x-markdown",
            "text/x-rst",
            "text/asciidoc",
        ]
    }

    fn can_extract_by_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractError> {
        let bytes = fs::read(path).await?;
        decode(bytes)
    }

    async fn extract_bytes(
        &self,
        data: &[u8],
        _mime_type: &str,
    ) -> Result<ExtractedText, ExtractError> {
        decode(data.to_vec())
    }
}

fn decode(bytes: Vec<u8>) -> Result<ExtractedText, ExtractError> {
    let text = String::from_utf8(bytes)
        .map_err(|e| ExtractError::Parse(format!("invalid UTF-8: {e}")))?;

    let element_count = text
        .split("\n\n")
        .filter(|para| !para.trim().is_empty())
        .count();

    Ok(ExtractedText {
        text,
        metadata: TextMetadata {
            element_count,
            ..Default::default()
        },
    })
}

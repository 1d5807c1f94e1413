//! PDF text-layer extractor.
//!
//! Uses pdf-extract on a blocking thread. Scanned pages without a text layer
//! come back empty, which the registry reports as an empty document.

use async_trait::async_trait;
use cgraph_core::{ExtractError, ExtractedText, FormatExtractor, TextMetadata};
use std::path::Path;
use tracing::debug;

/// Extractor for PDF files.
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create a new PDF extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FormatExtractor for PdfExtractor {
    fn supported_types(&self) -> &[&str] {
        &["application/pdf"]
    }

    fn can_extract_by_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedText, ExtractError> {
        debug!("Extracting PDF: {:?}", path);
        let bytes = tokio::fs::read(path).await?;
        self.extract_bytes(&bytes, "application/pdf").await
    }

    async fn extract_bytes(
        &self,
        data: &[u8],
        _mime_type: &str,
    ) -> Result<ExtractedText, ExtractError> {
        let bytes = data.to_vec();
        let raw = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))?
        .map_err(|e| ExtractError::Failed(format!("PDF extraction failed: {e}")))?;

        let page_count = count_pages(&raw);
        let paragraphs = paragraphs(&raw);
        debug!(
            "PDF yielded {} pages, {} paragraphs",
            page_count,
            paragraphs.len()
        );

        Ok(ExtractedText {
            text: paragraphs.join("\n\n"),
            metadata: TextMetadata {
                mime_type: Some("application/pdf".to_string()),
                page_count: Some(page_count),
                element_count: paragraphs.len(),
            },
        })
    }
}

/// Trimmed, non-empty paragraphs. Page breaks also separate paragraphs.
fn paragraphs(raw: &str) -> Vec<String> {
    raw.split('\x0C')
        .flat_map(|page| page.split("\n\n"))
        .map(str::trim)
        .filter(|para| !para.is_empty())
        .map(str::to_string)
        .collect()
}

fn count_pages(raw: &str) -> u32 {
    let form_feeds = raw.matches('\x0C').count();
    if form_feeds > 0 {
        // pdf-extract ends the last page with a form feed too
        let trailing = usize::from(raw.trim_end_matches(['\n', ' ']).ends_with('\x0C'));
        return (form_feeds + 1 - trailing).max(1) as u32;
    }

    // ~3000 characters per page when there are no page breaks
    std::cmp::max(1, (raw.len() / 3000) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_types() {
        let extractor = PdfExtractor::new();
        assert_eq!(extractor.supported_types(), &["application/pdf"]);
    }

    #[test]
    fn test_can_extract_by_extension() {
        let extractor = PdfExtractor::new();
        assert!(extractor.can_extract_by_extension(Path::new("biology.pdf")));
        assert!(extractor.can_extract_by_extension(Path::new("PHYSICS.PDF")));
        assert!(!extractor.can_extract_by_extension(Path::new("notes.txt")));
    }

    #[test]
    fn test_paragraphs_are_trimmed_and_rejoined() {
        let raw = "  Chapter 1 \n\nCells divide.\n\n\n\n\x0CChapter 2\n\nEnergy flows.\n";
        let paras = paragraphs(raw);

        assert_eq!(
            paras,
            vec!["Chapter 1", "Cells divide.", "Chapter 2", "Energy flows."]
        );
        assert_eq!(
            paras.join("\n\n"),
            "Chapter 1\n\nCells divide.\n\nChapter 2\n\nEnergy flows."
        );
    }

    #[test]
    fn test_count_pages() {
        assert_eq!(count_pages("Page 1\x0CPage 2\x0CPage 3"), 3);
        assert_eq!(count_pages("Page 1\x0CPage 2\x0C"), 2);
        assert_eq!(count_pages("Short text"), 1);
        assert_eq!(count_pages(&"a".repeat(9000)), 3);
    }

    #[test]
    fn test_blank_text_has_no_paragraphs() {
        assert!(paragraphs("\x0C \n\n \x0C").is_empty());
    }

    #[tokio::test]
    async fn test_extract_bytes_rejects_non_pdf() {
        let extractor = PdfExtractor::new();
        let result = extractor
            .extract_bytes(b"this is not a pdf", "application/pdf")
            .await;

        assert!(matches!(result, Err(ExtractError::Failed(_))));
    }

    #[tokio::test]
    async fn test_extract_missing_file_is_io_error() {
        let extractor = PdfExtractor::new();
        let result = extractor.extract(Path::new("/nonexistent/book.pdf")).await;

        assert!(matches!(result, Err(ExtractError::Io(_))));
    }
}

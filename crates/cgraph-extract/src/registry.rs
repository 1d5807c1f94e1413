//! Extractor registry: routes documents to format extractors.

use async_trait::async_trait;
use cgraph_core::{
    DocumentHandle, ExtractError, ExtractedText, ExtractionStrategy, FormatExtractor,
    TextExtractor,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::{PdfExtractor, PlainTextExtractor};

/// Registry of format extractors, usable as the pipeline's [`TextExtractor`].
pub struct ExtractorRegistry {
    /// Named extractors
    extractors: HashMap<String, Arc<dyn FormatExtractor>>,
    /// MIME type to extractor name mapping
    mime_mapping: HashMap<String, String>,
    strategy: ExtractionStrategy,
}

impl ExtractorRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new(strategy: ExtractionStrategy) -> Self {
        Self {
            extractors: HashMap::new(),
            mime_mapping: HashMap::new(),
            strategy,
        }
    }

    /// Create a registry with the text and PDF extractors registered.
    #[must_use]
    pub fn with_defaults(strategy: ExtractionStrategy) -> Self {
        let mut registry = Self::new(strategy);
        registry.register("text", PlainTextExtractor::new());
        registry.register("pdf", PdfExtractor::new());
        registry
    }

    /// Register an extractor.
    pub fn register<E: FormatExtractor + 'static>(&mut self, name: &str, extractor: E) {
        let extractor = Arc::new(extractor);
        for mime in extractor.supported_types() {
            self.mime_mapping
                .insert((*mime).to_string(), name.to_string());
        }
        self.extractors.insert(name.to_string(), extractor);
    }

    /// The routing strategy in use.
    #[must_use]
    pub fn strategy(&self) -> ExtractionStrategy {
        self.strategy
    }

    /// Get an extractor for a MIME type.
    #[must_use]
    pub fn get_for_mime(&self, mime_type: &str) -> Option<Arc<dyn FormatExtractor>> {
        self.mime_mapping
            .get(mime_type)
            .and_then(|name| self.extractors.get(name))
            .cloned()
    }

    /// Get an extractor that can handle a file, honoring the routing strategy.
    #[must_use]
    pub fn get_for_file(&self, path: &Path, mime_type: &str) -> Option<Arc<dyn FormatExtractor>> {
        if let Some(extractor) = self.get_for_mime(mime_type) {
            return Some(extractor);
        }

        if self.strategy == ExtractionStrategy::MimeOnly {
            return None;
        }

        self.extractors
            .values()
            .find(|extractor| extractor.can_extract(path, mime_type))
            .cloned()
    }

    /// The MIME type a document is routed by: the declared one, else a guess
    /// from its name.
    #[must_use]
    pub fn resolve_mime(document: &DocumentHandle) -> String {
        if let DocumentHandle::Bytes {
            mime_type: Some(mime),
            ..
        } = document
        {
            return mime.clone();
        }

        mime_guess::from_path(document.file_name())
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults(ExtractionStrategy::default())
    }
}

#[async_trait]
impl TextExtractor for ExtractorRegistry {
    async fn extract(&self, document: &DocumentHandle) -> Result<ExtractedText, ExtractError> {
        let mime_type = Self::resolve_mime(document);
        let extractor = self
            .get_for_file(document.file_name(), &mime_type)
            .ok_or_else(|| ExtractError::UnsupportedType(mime_type.clone()))?;

        let mut extracted = match document {
            DocumentHandle::Path(path) => extractor.extract(path).await?,
            DocumentHandle::Bytes { data, .. } => {
                extractor.extract_bytes(data, &mime_type).await?
            }
        };

        if extracted.text.trim().is_empty() {
            return Err(ExtractError::Empty(document.label()));
        }

        extracted.metadata.mime_type.get_or_insert(mime_type);
        debug!(
            "Extracted {} chars from {} ({:?})",
            extracted.text.len(),
            document.label(),
            extracted.metadata.mime_type
        );

        Ok(extracted)
    }
}

//! Page-text extraction collaborator.
//!
//! The core consumes extraction through [`TextExtractor`] so that backends
//! can be substituted without touching the pipeline. [`PdfExtractor`] wraps
//! `pdf-extract`; failures (encrypted or corrupt files) surface as
//! [`Error::ExtractionFailed`] and ingestion aborts without partially
//! indexing the document.

use std::path::Path;

use crate::error::{Error, Result};

/// Capability interface: turn a stored file into an ordered sequence of
/// page texts.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<Vec<String>>;
}

/// PDF extraction via `pdf-extract`, one string per page.
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<String>> {
        pdf_extract::extract_text_by_pages(path)
            .map_err(|e| Error::ExtractionFailed(e.to_string()))
    }
}

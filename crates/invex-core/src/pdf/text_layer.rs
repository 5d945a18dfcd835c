//! Embedded text extraction using lopdf.

use tracing::{debug, trace};

use super::{is_pdf, open_document, page_limit, Result, TextLayer};
use crate::error::PdfError;
use crate::models::config::PdfConfig;

/// Reads the text layer of a PDF page by page.
#[derive(Debug, Clone)]
pub struct PdfTextLayer {
    max_pages: usize,
    decrypt_empty_password: bool,
}

impl PdfTextLayer {
    /// Create a text layer reader with default settings.
    pub fn new() -> Self {
        Self::from_config(&PdfConfig::default())
    }

    /// Create a text layer reader from configuration.
    pub fn from_config(config: &PdfConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            decrypt_empty_password: config.decrypt_empty_password,
        }
    }
}

impl Default for PdfTextLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayer for PdfTextLayer {
    fn page_texts(&self, data: &[u8]) -> Result<Vec<Result<String>>> {
        if !is_pdf(data) {
            debug!("Input is not a PDF, no text layer");
            return Ok(Vec::new());
        }

        let doc = open_document(data, self.decrypt_empty_password)?;
        let pages = doc.get_pages();
        let limit = page_limit(pages.len(), self.max_pages);
        debug!("Reading text layer of {}/{} pages", limit, pages.len());

        let texts = pages
            .keys()
            .take(limit)
            .map(|&page| {
                let text = doc
                    .extract_text(&[page])
                    .map_err(|e| PdfError::TextExtraction {
                        page,
                        reason: e.to_string(),
                    });
                if let Ok(text) = &text {
                    trace!("Page {}: {} chars", page, text.len());
                }
                text
            })
            .collect();

        Ok(texts)
    }
}

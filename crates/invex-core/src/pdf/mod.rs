//! Document collaborators: embedded text layer and page rasterization.

mod rasterizer;
mod text_layer;

pub use rasterizer::PdfImageRasterizer;
pub use text_layer::PdfTextLayer;

use image::DynamicImage;
use lopdf::Document;
use tracing::debug;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Produces the embedded text of each page of a document.
pub trait TextLayer: Send + Sync {
    /// Text of each page, in page order.
    ///
    /// The outer error means the document could not be opened at all; an
    /// inner error is a failure confined to one page. Input that is not a
    /// PDF has no text layer and yields no pages.
    fn page_texts(&self, data: &[u8]) -> Result<Vec<Result<String>>>;
}

/// Turns a document into page images for OCR.
pub trait Rasterizer: Send + Sync {
    /// Page images, in page order.
    fn rasterize(&self, data: &[u8]) -> Result<Vec<DynamicImage>>;
}

/// Whether the bytes carry a PDF header.
///
/// Readers tolerate leading garbage before the header, so the first
/// kilobyte is searched rather than only the first bytes.
pub fn is_pdf(data: &[u8]) -> bool {
    let head = &data[..data.len().min(1024)];
    head.windows(5).any(|w| w == b"%PDF-")
}

/// Parse a PDF, decrypting it with the empty password when allowed.
pub(crate) fn open_document(data: &[u8], decrypt_empty_password: bool) -> Result<Document> {
    let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

    if doc.is_encrypted() {
        if !decrypt_empty_password || doc.decrypt("").is_err() {
            return Err(PdfError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");
    }

    if doc.get_pages().is_empty() {
        return Err(PdfError::NoPages);
    }

    Ok(doc)
}

/// Number of pages to visit given a `max_pages` limit (0 = unlimited).
pub(crate) fn page_limit(page_count: usize, max_pages: usize) -> usize {
    if max_pages == 0 {
        page_count
    } else {
        page_count.min(max_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_pdf_header() {
        assert!(is_pdf(b"%PDF-1.7\n..."));
        assert!(is_pdf(b"\xef\xbb\xbf%PDF-1.4"));
        assert!(!is_pdf(b"\x89PNG\r\n\x1a\n"));
        assert!(!is_pdf(b""));
    }

    #[test]
    fn page_limit_zero_is_unlimited() {
        assert_eq!(page_limit(12, 0), 12);
        assert_eq!(page_limit(12, 5), 5);
        assert_eq!(page_limit(3, 5), 3);
    }

    #[test]
    fn truncated_pdf_does_not_open() {
        assert!(open_document(b"%PDF-1.4 truncated", true).is_err());
    }
}

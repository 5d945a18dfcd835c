//! Core library for template-driven invoice extraction.
//!
//! This crate provides:
//! - Text acquisition (embedded PDF text layer, rasterize-then-OCR fallback)
//! - A template store reading JSON rule sets from a directory
//! - Template matching with a `default` fallback
//! - Regex field extraction with per-field failure isolation

pub mod acquisition;
pub mod error;
pub mod invoice;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod templates;

pub use acquisition::{AcquiredText, TextAcquisition, TextAcquisitionBuilder};
pub use error::{InvexError, ParseError, Result};
pub use models::config::InvexConfig;
pub use models::result::{ExtractionResult, ParsedInvoice, TextSource};
pub use models::template::{FieldRule, Template, TemplateSet, DEFAULT_TEMPLATE};
pub use ocr::{ImagePreprocessor, Recognizer, TextBox};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pdf::{PdfImageRasterizer, PdfTextLayer, Rasterizer, TextLayer};
pub use pipeline::InvoicePipeline;
pub use templates::TemplateStore;

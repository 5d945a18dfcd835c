//! Error types for the invex-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the invex library.
///
/// Collaborator faults (`PdfError`, `OcrError`, `TemplateError`) are
/// recovered where they occur and never reach this level.
#[derive(Error, Debug)]
pub enum InvexError {
    /// Terminal parse failure.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from a page.
    #[error("failed to extract text from page {page}: {reason}")]
    TextExtraction { page: u32, reason: String },

    /// Failed to extract images from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// The bytes are neither a PDF nor a supported image.
    #[error("unsupported document format")]
    UnsupportedFormat,
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Image preprocessing failed.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),
}

/// Errors raised while loading a single template definition.
///
/// These never abort a load; the store logs them and either drops the
/// definition or loads it as an empty template.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The template file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The template file is not valid JSON.
    #[error("failed to load JSON from {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The template root is not a JSON object.
    #[error("template {path} must be a JSON object")]
    NotAnObject { path: PathBuf },

    /// The template directory pattern is invalid.
    #[error("invalid template location {0}")]
    Location(String),
}

/// Terminal, request-scoped failures of the extraction pipeline.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Document text was empty after both the text layer and OCR.
    #[error("could not extract any text from the document")]
    NoTextExtracted,

    /// Neither a template pattern nor a default template applied.
    #[error("no matching template found and no default template available")]
    NoTemplateMatched,
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;

//! End-to-end parse of one document.

use std::path::Path;
use std::time::Instant;

use tracing::{info, info_span, Span};

use crate::acquisition::TextAcquisition;
use crate::error::{ParseError, Result};
use crate::invoice;
use crate::models::config::InvexConfig;
use crate::models::result::ParsedInvoice;
use crate::templates::TemplateStore;

/// Acquire text, select a template and extract its fields.
///
/// Holds no per-request state: templates are reloaded on every call, so one
/// pipeline can serve concurrent requests.
pub struct InvoicePipeline {
    acquisition: TextAcquisition,
    store: TemplateStore,
    snippet_chars: usize,
}

impl InvoicePipeline {
    pub fn new(acquisition: TextAcquisition, store: TemplateStore) -> Self {
        Self {
            acquisition,
            store,
            snippet_chars: 500,
        }
    }

    pub fn from_config(config: &InvexConfig) -> Self {
        Self::new(
            TextAcquisition::from_config(config),
            TemplateStore::from_config(&config.templates),
        )
        .with_snippet_chars(config.output.snippet_chars)
    }

    /// Set how many characters of text the result previews.
    pub fn with_snippet_chars(mut self, snippet_chars: usize) -> Self {
        self.snippet_chars = snippet_chars;
        self
    }

    /// Read and parse a file, labelled with its file name.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedInvoice> {
        let data = std::fs::read(path)?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.parse_in(&data, &label, &Span::current())?)
    }

    /// Parse a document inside the current span.
    pub fn parse(&self, data: &[u8]) -> std::result::Result<ParsedInvoice, ParseError> {
        self.parse_in(data, "", &Span::current())
    }

    /// Parse a document inside a `parse_document` span labelled `label`,
    /// a child of `parent` (a root span when `parent` is disabled).
    pub fn parse_in(
        &self,
        data: &[u8],
        label: &str,
        parent: &Span,
    ) -> std::result::Result<ParsedInvoice, ParseError> {
        let span = info_span!(parent: parent, "parse_document", size = data.len(), label = %label);
        let _guard = span.enter();
        let start = Instant::now();

        let acquired = self.acquisition.acquire(data);
        if acquired.is_blank() {
            return Err(ParseError::NoTextExtracted);
        }

        let templates = self.store.load();
        let template =
            invoice::select(&acquired.text, &templates).ok_or(ParseError::NoTemplateMatched)?;

        let extracted = invoice::extract(&acquired.text, template);
        info!(
            "Extracted {}/{} fields in {}ms",
            extracted.found(),
            extracted.len(),
            start.elapsed().as_millis()
        );

        Ok(ParsedInvoice {
            template: template.name.clone(),
            source: acquired.source,
            extracted,
            raw_text_snippet: acquired.text.chars().take(self.snippet_chars).collect(),
        })
    }
}

//! Pattern-driven field extraction.

use thiserror::Error;
use tracing::{debug, error};

use crate::models::result::ExtractionResult;
use crate::models::template::{FieldRule, Template};

use super::pattern::compile;

/// Why a single field could not be evaluated.
#[derive(Error, Debug)]
enum FieldError {
    #[error("pattern is not a string")]
    NotAString,

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Extract every field declared by `template` from `text`.
///
/// The result holds exactly one entry per declared field, in declaration
/// order. Each field's value is the first capturing group of the first
/// case-insensitive match, trimmed. A field whose pattern does not match,
/// has no capturing group, or fails to compile is absent; failures are
/// logged and never affect other fields.
pub fn extract(text: &str, template: &Template) -> ExtractionResult {
    let mut result = ExtractionResult::new();

    for field in &template.fields {
        let value = match extract_field(text, field) {
            Ok(value) => value,
            Err(e) => {
                error!("Error extracting '{}': {}", field.name, e);
                None
            }
        };
        result.insert(field.name.clone(), value);
    }

    debug!(
        "Template '{}' extracted {}/{} fields",
        template.name,
        result.found(),
        result.len()
    );
    result
}

fn extract_field(text: &str, field: &FieldRule) -> Result<Option<String>, FieldError> {
    let pattern = field.pattern.as_deref().ok_or(FieldError::NotAString)?;
    let re = compile(pattern)?;

    Ok(re
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|group| group.as_str().trim().to_string()))
}

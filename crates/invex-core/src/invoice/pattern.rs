//! Pattern compilation shared by template matching and field extraction.

use regex::{Regex, RegexBuilder};

use crate::models::template::Template;

/// Compile a template pattern. All template patterns are case-insensitive.
pub fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// A problem found in a template's patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternIssue {
    /// `match` or the field name.
    pub target: String,
    /// Human-readable reason.
    pub reason: String,
}

impl std::fmt::Display for PatternIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.target, self.reason)
    }
}

/// Check every pattern of a template without running it.
///
/// Reports patterns that fail to compile, non-string field definitions, and
/// field patterns without a capturing group (those always extract nothing).
pub fn check_template(template: &Template) -> Vec<PatternIssue> {
    let mut issues = Vec::new();

    if let Some(pattern) = &template.match_pattern {
        if let Err(e) = compile(pattern) {
            issues.push(PatternIssue {
                target: "match".to_string(),
                reason: e.to_string(),
            });
        }
    }

    for field in &template.fields {
        let reason = match &field.pattern {
            None => Some("pattern is not a string".to_string()),
            Some(pattern) => match compile(pattern) {
                Err(e) => Some(e.to_string()),
                Ok(re) if re.captures_len() < 2 => Some("pattern has no capturing group".to_string()),
                Ok(_) => None,
            },
        };
        if let Some(reason) = reason {
            issues.push(PatternIssue {
                target: field.name.clone(),
                reason,
            });
        }
    }

    issues
}

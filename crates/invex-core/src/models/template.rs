//! Template data model.
//!
//! A template is normalized once, at load time, into a [`Template`] with an
//! explicit ordered field list, whatever shape its definition file used.

use serde::Serialize;

/// Name of the fallback template used when no `match` pattern succeeds.
pub const DEFAULT_TEMPLATE: &str = "default";

/// A named extraction rule set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Template {
    /// Unique identifier, derived from the definition's file stem.
    pub name: String,

    /// Pattern tested against document text. `None` for fallback-only templates.
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_pattern: Option<String>,

    /// Declared fields, in definition order.
    pub fields: Vec<FieldRule>,
}

/// One declared field of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRule {
    /// Field name, unique within its template.
    pub name: String,

    /// Extraction pattern. `None` when the definition held a non-string value;
    /// such a field is still reported, always as absent.
    pub pattern: Option<String>,
}

impl FieldRule {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: Some(pattern.into()),
        }
    }
}

impl Template {
    /// Create an empty template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            match_pattern: None,
            fields: Vec::new(),
        }
    }

    /// Set the match pattern.
    pub fn with_match(mut self, pattern: impl Into<String>) -> Self {
        self.match_pattern = Some(pattern.into());
        self
    }

    /// Append a field rule.
    pub fn with_field(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.fields.push(FieldRule::new(name, pattern));
        self
    }

    /// Whether this is the distinguished fallback template.
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_TEMPLATE
    }
}

/// The full collection of templates, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSet {
    templates: Vec<Template>,
}

impl TemplateSet {
    /// Build a set, sorting by name and keeping the last definition of a duplicated name.
    pub fn new(templates: impl IntoIterator<Item = Template>) -> Self {
        let mut templates: Vec<Template> = templates.into_iter().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        templates.dedup_by(|later, earlier| {
            if later.name == earlier.name {
                std::mem::swap(later, earlier);
                true
            } else {
                false
            }
        });
        Self { templates }
    }

    /// Templates in matching order.
    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    /// Look up a template by name.
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// The fallback template, if loaded.
    pub fn default_template(&self) -> Option<&Template> {
        self.get(DEFAULT_TEMPLATE)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

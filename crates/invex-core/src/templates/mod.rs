//! Template store: loads extraction templates from a directory of JSON files.
//!
//! Templates are read fresh on every [`TemplateStore::load`] call; nothing is
//! cached. A broken definition never prevents the others from loading.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::error::TemplateError;
use crate::models::config::TemplateConfig;
use crate::models::template::{FieldRule, Template, TemplateSet};

const MATCH_KEY: &str = "match";
const FIELDS_KEY: &str = "fields";

/// Loads templates from a configured directory.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
    extension: String,
}

impl TemplateStore {
    /// Create a store reading `*.json` files from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            extension: "json".to_string(),
        }
    }

    /// Create a store from configuration.
    pub fn from_config(config: &TemplateConfig) -> Self {
        Self::new(config.dir.clone()).with_extension(config.extension.clone())
    }

    /// Set the definition file extension.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Directory this store reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load every template definition.
    ///
    /// Never fails. A definition that cannot be read, or whose root is not
    /// an object, loads as an empty template; one that is not valid JSON is
    /// skipped. Both are logged. An unreadable directory yields an empty set.
    pub fn load(&self) -> TemplateSet {
        let paths = match self.definition_paths() {
            Ok(paths) => paths,
            Err(e) => {
                error!("{}", e);
                return TemplateSet::default();
            }
        };

        let templates = paths.into_iter().filter_map(|path| match load_file(&path) {
            Ok(template) => Some(template),
            Err(e @ TemplateError::Json { .. }) => {
                error!("{}", e);
                None
            }
            Err(e) => {
                error!("{}, loading as empty template", e);
                Some(Template::new(template_name(&path)))
            }
        });

        let set = TemplateSet::new(templates);
        debug!("Loaded {} templates from {}", set.len(), self.dir.display());
        set
    }

    fn definition_paths(&self) -> Result<Vec<PathBuf>, TemplateError> {
        let dir = self
            .dir
            .to_str()
            .ok_or_else(|| TemplateError::Location(self.dir.display().to_string()))?;
        let pattern = format!(
            "{}/*.{}",
            glob::Pattern::escape(dir),
            glob::Pattern::escape(&self.extension)
        );

        let entries = glob::glob(&pattern).map_err(|e| TemplateError::Location(e.to_string()))?;

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable template entry: {}", e),
            }
        }
        Ok(paths)
    }
}

fn template_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn load_file(path: &Path) -> Result<Template, TemplateError> {
    let name = template_name(path);

    let content = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let content = content.trim();
    if content.is_empty() {
        warn!(
            "Template file is empty: {}, loading as empty template.",
            path.display()
        );
        return Ok(Template::new(name));
    }

    let value: Value = serde_json::from_str(content).map_err(|source| TemplateError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Object(definition) => Ok(parse_definition(name, &definition)),
        _ => Err(TemplateError::NotAnObject {
            path: path.to_path_buf(),
        }),
    }
}

/// Normalize a template definition into a [`Template`].
///
/// A nested `fields` object takes absolute precedence; otherwise every
/// top-level key except `match` is a field.
pub fn parse_definition(name: impl Into<String>, definition: &Map<String, Value>) -> Template {
    let name = name.into();

    let match_pattern = match definition.get(MATCH_KEY) {
        Some(Value::String(pattern)) if !pattern.is_empty() => Some(pattern.clone()),
        Some(Value::String(_)) | Some(Value::Null) | None => None,
        Some(other) => {
            warn!(
                "Template '{}' has a non-string match pattern ({}), ignoring it",
                name, other
            );
            None
        }
    };

    let fields = match definition.get(FIELDS_KEY) {
        Some(Value::Object(fields)) => field_rules(&name, fields.iter()),
        Some(other) => {
            warn!(
                "Template '{}' has a non-object 'fields' entry ({}), extracting zero fields",
                name, other
            );
            Vec::new()
        }
        None => field_rules(&name, definition.iter().filter(|(key, _)| *key != MATCH_KEY)),
    };

    Template {
        name,
        match_pattern,
        fields,
    }
}

fn field_rules<'a>(
    template: &str,
    entries: impl Iterator<Item = (&'a String, &'a Value)>,
) -> Vec<FieldRule> {
    entries
        .map(|(field, pattern)| match pattern {
            Value::String(pattern) => FieldRule::new(field.clone(), pattern.clone()),
            other => {
                warn!(
                    "Template '{}' field '{}' has a non-string pattern ({})",
                    template, field, other
                );
                FieldRule {
                    name: field.clone(),
                    pattern: None,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn definition(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn parse(name: &str, value: Value) -> Template {
        parse_definition(name, &definition(value))
    }

    fn write(dir: &Path, file: &str, content: &str) {
        std::fs::write(dir.join(file), content).unwrap();
    }

    #[test]
    fn nested_fields_take_precedence_over_top_level_keys() {
        let template = parse(
            "acme",
            json!({
                "match": "ACME Corp",
                "fields": { "invoice_number": "Invoice #\\s*(\\S+)" },
                "total": "Total:\\s*(\\S+)"
            }),
        );

        assert_eq!(template.match_pattern.as_deref(), Some("ACME Corp"));
        assert_eq!(
            template.fields,
            vec![FieldRule::new("invoice_number", "Invoice #\\s*(\\S+)")]
        );
    }

    #[test]
    fn flat_definition_becomes_field_map_without_match_key() {
        let template = parse(
            "default",
            json!({
                "match": "anything",
                "invoice_number": "Invoice Number:\\s*(\\S+)",
                "date": "Date:\\s*([\\d-]+)"
            }),
        );

        let names: Vec<&str> = template.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["invoice_number", "date"]);
        assert_eq!(template.match_pattern.as_deref(), Some("anything"));
    }

    #[test]
    fn non_object_fields_entry_yields_zero_fields() {
        let template = parse("odd", json!({ "fields": null, "x": "(y)" }));
        assert!(template.fields.is_empty());
    }

    #[test]
    fn non_string_patterns_are_kept_as_unusable_fields() {
        let template = parse(
            "odd",
            json!({ "fields": { "count": 3, "name": "Name:\\s*(.+)" } }),
        );
        assert_eq!(
            template.fields,
            vec![
                FieldRule {
                    name: "count".to_string(),
                    pattern: None
                },
                FieldRule::new("name", "Name:\\s*(.+)"),
            ]
        );
    }

    #[test]
    fn empty_match_is_treated_as_absent() {
        let template = parse("x", json!({ "match": "" }));
        assert_eq!(template.match_pattern, None);
    }

    #[test]
    fn load_skips_invalid_json_and_keeps_others() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "default.json", r#"{"amount": "Amount:\\s*(\\S+)"}"#);
        write(dir.path(), "broken.json", "{ not json");
        write(dir.path(), "array.json", "[1, 2, 3]");
        write(dir.path(), "empty.json", "   \n");
        write(dir.path(), "notes.txt", "ignored");

        let set = TemplateStore::new(dir.path()).load();
        let names: Vec<&str> = set.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["array", "default", "empty"]);

        for name in ["array", "empty"] {
            let template = set.get(name).unwrap();
            assert!(template.fields.is_empty());
            assert!(template.match_pattern.is_none());
        }
        assert_eq!(set.get("default").unwrap().fields.len(), 1);
    }

    #[test]
    fn non_utf8_definition_loads_as_empty_template() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("latin1.json"), b"{\"match\": \"Caf\xe9\"}").unwrap();

        let set = TemplateStore::new(dir.path()).load();
        assert_eq!(set.get("latin1"), Some(&Template::new("latin1")));
    }

    #[test]
    fn missing_directory_yields_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let set = TemplateStore::new(dir.path().join("does-not-exist")).load();
        assert!(set.is_empty());
    }

    #[test]
    fn custom_extension() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "acme.tmpl", r#"{"match": "ACME"}"#);
        write(dir.path(), "other.json", r#"{"match": "OTHER"}"#);

        let set = TemplateStore::new(dir.path()).with_extension("tmpl").load();
        assert_eq!(set.len(), 1);
        assert!(set.get("acme").is_some());
    }

    #[test]
    fn extension_is_matched_literally() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "acme.js?n", r#"{"match": "ACME"}"#);
        write(dir.path(), "other.json", r#"{"match": "OTHER"}"#);

        let set = TemplateStore::new(dir.path()).with_extension("js?n").load();
        let names: Vec<&str> = set.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["acme"]);
    }
}

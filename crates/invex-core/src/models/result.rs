//! Extraction output types.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Field name to extracted value, in the template's field order.
///
/// Serializes as a JSON object whose absent values are `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    values: Vec<(String, Option<String>)>,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field value. A repeated name overwrites the earlier value in place.
    pub fn insert(&mut self, field: impl Into<String>, value: Option<String>) {
        let field = field.into();
        match self.values.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.values.push((field, value)),
        }
    }

    /// Value of a field. `None` when the field is absent or not declared.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Whether the field was declared, regardless of whether it matched.
    pub fn contains(&self, field: &str) -> bool {
        self.values.iter().any(|(name, _)| name == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    /// Number of fields that produced a value.
    pub fn found(&self) -> usize {
        self.values.iter().filter(|(_, v)| v.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for ExtractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Which acquisition path produced the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    /// Embedded text layer.
    TextLayer,
    /// Rasterize-then-OCR fallback.
    Ocr,
}

/// Successful outcome of parsing one document.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ParsedInvoice {
    /// Name of the applied template.
    pub template: String,
    /// Path that produced the text.
    pub source: TextSource,
    /// Extracted fields.
    pub extracted: ExtractionResult,
    /// Leading characters of the document text.
    pub raw_text_snippet: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_in_insertion_order_with_nulls() {
        let mut result = ExtractionResult::new();
        result.insert("zip", Some("12345".to_string()));
        result.insert("amount", None);
        result.insert("address", Some("Main St".to_string()));

        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"zip":"12345","amount":null,"address":"Main St"}"#);
    }

    #[test]
    fn insert_overwrites_in_place() {
        let mut result = ExtractionResult::new();
        result.insert("a", None);
        result.insert("b", None);
        result.insert("a", Some("x".to_string()));

        let names: Vec<&str> = result.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(result.get("a"), Some("x"));
        assert_eq!(result.found(), 1);
    }
}

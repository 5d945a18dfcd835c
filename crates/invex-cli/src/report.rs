//! Rendering of parse results for the CLI and the HTTP service.

use serde::Serialize;

use invex_core::ParsedInvoice;

/// One parsed document, labelled with its file name.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub filename: &'a str,
    #[serde(flatten)]
    pub invoice: &'a ParsedInvoice,
}

impl<'a> Report<'a> {
    pub fn new(filename: &'a str, invoice: &'a ParsedInvoice) -> Self {
        Self { filename, invoice }
    }

    pub fn to_json(&self, pretty: bool) -> anyhow::Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }

    /// Header row of field names and one row of values; absent values are empty.
    pub fn to_csv(&self) -> anyhow::Result<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);

        let mut header = vec!["filename", "template"];
        header.extend(self.invoice.extracted.iter().map(|(name, _)| name));
        wtr.write_record(&header)?;

        let mut row = vec![self.filename, self.invoice.template.as_str()];
        row.extend(
            self.invoice
                .extracted
                .iter()
                .map(|(_, value)| value.unwrap_or("")),
        );
        wtr.write_record(&row)?;

        Ok(String::from_utf8(wtr.into_inner()?)?)
    }

    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("File: {}\n", self.filename));
        output.push_str(&format!("Template: {}\n", self.invoice.template));
        output.push_str(&format!("Source: {}\n", source_label(self.invoice)));
        output.push('\n');

        let width = self
            .invoice
            .extracted
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0);
        for (name, value) in self.invoice.extracted.iter() {
            output.push_str(&format!(
                "  {:width$}  {}\n",
                name,
                value.unwrap_or("-"),
                width = width
            ));
        }

        output
    }
}

fn source_label(invoice: &ParsedInvoice) -> &'static str {
    match invoice.source {
        invex_core::TextSource::TextLayer => "text layer",
        invex_core::TextSource::Ocr => "OCR",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invex_core::{ExtractionResult, TextSource};
    use pretty_assertions::assert_eq;

    fn invoice() -> ParsedInvoice {
        let mut extracted = ExtractionResult::new();
        extracted.insert("invoice_number", Some("INV-1001".to_string()));
        extracted.insert("amount", None);
        ParsedInvoice {
            template: "default".to_string(),
            source: TextSource::TextLayer,
            extracted,
            raw_text_snippet: "Invoice Number: INV-1001".to_string(),
        }
    }

    #[test]
    fn json_flattens_the_invoice() {
        let invoice = invoice();
        let json: serde_json::Value =
            serde_json::from_str(&Report::new("a.pdf", &invoice).to_json(false).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "filename": "a.pdf",
                "template": "default",
                "source": "text_layer",
                "extracted": { "invoice_number": "INV-1001", "amount": null },
                "raw_text_snippet": "Invoice Number: INV-1001"
            })
        );
    }

    #[test]
    fn csv_has_one_column_per_field() {
        let invoice = invoice();
        assert_eq!(
            Report::new("a.pdf", &invoice).to_csv().unwrap(),
            "filename,template,invoice_number,amount\na.pdf,default,INV-1001,\n"
        );
    }

    #[test]
    fn text_marks_absent_fields() {
        let invoice = invoice();
        let text = Report::new("a.pdf", &invoice).to_text();
        assert!(text.contains("invoice_number  INV-1001"));
        assert!(text.contains("amount          -"));
    }
}

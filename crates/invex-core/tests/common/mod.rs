//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{DynamicImage, GrayImage};
use invex_core::error::{OcrError, PdfError};
use invex_core::{Rasterizer, Recognizer, TextLayer};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

pub const SAMPLE_LINES: [&str; 5] = [
    "Invoice Number: INV-1001",
    "Date: 2025-09-19",
    "Bill To: John Doe",
    "Item: Medical Supplies",
    "Amount: $150.00",
];

pub const DEFAULT_TEMPLATE: &str = r#"{
    "invoice_number": "Invoice Number:\\s*(\\S+)",
    "date": "Date:\\s*([\\d-]+)",
    "bill_to": "Bill To:\\s*(.+)",
    "item": "Item:\\s*(.+)",
    "amount": "Amount:\\s*\\$?([\\d.,]+)"
}"#;

pub fn sample_text() -> String {
    SAMPLE_LINES.join("\n")
}

/// One-page PDF with the sample lines as a Helvetica text layer.
pub fn sample_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = Vec::new();
    for (i, line) in SAMPLE_LINES.iter().enumerate() {
        let y = 750 - 20 * i as i64;
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
        operations.push(Operation::new("Td", vec![72.into(), y.into()]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("ET", vec![]));
    }
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn write_template(dir: &Path, name: &str, definition: &str) {
    std::fs::write(dir.join(format!("{name}.json")), definition).unwrap();
}

/// Text layer returning fixed pages and counting calls.
#[derive(Clone, Default)]
pub struct StubTextLayer {
    pub pages: Vec<String>,
    pub calls: Arc<AtomicUsize>,
}

impl StubTextLayer {
    pub fn new(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            calls: Arc::default(),
        }
    }
}

impl TextLayer for StubTextLayer {
    fn page_texts(&self, _data: &[u8]) -> Result<Vec<Result<String, PdfError>>, PdfError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pages.iter().cloned().map(Ok).collect())
    }
}

/// Rasterizer producing blank page images and counting calls.
#[derive(Clone, Default)]
pub struct StubRasterizer {
    pub pages: usize,
    pub calls: Arc<AtomicUsize>,
}

impl StubRasterizer {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            calls: Arc::default(),
        }
    }
}

impl Rasterizer for StubRasterizer {
    fn rasterize(&self, _data: &[u8]) -> Result<Vec<DynamicImage>, PdfError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((0..self.pages)
            .map(|_| DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, image::Luma([255]))))
            .collect())
    }
}

/// Recognizer returning one scripted text per call, then empty text.
#[derive(Clone, Default)]
pub struct StubRecognizer {
    pub outputs: Vec<String>,
    pub calls: Arc<AtomicUsize>,
}

impl StubRecognizer {
    pub fn new(outputs: &[&str]) -> Self {
        Self {
            outputs: outputs.iter().map(|o| o.to_string()).collect(),
            calls: Arc::default(),
        }
    }
}

impl Recognizer for StubRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outputs.get(call).cloned().unwrap_or_default())
    }
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

//! OCR collaborators: image preprocessing and text recognition.

mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;

pub use preprocessing::ImagePreprocessor;
#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// Recognizes the text in one page image.
pub trait Recognizer: Send + Sync {
    /// Recognized text, lines separated by newlines.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// A recognized text region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Quadrilateral corners (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
    /// Axis-aligned bounding rectangle as (min_x, min_y, max_x, max_y).
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Height in pixels of the bands that group boxes into rows.
const ROW_BAND: f32 = 20.0;

/// Sort boxes top-to-bottom by row band, then left-to-right.
pub fn sort_reading_order(boxes: &mut [TextBox]) {
    boxes.sort_by(|a, b| {
        let (ax, ay, _, _) = a.rect();
        let (bx, by, _, _) = b.rect();

        let row_a = (ay / ROW_BAND) as i32;
        let row_b = (by / ROW_BAND) as i32;

        row_a
            .cmp(&row_b)
            .then(ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal))
    });
}

/// Join boxes sorted by [`sort_reading_order`] into text: boxes sharing a
/// row band are separated by a space, rows by a newline.
pub fn join_lines(boxes: &[TextBox]) -> String {
    let mut text = String::new();
    let mut current_row = None;

    for text_box in boxes {
        let (_, y, _, _) = text_box.rect();
        let row = (y / ROW_BAND) as i32;
        match current_row {
            Some(r) if r == row => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        current_row = Some(row);
        text.push_str(text_box.text.trim());
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_box(x: f32, y: f32, text: &str) -> TextBox {
        TextBox {
            bbox: [x, y, x + 50.0, y, x + 50.0, y + 10.0, x, y + 10.0],
            text: text.to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn reading_order_groups_rows_then_columns() {
        let mut boxes = vec![
            text_box(10.0, 45.0, "Date: 2025-09-19"),
            text_box(120.0, 3.0, "INV-1001"),
            text_box(10.0, 5.0, "Invoice Number:"),
        ];
        sort_reading_order(&mut boxes);
        assert_eq!(
            join_lines(&boxes),
            "Invoice Number: INV-1001\nDate: 2025-09-19"
        );
    }
}

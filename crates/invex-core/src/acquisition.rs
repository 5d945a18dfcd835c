//! Text acquisition: embedded text layer first, rasterize-then-OCR fallback.
//!
//! Each path runs at most once per document. Faults inside a path are
//! logged and contribute no text; they never reach the caller. Whether the
//! final text is usable is the caller's decision.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::models::config::InvexConfig;
use crate::models::result::TextSource;
use crate::ocr::{ImagePreprocessor, Recognizer};
use crate::pdf::{PdfImageRasterizer, PdfTextLayer, Rasterizer, TextLayer};

/// Text produced for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredText {
    /// Document text; may be blank when both paths came up empty.
    pub text: String,
    /// Path that produced the text.
    pub source: TextSource,
}

impl AcquiredText {
    /// Whether the text is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Text-layer-first acquisition policy over swappable collaborators.
pub struct TextAcquisition {
    text_layer: Box<dyn TextLayer>,
    rasterizer: Box<dyn Rasterizer>,
    recognizer: Option<Box<dyn Recognizer>>,
    preprocessor: ImagePreprocessor,
}

/// Builder for [`TextAcquisition`].
pub struct TextAcquisitionBuilder {
    text_layer: Box<dyn TextLayer>,
    rasterizer: Box<dyn Rasterizer>,
    recognizer: Option<Box<dyn Recognizer>>,
    preprocessor: ImagePreprocessor,
}

impl TextAcquisitionBuilder {
    /// Builder with the lopdf collaborators and no recognizer.
    pub fn new() -> Self {
        Self {
            text_layer: Box::new(PdfTextLayer::new()),
            rasterizer: Box::new(PdfImageRasterizer::new()),
            recognizer: None,
            preprocessor: ImagePreprocessor::new(),
        }
    }

    /// Set the text layer reader.
    pub fn with_text_layer(mut self, text_layer: impl TextLayer + 'static) -> Self {
        self.text_layer = Box::new(text_layer);
        self
    }

    /// Set the page rasterizer.
    pub fn with_rasterizer(mut self, rasterizer: impl Rasterizer + 'static) -> Self {
        self.rasterizer = Box::new(rasterizer);
        self
    }

    /// Set the OCR recognizer.
    pub fn with_recognizer(mut self, recognizer: impl Recognizer + 'static) -> Self {
        self.recognizer = Some(Box::new(recognizer));
        self
    }

    /// Set a boxed OCR recognizer, or none to disable the OCR path.
    pub fn with_boxed_recognizer(mut self, recognizer: Option<Box<dyn Recognizer>>) -> Self {
        self.recognizer = recognizer;
        self
    }

    /// Set the image preprocessor.
    pub fn with_preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn build(self) -> TextAcquisition {
        TextAcquisition {
            text_layer: self.text_layer,
            rasterizer: self.rasterizer,
            recognizer: self.recognizer,
            preprocessor: self.preprocessor,
        }
    }
}

impl Default for TextAcquisitionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TextAcquisition {
    /// Create a new builder.
    pub fn builder() -> TextAcquisitionBuilder {
        TextAcquisitionBuilder::new()
    }

    /// Build the lopdf collaborators and, when enabled and its models are
    /// present, the pure-onnx-ocr recognizer.
    pub fn from_config(config: &InvexConfig) -> Self {
        Self::builder()
            .with_text_layer(PdfTextLayer::from_config(&config.pdf))
            .with_rasterizer(PdfImageRasterizer::from_config(&config.pdf))
            .with_preprocessor(ImagePreprocessor::from_config(&config.preprocess))
            .with_boxed_recognizer(recognizer_from_config(config))
            .build()
    }

    /// Whether the OCR fallback can run.
    pub fn has_recognizer(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Acquire the text of a document.
    pub fn acquire(&self, data: &[u8]) -> AcquiredText {
        let text = self.read_text_layer(data);
        if !text.trim().is_empty() {
            return AcquiredText {
                text,
                source: TextSource::TextLayer,
            };
        }

        info!("No text layer found, falling back to OCR");
        AcquiredText {
            text: self.run_ocr(data),
            source: TextSource::Ocr,
        }
    }

    fn read_text_layer(&self, data: &[u8]) -> String {
        let pages = match self.text_layer.page_texts(data) {
            Ok(pages) => pages,
            Err(e) => {
                debug!("Text layer unavailable: {}", e);
                return String::new();
            }
        };

        let mut parts = Vec::with_capacity(pages.len());
        for (index, page) in pages.into_iter().enumerate() {
            match page {
                Ok(text) if !text.is_empty() => parts.push(text),
                Ok(_) => {}
                Err(e) => debug!("Skipping page {}: {}", index + 1, e),
            }
        }
        parts.join("\n")
    }

    fn run_ocr(&self, data: &[u8]) -> String {
        let Some(recognizer) = self.recognizer.as_deref() else {
            warn!("OCR fallback needed but no recognizer is configured");
            return String::new();
        };

        let start = Instant::now();
        let images = match self.rasterizer.rasterize(data) {
            Ok(images) => images,
            Err(e) => {
                warn!("Could not convert document to images: {}", e);
                return String::new();
            }
        };
        debug!("Running OCR on {} page images", images.len());

        let mut parts = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            let text = self
                .preprocessor
                .apply(image)
                .and_then(|prepared| recognizer.recognize(&prepared));
            match text {
                Ok(text) if !text.is_empty() => parts.push(text),
                Ok(_) => debug!("Page {}: no text recognized", index + 1),
                Err(e) => warn!("OCR failed on page {}: {}", index + 1, e),
            }
        }

        debug!("OCR finished in {}ms", start.elapsed().as_millis());
        parts.join("\n")
    }
}

#[cfg(feature = "native")]
fn recognizer_from_config(config: &InvexConfig) -> Option<Box<dyn Recognizer>> {
    if !config.ocr.enabled {
        debug!("OCR fallback disabled by configuration");
        return None;
    }
    if !config.ocr.models_present() {
        warn!(
            "OCR models not found in {}, OCR fallback unavailable",
            config.ocr.model_dir.display()
        );
        return None;
    }

    match crate::ocr::PureOcrEngine::from_config(&config.ocr) {
        Ok(engine) => Some(Box::new(engine)),
        Err(e) => {
            warn!("OCR fallback unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "native"))]
fn recognizer_from_config(_config: &InvexConfig) -> Option<Box<dyn Recognizer>> {
    debug!("Built without a native OCR engine");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OcrError, PdfError};
    use image::{DynamicImage, GrayImage};

    struct Pages(Vec<Option<&'static str>>);

    impl TextLayer for Pages {
        fn page_texts(&self, _data: &[u8]) -> crate::pdf::Result<Vec<crate::pdf::Result<String>>> {
            Ok(self
                .0
                .iter()
                .enumerate()
                .map(|(i, page)| match page {
                    Some(text) => Ok(text.to_string()),
                    None => Err(PdfError::TextExtraction {
                        page: i as u32 + 1,
                        reason: "bad content stream".to_string(),
                    }),
                })
                .collect())
        }
    }

    struct Blank(usize);

    impl Rasterizer for Blank {
        fn rasterize(&self, _data: &[u8]) -> crate::pdf::Result<Vec<DynamicImage>> {
            Ok((0..self.0)
                .map(|_| DynamicImage::ImageLuma8(GrayImage::new(4, 4)))
                .collect())
        }
    }

    /// Fails on the first image, then echoes a fixed line.
    struct FlakyOcr(std::sync::atomic::AtomicUsize);

    impl Recognizer for FlakyOcr {
        fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
            let call = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if call == 0 {
                Err(OcrError::Recognition("model crashed".to_string()))
            } else {
                Ok(format!("page {}", call + 1))
            }
        }
    }

    #[test]
    fn text_layer_skips_failed_and_empty_pages() {
        let acquisition = TextAcquisition::builder()
            .with_text_layer(Pages(vec![Some("first"), None, Some(""), Some("fourth")]))
            .build();

        let acquired = acquisition.acquire(b"%PDF-");
        assert_eq!(acquired.text, "first\nfourth");
        assert_eq!(acquired.source, TextSource::TextLayer);
    }

    #[test]
    fn ocr_pages_survive_a_failing_page() {
        let acquisition = TextAcquisition::builder()
            .with_text_layer(Pages(vec![Some("  \n ")]))
            .with_rasterizer(Blank(3))
            .with_recognizer(FlakyOcr(Default::default()))
            .build();

        let acquired = acquisition.acquire(b"%PDF-");
        assert_eq!(acquired.text, "page 2\npage 3");
        assert_eq!(acquired.source, TextSource::Ocr);
    }

    #[test]
    fn without_recognizer_ocr_yields_blank_text() {
        let acquisition = TextAcquisition::builder()
            .with_text_layer(Pages(vec![]))
            .with_rasterizer(Blank(1))
            .build();

        let acquired = acquisition.acquire(b"%PDF-");
        assert!(acquired.is_blank());
        assert_eq!(acquired.source, TextSource::Ocr);
        assert!(!acquisition.has_recognizer());
    }
}

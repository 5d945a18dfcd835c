//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{InvexError, Result};

/// Main configuration for the invex pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvexConfig {
    /// Template store configuration.
    pub templates: TemplateConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Image preprocessing applied before OCR.
    pub preprocess: PreprocessConfig,

    /// Output shaping.
    pub output: OutputConfig,

    /// HTTP server configuration.
    pub server: ServerConfig,
}

/// Where templates live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Directory holding one definition file per template.
    pub dir: PathBuf,

    /// File extension of template definitions.
    pub extension: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("templates"),
            extension: "json".to_string(),
        }
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Maximum pages to read or rasterize (0 = unlimited).
    pub max_pages: usize,

    /// Try to open encrypted PDFs with an empty user password.
    pub decrypt_empty_password: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            max_pages: 0,
            decrypt_empty_password: true,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Enable the OCR fallback.
    pub enabled: bool,

    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` tokens in recognized text instead of replacing them with spaces.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// Full paths of the detection model, recognition model and dictionary.
    pub fn model_paths(&self) -> (PathBuf, PathBuf, PathBuf) {
        (
            self.model_dir.join(&self.detection_model),
            self.model_dir.join(&self.recognition_model),
            self.model_dir.join(&self.dictionary),
        )
    }

    /// Whether every model file is present on disk.
    pub fn models_present(&self) -> bool {
        let (det, rec, dict) = self.model_paths();
        det.exists() && rec.exists() && dict.exists()
    }
}

/// Pixel filters applied to each page image before recognition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Binarization cutoff; pixels below become black.
    pub threshold: u8,

    /// Invert the grayscale image before thresholding.
    pub invert: bool,

    /// Apply a 3x3 sharpen kernel after thresholding.
    pub sharpen: bool,

    /// Downscale images whose longest side exceeds this (0 = never).
    pub max_image_size: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            threshold: 150,
            invert: true,
            sharpen: true,
            max_image_size: 4096,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Number of characters of document text returned as a preview.
    pub snippet_chars: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { snippet_chars: 500 }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind.
    pub bind: String,

    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| InvexError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| InvexError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

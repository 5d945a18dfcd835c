//! Image preprocessing for OCR.

use image::{DynamicImage, GrayImage};
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::PreprocessConfig;

/// Sharpen kernel: center weight 32 against -2 neighbours, normalized by the sum (16).
const SHARPEN_CENTER: i32 = 32;
const SHARPEN_NEIGHBOUR: i32 = -2;
const SHARPEN_SCALE: i32 = 16;

/// Fixed filter pipeline applied to each page image before recognition:
/// grayscale, optional inversion, binarization, optional sharpening.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    /// Binarization cutoff; pixels below become black.
    threshold: u8,
    /// Invert before thresholding.
    invert: bool,
    /// Sharpen after thresholding.
    sharpen: bool,
    /// Longest side allowed before downscaling (0 = never downscale).
    max_size: u32,
}

impl ImagePreprocessor {
    /// Create a preprocessor with default settings.
    pub fn new() -> Self {
        Self::from_config(&PreprocessConfig::default())
    }

    /// Create a preprocessor from configuration.
    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self {
            threshold: config.threshold,
            invert: config.invert,
            sharpen: config.sharpen,
            max_size: config.max_image_size,
        }
    }

    /// Set the binarization threshold.
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Enable or disable inversion.
    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Enable or disable sharpening.
    pub fn with_sharpen(mut self, sharpen: bool) -> Self {
        self.sharpen = sharpen;
        self
    }

    /// Run the filter pipeline.
    pub fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, OcrError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OcrError::Preprocessing("image has no pixels".to_string()));
        }

        let (width, height) = self.resize_dimensions(image.width(), image.height());
        let mut gray = if (width, height) == (image.width(), image.height()) {
            image.to_luma8()
        } else {
            debug!(
                "Downscaling {}x{} to {}x{}",
                image.width(),
                image.height(),
                width,
                height
            );
            image
                .resize_exact(width, height, image::imageops::FilterType::Lanczos3)
                .to_luma8()
        };

        if self.invert {
            image::imageops::invert(&mut gray);
        }

        binarize(&mut gray, self.threshold);

        let gray = if self.sharpen { sharpen(&gray) } else { gray };

        Ok(DynamicImage::ImageLuma8(gray))
    }

    fn resize_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let max_dim = width.max(height);

        if self.max_size == 0 || max_dim <= self.max_size {
            return (width, height);
        }

        let scale = self.max_size as f32 / max_dim as f32;
        let new_width = (width as f32 * scale) as u32;
        let new_height = (height as f32 * scale) as u32;

        (new_width.max(1), new_height.max(1))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

fn binarize(image: &mut GrayImage, threshold: u8) {
    for pixel in image.pixels_mut() {
        pixel[0] = if pixel[0] < threshold { 0 } else { 255 };
    }
}

/// 3x3 sharpen with edge pixels clamped to the border.
fn sharpen(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut out = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let mut acc = 0i32;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let sx = (x as i32 + dx).clamp(0, width as i32 - 1) as u32;
                    let sy = (y as i32 + dy).clamp(0, height as i32 - 1) as u32;
                    let weight = if dx == 0 && dy == 0 {
                        SHARPEN_CENTER
                    } else {
                        SHARPEN_NEIGHBOUR
                    };
                    acc += weight * image.get_pixel(sx, sy)[0] as i32;
                }
            }
            out.get_pixel_mut(x, y)[0] = (acc / SHARPEN_SCALE).clamp(0, 255) as u8;
        }
    }

    out
}

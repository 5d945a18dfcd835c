//! Page images for OCR.
//!
//! Scanned PDFs carry each page as an embedded image XObject, so the page
//! image is recovered by decoding those objects rather than rendering the
//! page. Raw image uploads are decoded directly as a single page.

use image::{DynamicImage, GrayImage, ImageBuffer, Rgb};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{is_pdf, open_document, page_limit, Rasterizer, Result};
use crate::error::PdfError;
use crate::models::config::PdfConfig;

/// Rasterizer that decodes embedded page images.
#[derive(Debug, Clone)]
pub struct PdfImageRasterizer {
    max_pages: usize,
    decrypt_empty_password: bool,
}

impl PdfImageRasterizer {
    /// Create a rasterizer with default settings.
    pub fn new() -> Self {
        Self::from_config(&PdfConfig::default())
    }

    /// Create a rasterizer from configuration.
    pub fn from_config(config: &PdfConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            decrypt_empty_password: config.decrypt_empty_password,
        }
    }

    fn rasterize_pdf(&self, data: &[u8]) -> Result<Vec<DynamicImage>> {
        let doc = open_document(data, self.decrypt_empty_password)?;
        let pages = doc.get_pages();
        let limit = page_limit(pages.len(), self.max_pages);

        let mut images = Vec::new();
        for (&number, &page_id) in pages.iter().take(limit) {
            let page_images = page_images(&doc, page_id);
            debug!("Page {}: {} images", number, page_images.len());
            images.extend(page_images);
        }

        // Some producers attach images outside the page resource tree.
        if images.is_empty() {
            debug!("No page images found, scanning all document objects");
            images = document_images(&doc);
            if self.max_pages > 0 {
                images.truncate(self.max_pages);
            }
        }

        if images.is_empty() {
            return Err(PdfError::ImageExtraction(
                "no decodable images in document".to_string(),
            ));
        }
        Ok(images)
    }
}

impl Default for PdfImageRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for PdfImageRasterizer {
    fn rasterize(&self, data: &[u8]) -> Result<Vec<DynamicImage>> {
        if is_pdf(data) {
            return self.rasterize_pdf(data);
        }

        image::guess_format(data).map_err(|_| PdfError::UnsupportedFormat)?;
        let image = image::load_from_memory(data)
            .map_err(|e| PdfError::ImageExtraction(e.to_string()))?;
        debug!("Decoded image upload: {}x{}", image.width(), image.height());
        Ok(vec![image])
    }
}

/// Decode the image XObjects referenced by one page.
fn page_images(doc: &Document, page_id: ObjectId) -> Vec<DynamicImage> {
    let Some(resources) = page_resources(doc, page_id) else {
        return Vec::new();
    };
    let Ok(xobjects) = resources.get(b"XObject") else {
        return Vec::new();
    };
    let Ok((_, Object::Dictionary(xobjects))) = doc.dereference(xobjects) else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(_, reference)| doc.dereference(reference).ok())
        .filter_map(|(_, object)| decode_image_object(doc, object))
        .collect()
}

/// Decode every image object in the document, in object order.
fn document_images(doc: &Document) -> Vec<DynamicImage> {
    doc.objects
        .values()
        .filter_map(|object| decode_image_object(doc, object))
        .collect()
}

/// Resources of a page, inherited from the nearest ancestor that defines them.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut node_id = page_id;
    // Bounded walk guards against cyclic Parent links.
    for _ in 0..64 {
        let Ok(Object::Dictionary(node)) = doc.get_object(node_id) else {
            return None;
        };
        if let Ok(resources) = node.get(b"Resources") {
            if let Ok((_, Object::Dictionary(resources))) = doc.dereference(resources) {
                return Some(resources.clone());
            }
        }
        match node.get(b"Parent") {
            Ok(Object::Reference(parent)) => node_id = *parent,
            _ => return None,
        }
    }
    None
}

fn decode_image_object(doc: &Document, object: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = object else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;
    trace!("Found image object: {}x{}", width, height);
    if width == 0 || height == 0 {
        return None;
    }

    let filter = dict.get(b"Filter").ok().and_then(|filter| match filter {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(filters) => filters.last().and_then(|f| f.as_name().ok()),
        _ => None,
    });

    match filter {
        Some(b"DCTDecode") => {
            return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                .ok();
        }
        Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
            trace!("Skipping unsupported image filter");
            return None;
        }
        _ => {}
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    let components = color_components(doc, dict)?;
    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    raw_to_image(&data, width, height, components, bits)
}

/// Number of color components for DeviceGray/DeviceRGB and ICC-based spaces.
fn color_components(doc: &Document, dict: &Dictionary) -> Option<u8> {
    let space = match dict.get(b"ColorSpace") {
        Ok(space) => doc.dereference(space).ok()?.1,
        Err(_) => return Some(3),
    };

    match space {
        Object::Name(name) => name_components(name),
        Object::Array(parts) => {
            let family = parts.first()?.as_name().ok()?;
            if family == b"ICCBased" {
                let (_, profile) = doc.dereference(parts.get(1)?).ok()?;
                let n = profile.as_stream().ok()?.dict.get(b"N").ok()?.as_i64().ok()?;
                match n {
                    1 => Some(1),
                    3 => Some(3),
                    _ => None,
                }
            } else {
                name_components(family)
            }
        }
        _ => None,
    }
}

fn name_components(name: &[u8]) -> Option<u8> {
    match name {
        b"DeviceGray" | b"G" | b"CalGray" => Some(1),
        b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(3),
        _ => None,
    }
}

fn raw_to_image(data: &[u8], width: u32, height: u32, components: u8, bits: i64) -> Option<DynamicImage> {
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return None;
    }

    match (components, bits) {
        (1, 8) => {
            let pixels = data.get(..w * h)?.to_vec();
            GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        }
        (3, 8) => {
            let pixels = data.get(..w * h * 3)?.to_vec();
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8)
        }
        (1, 1) => {
            // Rows are padded to a byte boundary; a set bit is white.
            let row_bytes = w.div_ceil(8);
            let packed = data.get(..row_bytes * h)?;
            let mut pixels = Vec::with_capacity(w * h);
            for row in packed.chunks(row_bytes) {
                for x in 0..w {
                    let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
                    pixels.push(if bit == 1 { 255 } else { 0 });
                }
            }
            GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8)
        }
        _ => {
            trace!(
                "Unsupported image layout: {} components at {} bits",
                components, bits
            );
            None
        }
    }
}

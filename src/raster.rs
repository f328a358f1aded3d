//! In-memory bitmap of the captured region.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use printpdf::{RawImage, RawImageData, RawImageFormat};

use crate::error::{ExportError, Result};

/// Rasterized capture target.
///
/// Lives for the duration of one export: produced by
/// [`rasterize`](crate::capture::rasterize), consumed by
/// [`compose_pdf`](crate::document::compose_pdf).
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: RgbImage,
}

impl RasterImage {
    /// Decode a PNG screenshot.
    ///
    /// Transparent pixels are composited over white, matching how the page
    /// background prints.
    ///
    /// # Errors
    ///
    /// - [`ExportError::ImageDecode`] if the bytes are not a PNG image
    /// - [`ExportError::EmptyCapture`] if the image has no pixels
    pub fn from_png(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png).map_err(|e| {
            log::error!("❌ Failed to decode captured PNG ({} bytes): {}", bytes.len(), e);
            ExportError::ImageDecode(e.to_string())
        })?;

        Self::from_dynamic(decoded)
    }

    /// Wrap an already decoded image.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(ExportError::EmptyCapture { width, height });
        }

        let pixels = if image.color().has_alpha() {
            flatten_on_white(&image)
        } else {
            image.to_rgb8()
        };

        Ok(Self { pixels })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// RGB pixel buffer.
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Convert to an RGB8 image XObject source for `printpdf`.
    pub fn to_raw_image(&self) -> RawImage {
        RawImage {
            pixels: RawImageData::U8(self.pixels.as_raw().clone()),
            width: self.width() as usize,
            height: self.height() as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        }
    }
}

fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

// ============================================================================
// Unit Tests
// ============================================================================

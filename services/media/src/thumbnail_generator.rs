use std::io::Cursor;

use anyhow::{Context, Result};
use image::{ImageReader, codecs::jpeg::JpegEncoder, imageops::FilterType};
use tracing::debug;

/// Encoded thumbnail plus the dimensions of the source image
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub jpeg: Vec<u8>,
    pub original_width: u32,
    pub original_height: u32,
}

/// Decodes an image and renders a fixed-width JPEG preview of it
pub trait ThumbnailGenerator: Send + Sync {
    fn generate(&self, data: &[u8]) -> Result<Thumbnail>;
}

/// Thumbnail generator backed by the `image` crate
#[derive(Debug, Clone)]
pub struct ImageThumbnailer {
    width: u32,
    quality: u8,
}

impl ImageThumbnailer {
    pub fn new(width: u32, quality: u8) -> Self {
        Self {
            width,
            quality: quality.clamp(1, 100),
        }
    }
}

impl ThumbnailGenerator for ImageThumbnailer {
    fn generate(&self, data: &[u8]) -> Result<Thumbnail> {
        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .context("Failed to detect image format")?
            .decode()
            .context("Failed to decode image")?;

        let (original_width, original_height) = (img.width(), img.height());

        // Never upscale images narrower than the target width
        let resized = if original_width > self.width {
            let height = (original_height as u64 * self.width as u64 / original_width as u64)
                .max(1) as u32;
            img.resize_exact(self.width, height, FilterType::Lanczos3)
        } else {
            img
        };

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode_image(&resized.to_rgb8())
            .context("Failed to encode thumbnail")?;

        debug!(
            original_width,
            original_height,
            bytes = jpeg.len(),
            "Generated thumbnail"
        );

        Ok(Thumbnail {
            jpeg,
            original_width,
            original_height,
        })
    }
}

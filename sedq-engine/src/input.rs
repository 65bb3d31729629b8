//! Decoded, immutable image input shared by all detectors

use crate::error::{EngineError, EngineResult};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// One request's image: original encoded bytes plus decoded RGB pixels
///
/// Detectors only ever receive `&ImageInput`; nothing can mutate it once
/// decoded, so it is shared across detector tasks behind an `Arc`.
#[derive(Debug)]
pub struct ImageInput {
    encoded: Arc<[u8]>,
    format: Option<ImageFormat>,
    rgb: RgbImage,
}

impl ImageInput {
    /// Decode `bytes`, enforcing the byte limit first
    ///
    /// # Errors
    /// - `EmptyInput` for zero bytes
    /// - `InputTooLarge` above `max_bytes`
    /// - `Decode` for unreadable, truncated or zero-sized images
    pub fn decode(bytes: &[u8], max_bytes: usize) -> EngineResult<Self> {
        if bytes.is_empty() {
            return Err(EngineError::EmptyInput);
        }
        if bytes.len() > max_bytes {
            return Err(EngineError::InputTooLarge {
                size: bytes.len(),
                limit: max_bytes,
            });
        }

        let reader = image::io::Reader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| EngineError::Decode(format!("Cannot read image header: {}", e)))?;
        let format = reader.format();
        let decoded = reader
            .decode()
            .map_err(|e| EngineError::Decode(e.to_string()))?;

        let rgb = decoded.to_rgb8();
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(EngineError::Decode("Image has zero width or height".to_string()));
        }

        debug!(
            width = rgb.width(),
            height = rgb.height(),
            format = ?format,
            "Decoded image input"
        );

        Ok(Self {
            encoded: Arc::from(bytes),
            format,
            rgb,
        })
    }

    /// Original encoded bytes as submitted
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// Container format guessed from the header
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// Decoded RGB pixels
    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }
}

//! Compression-residual analysis (ELA)
//!
//! Re-encodes the image as JPEG at a fixed quality, decodes it back and
//! measures the mean absolute per-channel difference `M`. Regions edited after
//! the last save recompress differently from the rest of the image, so a large
//! `M` is treated as evidence of editing.

use super::{artifact, check_cancelled, Detection, Detector};
use crate::config::ResidualConfig;
use crate::error::DetectorError;
use crate::input::ImageInput;
use crate::types::DetectorKind;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat, RgbImage};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct CompressionResidualDetector {
    config: ResidualConfig,
}

impl CompressionResidualDetector {
    pub fn new(config: ResidualConfig) -> Self {
        Self { config }
    }

    /// Band score for a mean residual magnitude
    pub fn score_for(&self, mean_residual: f64) -> f64 {
        let c = &self.config;
        if mean_residual < c.low_threshold {
            c.low_band_score
        } else if mean_residual > c.high_threshold {
            c.high_band_score
        } else {
            c.mid_band_score
        }
    }

    fn verdict_text(&self, mean_residual: f64) -> String {
        let c = &self.config;
        if mean_residual < c.low_threshold {
            format!(
                "Low compression residual (mean {:.2} < {:.1}): consistent with a single save",
                mean_residual, c.low_threshold
            )
        } else if mean_residual > c.high_threshold {
            format!(
                "High compression residual (mean {:.2} > {:.1}): likely edited regions",
                mean_residual, c.high_threshold
            )
        } else {
            format!(
                "Moderate compression residual (mean {:.2}): inspect the residual map",
                mean_residual
            )
        }
    }

    /// JPEG round trip at the configured quality
    fn recompress(&self, rgb: &RgbImage) -> Result<RgbImage, DetectorError> {
        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, self.config.quality).encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ColorType::Rgb8,
        )?;

        let decoded = image::load_from_memory_with_format(&encoded, ImageFormat::Jpeg)?.to_rgb8();
        if decoded.dimensions() != rgb.dimensions() {
            return Err(DetectorError::compute(format!(
                "recompressed image is {:?}, expected {:?}",
                decoded.dimensions(),
                rgb.dimensions()
            )));
        }
        Ok(decoded)
    }
}

/// Absolute per-channel difference image and its mean magnitude
fn residual(original: &RgbImage, recompressed: &RgbImage) -> (Vec<u8>, f64) {
    let diff: Vec<u8> = original
        .as_raw()
        .iter()
        .zip(recompressed.as_raw())
        .map(|(&a, &b)| a.abs_diff(b))
        .collect();

    let total: u64 = diff.iter().map(|&d| d as u64).sum();
    let mean = if diff.is_empty() {
        0.0
    } else {
        total as f64 / diff.len() as f64
    };
    (diff, mean)
}

impl Detector for CompressionResidualDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Residual
    }

    fn detect(&self, image: &ImageInput, cancel: &CancellationToken) -> Result<Detection, DetectorError> {
        let original = image.rgb();
        let recompressed = self.recompress(original)?;
        check_cancelled(cancel)?;

        let (diff, mean_residual) = residual(original, &recompressed);
        let score = self.score_for(mean_residual);
        debug!(
            quality = self.config.quality,
            mean_residual = mean_residual,
            score = score,
            "Compression residual measured"
        );
        check_cancelled(cancel)?;

        let gain = self.config.artifact_gain;
        let stretched: Vec<u8> = diff
            .iter()
            .map(|&d| (d as f64 * gain).round().clamp(0.0, 255.0) as u8)
            .collect();
        let map = RgbImage::from_raw(original.width(), original.height(), stretched)
            .ok_or_else(|| DetectorError::compute("residual buffer size mismatch"))?;
        let artifact = artifact::encode_png(DynamicImage::ImageRgb8(map))?;

        Ok(Detection::new(score, self.verdict_text(mean_residual))
            .with_metric(mean_residual)
            .with_artifact(artifact))
    }
}

//! Sensor-noise plausibility analysis
//!
//! Camera sensors leave a fine, roughly uniform noise floor. The image is
//! reduced to intensity, denoised, and the variance of `original - denoised`
//! is mapped to a score: almost no residual noise reads as over-smoothed or
//! synthetic, a healthy noise floor reads as camera-like.

use super::{artifact, check_cancelled, Detection, Detector};
use crate::config::{DenoiserKind, NoiseConfig};
use crate::error::DetectorError;
use crate::input::ImageInput;
use crate::types::DetectorKind;
use image::imageops::{self, FilterType};
use image::DynamicImage;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Denoising backend producing a smoothed estimate of an intensity field
pub trait Denoiser: Send + Sync {
    fn name(&self) -> &str;

    /// `field` is row-major, `width * height` values on the 0-255 scale
    fn denoise(&self, field: &[f32], width: u32, height: u32) -> Result<Vec<f32>, DetectorError>;
}

/// Local adaptive (Wiener-style) filter
///
/// For each pixel, with local mean `mu` and variance `var` over a square
/// window clipped at the borders, and `noise` the mean of all local variances:
///
/// `out = mu + max(var - noise, 0) / (var + balance) * (x - mu)`
#[derive(Debug, Clone, Copy)]
pub struct WienerDenoiser {
    window: u32,
    balance: f64,
}

impl WienerDenoiser {
    pub fn new(window: u32, balance: f64) -> Self {
        Self { window, balance }
    }
}

/// Summed-area table with a zero guard row and column
struct Integral {
    stride: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl Integral {
    fn build(field: &[f32], width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut sum = vec![0.0; stride * (height + 1)];
        let mut sum_sq = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            let mut row_sq = 0.0;
            for x in 0..width {
                let v = field[y * width + x] as f64;
                row += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + (x + 1);
                sum[idx] = sum[idx - stride] + row;
                sum_sq[idx] = sum_sq[idx - stride] + row_sq;
            }
        }
        Self { stride, sum, sum_sq }
    }

    /// Sum and sum of squares over the inclusive box `[x0, x1] x [y0, y1]`
    fn box_sums(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> (f64, f64) {
        let s = self.stride;
        let (a, b, c, d) = (y0 * s + x0, y0 * s + x1 + 1, (y1 + 1) * s + x0, (y1 + 1) * s + x1 + 1);
        (
            self.sum[d] - self.sum[b] - self.sum[c] + self.sum[a],
            self.sum_sq[d] - self.sum_sq[b] - self.sum_sq[c] + self.sum_sq[a],
        )
    }
}

impl Denoiser for WienerDenoiser {
    fn name(&self) -> &str {
        "wiener"
    }

    fn denoise(&self, field: &[f32], width: u32, height: u32) -> Result<Vec<f32>, DetectorError> {
        let (w, h) = (width as usize, height as usize);
        if field.len() != w * h || field.is_empty() {
            return Err(DetectorError::compute(format!(
                "denoiser received {} values for a {}x{} field",
                field.len(),
                width,
                height
            )));
        }

        let integral = Integral::build(field, w, h);
        let radius = (self.window / 2) as usize;

        let mut means = Vec::with_capacity(field.len());
        let mut variances = Vec::with_capacity(field.len());
        for y in 0..h {
            let (y0, y1) = (y.saturating_sub(radius), (y + radius).min(h - 1));
            for x in 0..w {
                let (x0, x1) = (x.saturating_sub(radius), (x + radius).min(w - 1));
                let count = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f64;
                let (sum, sum_sq) = integral.box_sums(x0, y0, x1, y1);
                let mean = sum / count;
                means.push(mean);
                variances.push((sum_sq / count - mean * mean).max(0.0));
            }
        }

        let noise = variances.iter().sum::<f64>() / variances.len() as f64;

        Ok(field
            .iter()
            .zip(means.iter().zip(&variances))
            .map(|(&x, (&mean, &var))| {
                let gain = (var - noise).max(0.0) / (var + self.balance);
                (mean + gain * (x as f64 - mean)) as f32
            })
            .collect())
    }
}

/// Largest dimensions within `cap x cap` that keep the aspect ratio
pub fn fit_within(width: u32, height: u32, cap: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= cap {
        return (width, height);
    }
    let scale = cap as f64 / longest as f64;
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, cap);
    (scaled(width), scaled(height))
}

pub struct SensorNoiseDetector {
    config: NoiseConfig,
    denoiser: Option<Arc<dyn Denoiser>>,
}

impl SensorNoiseDetector {
    /// Detector with the denoiser selected in `config`
    pub fn new(config: NoiseConfig) -> Self {
        let denoiser = Self::default_denoiser(&config);
        Self { config, denoiser }
    }

    /// Denoiser named by `config.denoiser`
    pub fn default_denoiser(config: &NoiseConfig) -> Option<Arc<dyn Denoiser>> {
        match config.denoiser {
            DenoiserKind::Wiener => Some(Arc::new(WienerDenoiser::new(config.window, config.balance))),
            DenoiserKind::Disabled => None,
        }
    }

    /// Detector with an explicit denoiser (`None` → always UNAVAILABLE)
    pub fn with_denoiser(config: NoiseConfig, denoiser: Option<Arc<dyn Denoiser>>) -> Self {
        Self { config, denoiser }
    }

    /// Map residual variance to a score
    ///
    /// Below `low_variance` the score rises linearly from `floor_score` to
    /// `low_band_ceiling`; between the bands it interpolates up to
    /// `high_band_score`; above `high_variance` it stays capped there.
    pub fn score_for(&self, variance: f64) -> f64 {
        let c = &self.config;
        if variance < c.low_variance {
            c.floor_score + (c.low_band_ceiling - c.floor_score) * (variance / c.low_variance)
        } else if variance > c.high_variance {
            c.high_band_score
        } else {
            let position = (variance - c.low_variance) / (c.high_variance - c.low_variance);
            c.low_band_ceiling + (c.high_band_score - c.low_band_ceiling) * position
        }
    }

    fn verdict_text(&self, variance: f64) -> String {
        if variance < self.config.low_variance {
            format!(
                "Very low noise variance ({:.2}): heavy filtering or synthetic generation",
                variance
            )
        } else if variance > self.config.high_variance {
            format!("High natural noise variance ({:.2})", variance)
        } else {
            format!("Natural noise variance ({:.2})", variance)
        }
    }
}

impl Detector for SensorNoiseDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Noise
    }

    fn detect(&self, image: &ImageInput, cancel: &CancellationToken) -> Result<Detection, DetectorError> {
        let denoiser = self.denoiser.as_ref().ok_or_else(|| {
            DetectorError::unavailable("no denoising backend configured; sensor-noise analysis skipped")
        })?;

        let mut gray = imageops::grayscale(image.rgb());
        let (width, height) = fit_within(gray.width(), gray.height(), self.config.resize_cap);
        if (width, height) != gray.dimensions() {
            debug!(
                from_width = gray.width(),
                from_height = gray.height(),
                width = width,
                height = height,
                "Downsampling for noise analysis"
            );
            gray = imageops::resize(&gray, width, height, FilterType::Lanczos3);
        }
        check_cancelled(cancel)?;

        let field: Vec<f32> = gray.as_raw().iter().map(|&p| p as f32).collect();
        let denoised = denoiser.denoise(&field, width, height)?;
        if denoised.len() != field.len() {
            return Err(DetectorError::compute(format!(
                "{} denoiser returned {} values, expected {}",
                denoiser.name(),
                denoised.len(),
                field.len()
            )));
        }
        check_cancelled(cancel)?;

        let noise: Vec<f32> = field.iter().zip(&denoised).map(|(&o, &d)| o - d).collect();
        let mean = noise.iter().map(|&v| v as f64).sum::<f64>() / noise.len() as f64;
        let variance = noise
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / noise.len() as f64;
        if !variance.is_finite() {
            return Err(DetectorError::compute("noise residual variance is not finite"));
        }

        let score = self.score_for(variance);
        debug!(
            denoiser = denoiser.name(),
            variance = variance,
            score = score,
            "Sensor noise measured"
        );

        let map = artifact::normalize_to_gray(&noise, width, height)?;
        let artifact = artifact::encode_png(DynamicImage::ImageLuma8(map))?;

        Ok(Detection::new(score, self.verdict_text(variance))
            .with_metric(variance)
            .with_artifact(artifact))
    }
}

//! Engine configuration
//!
//! Every field has a compiled default, so a missing or partial TOML file
//! still yields a working engine. Values are checked by
//! [`EngineConfig::validate`] before any detector runs.
//!
//! ```toml
//! [residual]
//! quality = 92
//!
//! [noise]
//! resize_cap = 400
//!
//! [fusion.thresholds]
//! forged_below = 40.0
//! clean_at = 75.0
//! ```

use crate::error::{EngineError, EngineResult};
use crate::fusion::{FusionWeights, VerdictThresholds};
use crate::types::{DetectorKind, SCORE_MAX, SCORE_MIN};
use sedq_common::config::{load_toml_or_default, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Module name used for config file lookup (`sedq/engine.toml`)
pub const CONFIG_MODULE_NAME: &str = "engine";

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub residual: ResidualConfig,
    pub noise: NoiseConfig,
    pub classifier: ClassifierConfig,
    pub fusion: FusionConfig,
    pub limits: LimitsConfig,
    pub logging: LoggingConfig,
}

/// Compression-residual analyzer settings
///
/// Mean residual magnitude `M` selects one of three fixed band scores:
/// `M < low_threshold` → `low_band_score`, `M > high_threshold` →
/// `high_band_score`, anything between → `mid_band_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResidualConfig {
    /// JPEG re-encode quality (1-100)
    pub quality: u8,
    pub low_threshold: f64,
    pub high_threshold: f64,
    pub low_band_score: f64,
    pub mid_band_score: f64,
    pub high_band_score: f64,
    /// Linear contrast stretch applied to the difference artifact
    pub artifact_gain: f64,
}

impl Default for ResidualConfig {
    fn default() -> Self {
        Self {
            quality: 90,
            low_threshold: 3.0,
            high_threshold: 10.0,
            low_band_score: 90.0,
            mid_band_score: 60.0,
            high_band_score: 20.0,
            artifact_gain: 10.0,
        }
    }
}

/// Denoising backend for the sensor-noise analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenoiserKind {
    /// Local adaptive (Wiener-style) filter
    Wiener,
    /// No denoiser: the analyzer reports UNAVAILABLE
    Disabled,
}

/// Sensor-noise analyzer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub denoiser: DenoiserKind,
    /// Longest side allowed before downsampling (pixels)
    pub resize_cap: u32,
    /// Odd filter window edge length
    pub window: u32,
    /// Damping term added to the local variance in the filter gain
    pub balance: f64,
    /// Below this variance the image looks over-smoothed
    pub low_variance: f64,
    /// Above this variance the score is capped
    pub high_variance: f64,
    /// Score at zero variance
    pub floor_score: f64,
    /// Score at `low_variance` (start of the mid band)
    pub low_band_ceiling: f64,
    /// Score at and above `high_variance`
    pub high_band_score: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            denoiser: DenoiserKind::Wiener,
            resize_cap: 500,
            window: 5,
            balance: 0.01,
            low_variance: 30.0,
            high_variance: 150.0,
            floor_score: 10.0,
            low_band_ceiling: 40.0,
            high_band_score: 85.0,
        }
    }
}

/// Memory layout of an activation (feature-map) tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationLayout {
    /// `[1, H, W, C]`
    Nhwc,
    /// `[1, C, H, W]`
    Nchw,
}

/// Learned classifier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Square model input edge (pixels)
    pub input_size: u32,
    /// Heatmap weight in the explanation overlay (original gets `1 - alpha`)
    pub overlay_alpha: f64,
    /// ONNX model file (only used with the `onnx` feature)
    pub model_path: Option<PathBuf>,
    /// Name of the probability output tensor
    pub probability_output: String,
    /// Name of the feature-map output used for explanations
    pub activation_output: Option<String>,
    pub activation_layout: ActivationLayout,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            input_size: 128,
            overlay_alpha: 0.4,
            model_path: None,
            probability_output: "probability".to_string(),
            activation_output: None,
            activation_layout: ActivationLayout::Nhwc,
        }
    }
}

/// Scores a detector contributes to fusion when FAILED or UNAVAILABLE
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultScores {
    /// Neutral: a missing classifier neither accuses nor vouches
    pub ai: f64,
    pub noise: f64,
    pub residual: f64,
}

impl Default for DefaultScores {
    fn default() -> Self {
        Self {
            ai: 50.0,
            noise: 0.0,
            residual: 0.0,
        }
    }
}

impl DefaultScores {
    pub fn for_detector(&self, kind: DetectorKind) -> f64 {
        match kind {
            DetectorKind::Ai => self.ai,
            DetectorKind::Noise => self.noise,
            DetectorKind::Residual => self.residual,
        }
    }
}

/// Fusion settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub weights: FusionWeights,
    pub thresholds: VerdictThresholds,
    pub defaults: DefaultScores,
}

/// Input limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_input_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Per-request overrides accepted at the engine boundary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    pub ela_quality: Option<u8>,
    pub noise_resize_cap: Option<u32>,
    pub fusion_weights: Option<FusionWeights>,
    pub verdict_thresholds: Option<VerdictThresholds>,
}

impl EngineConfig {
    /// Load from a resolved TOML path (None → compiled defaults) and validate
    pub fn load(path: Option<&Path>) -> EngineResult<Self> {
        let config: EngineConfig = load_toml_or_default(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Copy of this config with request overrides applied
    pub fn with_overrides(&self, overrides: &ConfigOverrides) -> Self {
        let mut config = self.clone();
        if let Some(quality) = overrides.ela_quality {
            config.residual.quality = quality;
        }
        if let Some(cap) = overrides.noise_resize_cap {
            config.noise.resize_cap = cap;
        }
        if let Some(weights) = overrides.fusion_weights {
            config.fusion.weights = weights;
        }
        if let Some(thresholds) = overrides.verdict_thresholds {
            config.fusion.thresholds = thresholds;
        }
        config
    }

    /// Reject incoherent values
    pub fn validate(&self) -> EngineResult<()> {
        let r = &self.residual;
        if !(1..=100).contains(&r.quality) {
            return Err(config_err(format!("residual.quality must be 1-100, got {}", r.quality)));
        }
        ensure_ordered("residual thresholds", r.low_threshold, r.high_threshold)?;
        for (name, score) in [
            ("residual.low_band_score", r.low_band_score),
            ("residual.mid_band_score", r.mid_band_score),
            ("residual.high_band_score", r.high_band_score),
        ] {
            ensure_score(name, score)?;
        }
        if !r.artifact_gain.is_finite() || r.artifact_gain <= 0.0 {
            return Err(config_err("residual.artifact_gain must be positive"));
        }

        let n = &self.noise;
        if n.resize_cap == 0 {
            return Err(config_err("noise.resize_cap must be non-zero"));
        }
        if n.window == 0 || n.window % 2 == 0 {
            return Err(config_err(format!("noise.window must be odd, got {}", n.window)));
        }
        if !n.balance.is_finite() || n.balance <= 0.0 {
            return Err(config_err("noise.balance must be positive"));
        }
        if n.low_variance <= 0.0 {
            return Err(config_err("noise.low_variance must be positive"));
        }
        ensure_ordered("noise variance bands", n.low_variance, n.high_variance)?;
        for (name, score) in [
            ("noise.floor_score", n.floor_score),
            ("noise.low_band_ceiling", n.low_band_ceiling),
            ("noise.high_band_score", n.high_band_score),
        ] {
            ensure_score(name, score)?;
        }

        let c = &self.classifier;
        if c.input_size == 0 {
            return Err(config_err("classifier.input_size must be non-zero"));
        }
        if !(0.0..=1.0).contains(&c.overlay_alpha) {
            return Err(config_err("classifier.overlay_alpha must be within [0, 1]"));
        }

        self.fusion.weights.validate()?;
        self.fusion.thresholds.validate()?;
        for kind in DetectorKind::ALL {
            ensure_score(
                &format!("fusion.defaults.{}", kind.id()),
                self.fusion.defaults.for_detector(kind),
            )?;
        }

        if self.limits.max_input_bytes == 0 {
            return Err(config_err("limits.max_input_bytes must be non-zero"));
        }

        Ok(())
    }
}

fn config_err(message: impl Into<String>) -> EngineError {
    EngineError::Config(message.into())
}

fn ensure_score(name: &str, value: f64) -> EngineResult<()> {
    if value.is_finite() && (SCORE_MIN..=SCORE_MAX).contains(&value) {
        Ok(())
    } else {
        Err(config_err(format!("{} must be within [0, 100], got {}", name, value)))
    }
}

fn ensure_ordered(name: &str, low: f64, high: f64) -> EngineResult<()> {
    if low.is_finite() && high.is_finite() && low >= 0.0 && low < high {
        Ok(())
    } else {
        Err(config_err(format!("{}: expected 0 <= low < high, got {} / {}", name, low, high)))
    }
}

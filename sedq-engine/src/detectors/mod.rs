// Forensic Detectors - independent, individually fallible image analyzers
//
// Three detectors: compression residual (ELA), sensor noise, learned classifier.
// Each runs on the shared immutable ImageInput and reports by value; no
// detector error ever propagates past run_detector().

pub mod artifact;
pub mod compression_residual;
pub mod learned_classifier;
pub mod sensor_noise;

pub use compression_residual::CompressionResidualDetector;
pub use learned_classifier::LearnedClassifierDetector;
pub use sensor_noise::{Denoiser, SensorNoiseDetector, WienerDenoiser};

use crate::error::DetectorError;
use crate::input::ImageInput;
use crate::types::{DetectorKind, DetectorResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Message recorded for detectors stopped by cancellation
pub const CANCELLED_MESSAGE: &str = "analysis cancelled";

/// Successful detector measurement
#[derive(Debug, Clone)]
pub struct Detection {
    /// Authenticity score (clamped to [0, 100] when converted)
    pub score: f64,
    pub message: String,
    /// PNG-encoded visualization
    pub artifact: Option<Vec<u8>>,
    /// Raw measurement behind the score
    pub metric: Option<f64>,
    /// Score is valid but the secondary output failed
    pub partial: bool,
}

impl Detection {
    pub fn new(score: f64, message: impl Into<String>) -> Self {
        Self {
            score,
            message: message.into(),
            artifact: None,
            metric: None,
            partial: false,
        }
    }

    pub fn with_artifact(mut self, artifact: Vec<u8>) -> Self {
        self.artifact = Some(artifact);
        self
    }

    pub fn with_metric(mut self, metric: f64) -> Self {
        self.metric = Some(metric);
        self
    }

    /// Mark the secondary output as missing; any artifact is dropped
    pub fn into_partial(mut self, message: impl Into<String>) -> Self {
        self.partial = true;
        self.artifact = None;
        self.message = message.into();
        self
    }
}

/// Detector trait - all forensic detectors implement this
///
/// Detectors are CPU-bound and synchronous; the orchestrator runs each one
/// on the blocking pool.
pub trait Detector: Send + Sync {
    /// Which composite slot this detector fills
    fn kind(&self) -> DetectorKind;

    /// Analyze the image
    ///
    /// # Returns
    /// * `Ok(Detection)` - score computed (possibly partial)
    /// * `Err(DetectorError::Unavailable)` - capability missing
    /// * `Err(_)` - computation failed or was cancelled
    fn detect(&self, image: &ImageInput, cancel: &CancellationToken) -> Result<Detection, DetectorError>;
}

/// Bail out between stages once the request is cancelled
pub fn check_cancelled(cancel: &CancellationToken) -> Result<(), DetectorError> {
    if cancel.is_cancelled() {
        Err(DetectorError::Cancelled)
    } else {
        Ok(())
    }
}

/// Run one detector and convert its outcome into a [`DetectorResult`]
///
/// This is the NOT_RUN → terminal transition: exactly one result per call,
/// with `default_score` standing in whenever the detector degraded.
pub fn run_detector(
    detector: &dyn Detector,
    image: &ImageInput,
    cancel: &CancellationToken,
    default_score: f64,
) -> DetectorResult {
    let kind = detector.kind();
    if cancel.is_cancelled() {
        return DetectorResult::failed(default_score, CANCELLED_MESSAGE);
    }

    match detector.detect(image, cancel) {
        Ok(detection) if detection.partial => {
            warn!(detector = %kind, "{}", detection.message);
            DetectorResult::partial(detection.score, detection.message, detection.metric)
        }
        Ok(detection) => {
            debug!(detector = %kind, score = detection.score, "Detector succeeded");
            DetectorResult::success(
                detection.score,
                detection.message,
                detection.artifact,
                detection.metric,
            )
        }
        Err(DetectorError::Unavailable(reason)) => {
            warn!(detector = %kind, "Detector unavailable: {}", reason);
            DetectorResult::unavailable(default_score, reason)
        }
        Err(DetectorError::Cancelled) => {
            debug!(detector = %kind, "Detector cancelled");
            DetectorResult::failed(default_score, CANCELLED_MESSAGE)
        }
        Err(e) => {
            warn!(detector = %kind, error = %e, "Detector failed");
            DetectorResult::failed(default_score, e.to_string())
        }
    }
}

//! Error types for sedq-engine
//!
//! Only [`EngineError`] crosses the orchestrator boundary. Detector-level
//! problems ([`DetectorError`]) are converted into a `DetectorResult` by value
//! and never escape a detector.

use crate::types::DetectorKind;
use thiserror::Error;

/// Result type for engine entry points
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a whole analysis request
#[derive(Debug, Error)]
pub enum EngineError {
    /// Image bytes unreadable or corrupt (fatal, no detector runs)
    #[error("Image decode failed: {0}")]
    Decode(String),

    /// No bytes were submitted
    #[error("Empty image input")]
    EmptyInput,

    /// Encoded input exceeds the configured byte limit
    #[error("Image input too large: {size} bytes (limit {limit})")]
    InputTooLarge { size: usize, limit: usize },

    /// Engine or per-request configuration is incoherent
    #[error("Configuration error: {0}")]
    Config(String),

    /// A detector result reached fusion with an out-of-range score
    #[error("Fusion invariant violated by {detector}: {reason}")]
    FusionInvariant { detector: DetectorKind, reason: String },
}

impl From<sedq_common::Error> for EngineError {
    fn from(err: sedq_common::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

/// Errors raised inside a single detector
#[derive(Debug, Error)]
pub enum DetectorError {
    /// Required capability missing (degrades to UNAVAILABLE)
    #[error("Detector unavailable: {0}")]
    Unavailable(String),

    /// Failure inside the detector's algorithm (degrades to FAILED)
    #[error("Detector computation failed: {0}")]
    Compute(String),

    /// Codec failure while re-encoding or decoding intermediate images
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// Cancellation observed between detector stages
    #[error("Analysis cancelled")]
    Cancelled,
}

impl DetectorError {
    pub fn compute(message: impl Into<String>) -> Self {
        Self::Compute(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Errors reported by an injected classifier implementation
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    /// Output missing, non-finite or outside [0, 1]
    #[error("Invalid classifier output: {0}")]
    InvalidOutput(String),

    /// The classifier exposes no feature layer to explain from
    #[error("Classifier does not support explanations")]
    ExplanationUnsupported,

    #[error("Explanation failed: {0}")]
    Explanation(String),
}

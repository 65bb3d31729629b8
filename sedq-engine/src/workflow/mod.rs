//! Per-request analysis workflow
//!
//! One request flows through:
//! 1. Config merge and validation (request overrides on top of engine config)
//! 2. Decode (the only fatal step)
//! 3. Three detectors, concurrently, each on the blocking pool
//! 4. Barrier, then fusion into a [`CompositeResult`](crate::types::CompositeResult)
//!
//! Progress is reported through [`AnalysisEvent`]s when an event channel is
//! attached.

pub mod pipeline;

pub use pipeline::ForensicEngine;

use crate::config::ConfigOverrides;
use crate::fusion::Verdict;
use crate::types::{AnalysisStatus, DetectorKind, DetectorState};

/// One analysis request at the engine boundary
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    /// Encoded image bytes as uploaded
    pub image_bytes: Vec<u8>,
    /// Optional per-request configuration
    pub overrides: ConfigOverrides,
}

impl AnalysisRequest {
    pub fn new(image_bytes: Vec<u8>) -> Self {
        Self {
            image_bytes,
            overrides: ConfigOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Analysis progress events for UI reporting
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum AnalysisEvent {
    /// Image decoded, detectors about to run
    Decoded {
        width: u32,
        height: u32,
    },

    /// Detector task submitted
    DetectorStarted {
        detector: DetectorKind,
    },

    /// Detector reached its terminal state
    DetectorFinished {
        detector: DetectorKind,
        state: DetectorState,
        /// Score contributed to fusion (default score when degraded)
        score: f64,
    },

    /// Composite result produced
    Completed {
        final_score: f64,
        verdict: Verdict,
        status: AnalysisStatus,
    },
}

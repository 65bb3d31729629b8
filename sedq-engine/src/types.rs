//! Core result types shared by detectors, fusion and the orchestrator
//!
//! A detector never hands fusion a tuple: every outcome is a named
//! [`DetectorResult`] whose `score` is always a number in [0, 100], even when
//! the detector degraded (it then carries the detector's default score).

use crate::fusion::{FusionWeights, Verdict, VerdictThresholds};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lower bound of every score
pub const SCORE_MIN: f64 = 0.0;
/// Upper bound of every score
pub const SCORE_MAX: f64 = 100.0;

/// Clamp a score into [0, 100]
///
/// NaN passes through unchanged so fusion can reject it; infinities clamp
/// to the nearest bound.
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(SCORE_MIN, SCORE_MAX)
}

/// Identity of one of the three forensic detectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Learned classifier + saliency explainer
    Ai,
    /// Sensor-noise analyzer
    Noise,
    /// Compression-residual (ELA) analyzer
    Residual,
}

impl DetectorKind {
    /// All detectors, in composite field order
    pub const ALL: [DetectorKind; 3] = [DetectorKind::Ai, DetectorKind::Noise, DetectorKind::Residual];

    /// Short identifier used in logs and events
    pub fn id(&self) -> &'static str {
        match self {
            DetectorKind::Ai => "ai",
            DetectorKind::Noise => "noise",
            DetectorKind::Residual => "residual",
        }
    }

    /// Human-readable name used in summary messages
    pub fn label(&self) -> &'static str {
        match self {
            DetectorKind::Ai => "learned classifier",
            DetectorKind::Noise => "sensor-noise analysis",
            DetectorKind::Residual => "compression-residual analysis",
        }
    }
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Terminal state of one detector run
///
/// A detector starts NOT_RUN (no result exists yet) and transitions exactly
/// once into one of these states; there are no retries within a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectorState {
    Success,
    /// Core score computed, secondary output (explanation) missing
    PartialSuccess,
    /// Required capability missing
    Unavailable,
    Failed,
}

impl DetectorState {
    /// True for every state other than SUCCESS
    pub fn is_degraded(&self) -> bool {
        !matches!(self, DetectorState::Success)
    }

    /// True when the score is the detector's default rather than a measurement
    pub fn uses_default_score(&self) -> bool {
        matches!(self, DetectorState::Unavailable | DetectorState::Failed)
    }
}

impl std::fmt::Display for DetectorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorState::Success => write!(f, "SUCCESS"),
            DetectorState::PartialSuccess => write!(f, "PARTIAL_SUCCESS"),
            DetectorState::Unavailable => write!(f, "UNAVAILABLE"),
            DetectorState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Outcome of one detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorResult {
    /// Authenticity score in [0, 100]
    pub score: f64,
    pub state: DetectorState,
    pub message: String,
    /// PNG-encoded visualization (base64 in JSON)
    #[serde(with = "artifact_base64")]
    pub artifact: Option<Vec<u8>>,
    /// Raw measurement behind the score (mean residual, noise variance, raw model output)
    pub metric: Option<f64>,
}

impl DetectorResult {
    pub fn success(score: f64, message: impl Into<String>, artifact: Option<Vec<u8>>, metric: Option<f64>) -> Self {
        Self {
            score: clamp_score(score),
            state: DetectorState::Success,
            message: message.into(),
            artifact,
            metric,
        }
    }

    /// Score retained, artifact dropped
    pub fn partial(score: f64, message: impl Into<String>, metric: Option<f64>) -> Self {
        Self {
            score: clamp_score(score),
            state: DetectorState::PartialSuccess,
            message: message.into(),
            artifact: None,
            metric,
        }
    }

    pub fn unavailable(default_score: f64, message: impl Into<String>) -> Self {
        Self {
            score: clamp_score(default_score),
            state: DetectorState::Unavailable,
            message: message.into(),
            artifact: None,
            metric: None,
        }
    }

    pub fn failed(default_score: f64, message: impl Into<String>) -> Self {
        Self {
            score: clamp_score(default_score),
            state: DetectorState::Failed,
            message: message.into(),
            artifact: None,
            metric: None,
        }
    }
}

/// The three detector results, addressed by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorResults {
    pub ai: DetectorResult,
    pub noise: DetectorResult,
    pub residual: DetectorResult,
}

impl DetectorResults {
    pub fn get(&self, kind: DetectorKind) -> &DetectorResult {
        match kind {
            DetectorKind::Ai => &self.ai,
            DetectorKind::Noise => &self.noise,
            DetectorKind::Residual => &self.residual,
        }
    }

    /// Iterate in composite field order (ai, noise, residual)
    pub fn iter(&self) -> impl Iterator<Item = (DetectorKind, &DetectorResult)> {
        DetectorKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}

/// Whether every detector ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    Complete,
    /// Cancelled before all detectors finished
    Aborted,
}

/// Fused result of one analysis request; immutable once built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeResult {
    pub analysis_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub status: AnalysisStatus,
    /// Weighted, clamped fusion score in [0, 100]
    pub final_score: f64,
    /// Pure function of `final_score` under `thresholds`
    pub verdict: Verdict,
    pub detectors: DetectorResults,
    pub summary_message: String,
    pub weights: FusionWeights,
    pub thresholds: VerdictThresholds,
}

mod artifact_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(artifact: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match artifact {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_clamp_score() {
        assert_eq!(DetectorResult::success(140.0, "ok", None, None).score, 100.0);
        assert_eq!(DetectorResult::partial(-5.0, "ok", None).score, 0.0);
        assert_eq!(DetectorResult::failed(250.0, "x").score, 100.0);
    }

    #[test]
    fn test_degraded_states() {
        assert!(!DetectorState::Success.is_degraded());
        assert!(DetectorState::PartialSuccess.is_degraded());
        assert!(!DetectorState::PartialSuccess.uses_default_score());
        assert!(DetectorState::Unavailable.uses_default_score());
        assert!(DetectorState::Failed.uses_default_score());
    }

    #[test]
    fn test_state_serializes_screaming_case() {
        let json = serde_json::to_string(&DetectorState::PartialSuccess).unwrap();
        assert_eq!(json, "\"PARTIAL_SUCCESS\"");
    }

    #[test]
    fn test_artifact_serializes_as_base64() {
        let result = DetectorResult::success(80.0, "ok", Some(vec![0x89, b'P', b'N', b'G']), Some(1.5));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["artifact"], "iVBORw==");
        assert_eq!(value["state"], "SUCCESS");

        let back: DetectorResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_missing_artifact_serializes_as_null() {
        let value = serde_json::to_value(DetectorResult::failed(0.0, "boom")).unwrap();
        assert!(value["artifact"].is_null());
    }

    #[test]
    fn test_results_iterate_in_field_order() {
        let results = DetectorResults {
            ai: DetectorResult::success(1.0, "a", None, None),
            noise: DetectorResult::success(2.0, "n", None, None),
            residual: DetectorResult::success(3.0, "r", None, None),
        };
        let scores: Vec<f64> = results.iter().map(|(_, r)| r.score).collect();
        assert_eq!(scores, vec![1.0, 2.0, 3.0]);
        assert_eq!(results.get(DetectorKind::Residual).message, "r");
    }
}

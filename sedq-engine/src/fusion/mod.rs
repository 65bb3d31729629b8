// Fusion Engine - weighted combination of the three detector scores
//
// final_score = clamp(w_ai * ai + w_noise * noise + w_residual * residual, 0, 100)
//
// Degraded detectors already carry their default score, so the formula is
// always fully defined: weights are never renormalized.

pub mod summary;
pub mod verdict;

pub use verdict::{Verdict, VerdictThresholds};

use crate::config::FusionConfig;
use crate::error::{EngineError, EngineResult};
use crate::types::{
    clamp_score, AnalysisStatus, CompositeResult, DetectorKind, DetectorResults, SCORE_MAX,
    SCORE_MIN,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Tolerance for the weights-sum-to-one check
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Per-detector fusion weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub ai: f64,
    pub noise: f64,
    pub residual: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            ai: 0.4,
            noise: 0.3,
            residual: 0.3,
        }
    }
}

impl FusionWeights {
    pub fn weight(&self, kind: DetectorKind) -> f64 {
        match kind {
            DetectorKind::Ai => self.ai,
            DetectorKind::Noise => self.noise,
            DetectorKind::Residual => self.residual,
        }
    }

    /// Weights must be finite, non-negative and sum to 1
    pub fn validate(&self) -> EngineResult<()> {
        for kind in DetectorKind::ALL {
            let w = self.weight(kind);
            if !w.is_finite() || w < 0.0 {
                return Err(EngineError::Config(format!(
                    "fusion weight for {} must be a non-negative number, got {}",
                    kind, w
                )));
            }
        }
        let sum = self.ai + self.noise + self.residual;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::Config(format!(
                "fusion weights must sum to 1.0, got {}",
                sum
            )));
        }
        Ok(())
    }
}

/// Combines detector results into a [`CompositeResult`]
#[derive(Debug, Clone, Copy)]
pub struct FusionEngine {
    weights: FusionWeights,
    thresholds: VerdictThresholds,
}

impl FusionEngine {
    pub fn new(weights: FusionWeights, thresholds: VerdictThresholds) -> Self {
        Self { weights, thresholds }
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(config.weights, config.thresholds)
    }

    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    pub fn thresholds(&self) -> VerdictThresholds {
        self.thresholds
    }

    /// Weighted, clamped score
    ///
    /// # Errors
    /// `FusionInvariant` if any detector score is non-finite or outside
    /// [0, 100]. Detector results are clamped at construction, so hitting
    /// this means a result was built by hand; it is reported, not re-clamped.
    pub fn final_score(&self, results: &DetectorResults) -> EngineResult<f64> {
        let mut raw = 0.0;
        for (kind, result) in results.iter() {
            if !result.score.is_finite() || !(SCORE_MIN..=SCORE_MAX).contains(&result.score) {
                error!(
                    detector = %kind,
                    score = result.score,
                    state = %result.state,
                    "Detector score outside [0, 100] reached fusion"
                );
                return Err(EngineError::FusionInvariant {
                    detector: kind,
                    reason: format!("score {} outside [0, 100]", result.score),
                });
            }
            raw += self.weights.weight(kind) * result.score;
        }

        debug!(raw_score = raw, "Fused raw score");
        Ok(clamp_score(raw))
    }

    /// Build the composite result for one request
    pub fn fuse(&self, results: DetectorResults, status: AnalysisStatus) -> EngineResult<CompositeResult> {
        let final_score = self.final_score(&results)?;
        let verdict = self.thresholds().classify(final_score);
        let summary_message = summary::build_summary(verdict, final_score, &results, status);

        info!(
            final_score = final_score,
            verdict = %verdict,
            ai = results.ai.score,
            noise = results.noise.score,
            residual = results.residual.score,
            "Fusion complete"
        );

        Ok(CompositeResult {
            analysis_id: uuid::Uuid::new_v4(),
            analyzed_at: chrono::Utc::now(),
            status,
            final_score,
            verdict,
            detectors: results,
            summary_message,
            weights: self.weights(),
            thresholds: self.thresholds(),
        })
    }
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new(FusionWeights::default(), VerdictThresholds::default())
    }
}

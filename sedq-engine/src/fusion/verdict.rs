//! Verdict thresholding
//!
//! One canonical threshold set (`< 40` FORGED, `[40, 75)` CAUTION, `>= 75`
//! CLEAN), configurable as a whole. Bands are half-open and never overlap.

use crate::error::{EngineError, EngineResult};
use crate::types::{SCORE_MAX, SCORE_MIN};
use serde::{Deserialize, Serialize};

/// Categorical outcome derived only from the fused score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Forged,
    Caution,
    Clean,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Forged => write!(f, "FORGED"),
            Verdict::Caution => write!(f, "CAUTION"),
            Verdict::Clean => write!(f, "CLEAN"),
        }
    }
}

/// Band boundaries on the [0, 100] score scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdictThresholds {
    /// Scores strictly below this are FORGED
    pub forged_below: f64,
    /// Scores at or above this are CLEAN
    pub clean_at: f64,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            forged_below: 40.0,
            clean_at: 75.0,
        }
    }
}

impl VerdictThresholds {
    /// Map a fused score to its verdict (monotonic in `score`)
    pub fn classify(&self, score: f64) -> Verdict {
        if score < self.forged_below {
            Verdict::Forged
        } else if score < self.clean_at {
            Verdict::Caution
        } else {
            Verdict::Clean
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        let ordered = self.forged_below.is_finite()
            && self.clean_at.is_finite()
            && SCORE_MIN <= self.forged_below
            && self.forged_below <= self.clean_at
            && self.clean_at <= SCORE_MAX;
        if ordered {
            Ok(())
        } else {
            Err(EngineError::Config(format!(
                "verdict thresholds must satisfy 0 <= forged_below <= clean_at <= 100, got {} / {}",
                self.forged_below, self.clean_at
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_boundaries() {
        let t = VerdictThresholds::default();
        assert_eq!(t.classify(0.0), Verdict::Forged);
        assert_eq!(t.classify(39.9), Verdict::Forged);
        assert_eq!(t.classify(40.0), Verdict::Caution);
        assert_eq!(t.classify(74.9), Verdict::Caution);
        assert_eq!(t.classify(75.0), Verdict::Clean);
        assert_eq!(t.classify(100.0), Verdict::Clean);
    }

    #[test]
    fn test_monotonic_over_score_range() {
        let t = VerdictThresholds::default();
        let mut previous = Verdict::Forged;
        for step in 0..=1000 {
            let verdict = t.classify(step as f64 / 10.0);
            assert!(verdict >= previous, "verdict regressed at {}", step as f64 / 10.0);
            previous = verdict;
        }
    }

    #[test]
    fn test_custom_thresholds() {
        let t = VerdictThresholds {
            forged_below: 50.0,
            clean_at: 80.0,
        };
        assert_eq!(t.classify(49.99), Verdict::Forged);
        assert_eq!(t.classify(50.0), Verdict::Caution);
        assert_eq!(t.classify(80.0), Verdict::Clean);
    }

    #[test]
    fn test_collapsed_caution_band_is_valid() {
        let t = VerdictThresholds {
            forged_below: 60.0,
            clean_at: 60.0,
        };
        assert!(t.validate().is_ok());
        assert_eq!(t.classify(59.9), Verdict::Forged);
        assert_eq!(t.classify(60.0), Verdict::Clean);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let t = VerdictThresholds {
            forged_below: 80.0,
            clean_at: 50.0,
        };
        assert!(t.validate().is_err());
    }
}

//! sedq-engine library interface
//!
//! Image authenticity engine: three independent forensic detectors
//! (compression residual, sensor noise, learned classifier) fused into one
//! trust score and verdict, with per-detector failure isolation.

pub mod classifier;
pub mod config;
pub mod detectors;
pub mod error;
pub mod fusion;
pub mod input;
pub mod types;
pub mod workflow;

pub use crate::classifier::{ActivationMap, ForensicClassifier, ModelInput};
pub use crate::config::{ConfigOverrides, EngineConfig};
pub use crate::error::{ClassifierError, DetectorError, EngineError, EngineResult};
pub use crate::fusion::{FusionEngine, FusionWeights, Verdict, VerdictThresholds};
pub use crate::types::{
    AnalysisStatus, CompositeResult, DetectorKind, DetectorResult, DetectorResults, DetectorState,
};
pub use crate::workflow::{AnalysisEvent, AnalysisRequest, ForensicEngine};

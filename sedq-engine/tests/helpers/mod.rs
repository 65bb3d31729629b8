//! Test Helper Utilities
//!
//! Shared utilities for testing sedq-engine

#![allow(dead_code)]

pub mod image_generator;
pub mod mock_classifiers;

pub use image_generator::{flat_png, jpeg_bytes, textured_png, textured_rgb};
pub use mock_classifiers::{Explanation, MockClassifier, SlowClassifier, TrackingClassifier};

use sedq_engine::{CompositeResult, FusionWeights};

/// Assert `final_score == clamp(w_ai * ai + w_noise * noise + w_residual * residual)`
pub fn assert_fused(composite: &CompositeResult) {
    let w: FusionWeights = composite.weights;
    let d = &composite.detectors;
    let expected = (w.ai * d.ai.score + w.noise * d.noise.score + w.residual * d.residual.score).clamp(0.0, 100.0);
    assert!(
        (composite.final_score - expected).abs() < 1e-9,
        "final_score {} != weighted {}",
        composite.final_score,
        expected
    );
    assert!((0.0..=100.0).contains(&composite.final_score));
    assert_eq!(composite.verdict, composite.thresholds.classify(composite.final_score));
}

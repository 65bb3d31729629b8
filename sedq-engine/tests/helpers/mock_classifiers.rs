//! Mock classifiers for orchestrator tests

use sedq_engine::{ActivationMap, ClassifierError, ForensicClassifier, ModelInput};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What `explain` does
#[derive(Debug, Clone, Copy)]
pub enum Explanation {
    /// Diagonal ramp of the given edge length
    Map(u32),
    /// Explanation error
    Fail,
    /// Trait default (unsupported)
    Unsupported,
}

/// Classifier with scripted behavior
#[derive(Debug, Clone)]
pub struct MockClassifier {
    /// `Err` text makes `predict` fail
    pub prediction: Result<f32, String>,
    pub explanation: Explanation,
    pub reentrant: bool,
    pub panic_on_predict: bool,
}

impl MockClassifier {
    pub fn scoring(probability: f32) -> Self {
        Self {
            prediction: Ok(probability),
            explanation: Explanation::Map(8),
            reentrant: true,
            panic_on_predict: false,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            prediction: Err(reason.to_string()),
            ..Self::scoring(0.0)
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic_on_predict: true,
            ..Self::scoring(0.0)
        }
    }

    pub fn with_explanation(mut self, explanation: Explanation) -> Self {
        self.explanation = explanation;
        self
    }
}

impl ForensicClassifier for MockClassifier {
    fn name(&self) -> &str {
        "mock"
    }

    fn predict(&self, _input: &ModelInput) -> Result<f32, ClassifierError> {
        if self.panic_on_predict {
            panic!("mock classifier panicked");
        }
        self.prediction.clone().map_err(ClassifierError::Inference)
    }

    fn explain(&self, _input: &ModelInput) -> Result<ActivationMap, ClassifierError> {
        match self.explanation {
            Explanation::Map(edge) => {
                let values = (0..edge * edge).map(|i| ((i % edge) + (i / edge)) as f32).collect();
                ActivationMap::new(edge, edge, values)
            }
            Explanation::Fail => Err(ClassifierError::Explanation("feature layer not reachable".to_string())),
            Explanation::Unsupported => Err(ClassifierError::ExplanationUnsupported),
        }
    }

    fn saliency_layer(&self) -> Option<&str> {
        Some("block5_conv3")
    }

    fn is_reentrant(&self) -> bool {
        self.reentrant
    }
}

/// Classifier that blocks for `delay` inside `predict`
pub struct SlowClassifier {
    pub delay: Duration,
}

impl ForensicClassifier for SlowClassifier {
    fn name(&self) -> &str {
        "slow"
    }

    fn predict(&self, _input: &ModelInput) -> Result<f32, ClassifierError> {
        std::thread::sleep(self.delay);
        Ok(0.9)
    }
}

/// Non-reentrant classifier that records peak concurrent model calls
#[derive(Default)]
pub struct TrackingClassifier {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl TrackingClassifier {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn track<T>(&self, call: impl FnOnce() -> T) -> T {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        let out = call();
        self.active.fetch_sub(1, Ordering::SeqCst);
        out
    }
}

impl ForensicClassifier for TrackingClassifier {
    fn name(&self) -> &str {
        "tracking"
    }

    fn predict(&self, _input: &ModelInput) -> Result<f32, ClassifierError> {
        self.track(|| Ok(0.8))
    }

    fn explain(&self, _input: &ModelInput) -> Result<ActivationMap, ClassifierError> {
        self.track(|| ActivationMap::new(4, 4, (0..16).map(|i| i as f32).collect()))
    }

    fn is_reentrant(&self) -> bool {
        false
    }
}

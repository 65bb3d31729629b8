//! Analysis orchestrator
//!
//! Runs the three detectors as independent blocking tasks over one shared,
//! immutable [`ImageInput`], joins them (barrier) and fuses the results.
//!
//! # Error Handling
//! - Decode, size and config problems abort the request before any detector runs
//! - Every detector outcome, including a panic, becomes a `DetectorResult`
//! - Cancellation stops waiting on unfinished detectors; the composite is
//!   still produced, marked ABORTED
//!
//! # Example
//! ```rust,ignore
//! let engine = ForensicEngine::new(EngineConfig::default())?.with_classifier(model);
//! let composite = engine.analyze(AnalysisRequest::new(bytes), &CancellationToken::new()).await?;
//! ```

use super::{AnalysisEvent, AnalysisRequest};
use crate::classifier::ForensicClassifier;
use crate::config::{ConfigOverrides, EngineConfig};
use crate::detectors::{
    run_detector, CompressionResidualDetector, Denoiser, Detector, LearnedClassifierDetector,
    SensorNoiseDetector, CANCELLED_MESSAGE,
};
use crate::error::{EngineError, EngineResult};
use crate::fusion::FusionEngine;
use crate::input::ImageInput;
use crate::types::{
    AnalysisStatus, CompositeResult, DetectorKind, DetectorResult, DetectorResults, DetectorState,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Image forensics engine
///
/// Holds the process-lifetime dependencies (configuration, classifier,
/// denoiser). Each `analyze` call is otherwise stateless.
pub struct ForensicEngine {
    config: EngineConfig,
    classifier: Option<Arc<dyn ForensicClassifier>>,
    /// Built once so a non-reentrant classifier shares one gate across requests
    ai_detector: Arc<LearnedClassifierDetector>,
    denoiser: Option<Arc<dyn Denoiser>>,
    event_tx: Option<mpsc::Sender<AnalysisEvent>>,
}

impl ForensicEngine {
    /// Create an engine without a classifier (the AI detector reports UNAVAILABLE)
    ///
    /// # Errors
    /// `EngineError::Config` if `config` fails validation
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let denoiser = SensorNoiseDetector::default_denoiser(&config.noise);
        let ai_detector = Arc::new(LearnedClassifierDetector::new(config.classifier.clone(), None));
        Ok(Self {
            config,
            classifier: None,
            ai_detector,
            denoiser,
            event_tx: None,
        })
    }

    /// Inject the classifier (loaded once, shared read-only by every request)
    pub fn with_classifier(mut self, classifier: Arc<dyn ForensicClassifier>) -> Self {
        self.ai_detector = Arc::new(LearnedClassifierDetector::new(
            self.config.classifier.clone(),
            Some(classifier.clone()),
        ));
        info!(
            classifier = classifier.name(),
            serialized = self.ai_detector.is_serialized(),
            saliency_layer = ?classifier.saliency_layer(),
            "Classifier attached"
        );
        self.classifier = Some(classifier);
        self
    }

    /// Replace the configured denoiser (`None` → sensor-noise analysis UNAVAILABLE)
    pub fn with_denoiser(mut self, denoiser: Option<Arc<dyn Denoiser>>) -> Self {
        self.denoiser = denoiser;
        self
    }

    /// Attach an event channel for progress reporting
    pub fn with_events(mut self, event_tx: mpsc::Sender<AnalysisEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// Analyze one image
    ///
    /// # Returns
    /// * `Ok(CompositeResult)` - best-effort result, possibly with degraded
    ///   detectors or `status == ABORTED` after cancellation
    /// * `Err(EngineError)` - the request itself was unusable (undecodable,
    ///   empty, oversized, or invalid overrides); no detector scores exist
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
        cancel: &CancellationToken,
    ) -> EngineResult<CompositeResult> {
        let config = self.config.with_overrides(&request.overrides);
        config.validate()?;
        if request.overrides != ConfigOverrides::default() {
            debug!(overrides = ?request.overrides, "Applied request overrides");
        }

        let max_bytes = config.limits.max_input_bytes;
        let bytes = request.image_bytes;
        let image = tokio::task::spawn_blocking(move || ImageInput::decode(&bytes, max_bytes))
            .await
            .map_err(|e| EngineError::Decode(format!("decoder task failed: {}", e)))??;
        let image = Arc::new(image);

        info!(
            width = image.width(),
            height = image.height(),
            format = ?image.format(),
            "Analysis started"
        );
        self.emit_event(
            AnalysisEvent::Decoded {
                width: image.width(),
                height: image.height(),
            },
            cancel,
        )
        .await;

        let residual: Arc<dyn Detector> = Arc::new(CompressionResidualDetector::new(config.residual.clone()));
        let noise: Arc<dyn Detector> = Arc::new(SensorNoiseDetector::with_denoiser(
            config.noise.clone(),
            self.denoiser.clone(),
        ));
        let ai: Arc<dyn Detector> = self.ai_detector.clone();

        let defaults = config.fusion.defaults;
        let ai_task = self.spawn_detector(ai, &image, cancel, defaults.ai).await;
        let noise_task = self.spawn_detector(noise, &image, cancel, defaults.noise).await;
        let residual_task = self.spawn_detector(residual, &image, cancel, defaults.residual).await;

        // Barrier: completion order does not matter, results are keyed by kind
        let (ai, noise, residual) = tokio::join!(
            self.finish_detector(DetectorKind::Ai, ai_task, cancel, defaults.ai),
            self.finish_detector(DetectorKind::Noise, noise_task, cancel, defaults.noise),
            self.finish_detector(DetectorKind::Residual, residual_task, cancel, defaults.residual),
        );

        let results = DetectorResults { ai, noise, residual };
        let status = analysis_status(&results);
        if status == AnalysisStatus::Aborted {
            warn!("Analysis cancelled before all detectors finished");
        }

        let composite = FusionEngine::from_config(&config.fusion).fuse(results, status)?;

        info!(
            analysis_id = %composite.analysis_id,
            final_score = composite.final_score,
            verdict = %composite.verdict,
            status = ?composite.status,
            "Analysis complete"
        );
        self.emit_event(
            AnalysisEvent::Completed {
                final_score: composite.final_score,
                verdict: composite.verdict,
                status: composite.status,
            },
            cancel,
        )
        .await;

        Ok(composite)
    }

    /// Submit one detector to the blocking pool
    async fn spawn_detector(
        &self,
        detector: Arc<dyn Detector>,
        image: &Arc<ImageInput>,
        cancel: &CancellationToken,
        default_score: f64,
    ) -> JoinHandle<DetectorResult> {
        self.emit_event(
            AnalysisEvent::DetectorStarted {
                detector: detector.kind(),
            },
            cancel,
        )
        .await;

        let image = Arc::clone(image);
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || run_detector(detector.as_ref(), &image, &cancel, default_score))
    }

    /// Wait for a detector, or stop waiting once the request is cancelled
    async fn finish_detector(
        &self,
        kind: DetectorKind,
        mut task: JoinHandle<DetectorResult>,
        cancel: &CancellationToken,
        default_score: f64,
    ) -> DetectorResult {
        let result = tokio::select! {
            biased;
            joined = &mut task => match joined {
                Ok(result) => result,
                Err(e) if e.is_panic() => {
                    error!(detector = %kind, "Detector panicked");
                    DetectorResult::failed(default_score, "detector panicked")
                }
                Err(e) => {
                    warn!(detector = %kind, error = %e, "Detector task did not complete");
                    DetectorResult::failed(default_score, format!("detector task did not complete: {}", e))
                }
            },
            _ = cancel.cancelled() => {
                // The blocking task observes the token and exits on its own
                debug!(detector = %kind, "Stopped waiting on detector");
                DetectorResult::failed(default_score, CANCELLED_MESSAGE)
            }
        };

        self.emit_event(
            AnalysisEvent::DetectorFinished {
                detector: kind,
                state: result.state,
                score: result.score,
            },
            cancel,
        )
        .await;

        result
    }

    /// Send a progress event; a full channel never outlives cancellation
    async fn emit_event(&self, event: AnalysisEvent, cancel: &CancellationToken) {
        let Some(tx) = &self.event_tx else {
            return;
        };
        tokio::select! {
            biased;
            sent = tx.send(event) => {
                if sent.is_err() {
                    debug!("Event receiver dropped");
                }
            }
            _ = cancel.cancelled() => debug!("Dropped event after cancellation"),
        }
    }
}

/// ABORTED only when cancellation actually stopped a detector; a cancel that
/// lands after every detector finished leaves the request COMPLETE
fn analysis_status(results: &DetectorResults) -> AnalysisStatus {
    let cancelled = results
        .iter()
        .any(|(_, r)| r.state == DetectorState::Failed && r.message == CANCELLED_MESSAGE);
    if cancelled {
        AnalysisStatus::Aborted
    } else {
        AnalysisStatus::Complete
    }
}

//! Learned classifier detector with saliency explanation
//!
//! Scoring and explanation are separate failure domains: a valid prediction
//! always yields a score, and an explanation failure only downgrades the
//! result to PARTIAL_SUCCESS. There is no explanation without a score.

use super::{artifact, check_cancelled, Detection, Detector};
use crate::classifier::{ActivationMap, ForensicClassifier, ModelInput};
use crate::config::ClassifierConfig;
use crate::error::{ClassifierError, DetectorError};
use crate::input::ImageInput;
use crate::types::DetectorKind;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct LearnedClassifierDetector {
    config: ClassifierConfig,
    classifier: Option<Arc<dyn ForensicClassifier>>,
    /// Serializes calls into a non-reentrant classifier
    gate: Option<Arc<Mutex<()>>>,
}

impl LearnedClassifierDetector {
    /// `classifier == None` → the detector always reports UNAVAILABLE
    pub fn new(config: ClassifierConfig, classifier: Option<Arc<dyn ForensicClassifier>>) -> Self {
        let gate = classifier
            .as_ref()
            .filter(|c| !c.is_reentrant())
            .map(|_| Arc::new(Mutex::new(())));
        Self {
            config,
            classifier,
            gate,
        }
    }

    /// Whether classifier calls are serialized
    pub fn is_serialized(&self) -> bool {
        self.gate.is_some()
    }

    fn enter(&self) -> Option<MutexGuard<'_, ()>> {
        self.gate
            .as_ref()
            .map(|gate| gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    fn predict(&self, classifier: &dyn ForensicClassifier, input: &ModelInput) -> Result<f32, ClassifierError> {
        let _guard = self.enter();
        let probability = classifier.predict(input)?;
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(ClassifierError::InvalidOutput(format!(
                "probability {} outside [0, 1]",
                probability
            )));
        }
        Ok(probability)
    }

    fn activation(&self, classifier: &dyn ForensicClassifier, input: &ModelInput) -> Result<ActivationMap, ClassifierError> {
        let _guard = self.enter();
        classifier.explain(input)
    }

    /// Upsample, colorize and blend the activation map over the original
    fn render_overlay(&self, map: &ActivationMap, original: &RgbImage) -> Result<Vec<u8>, DetectorError> {
        let gray = artifact::normalize_to_gray(map.values(), map.width(), map.height())?;
        let upsampled = imageops::resize(&gray, original.width(), original.height(), FilterType::Triangle);

        let mut heatmap = RgbImage::new(original.width(), original.height());
        for (dst, src) in heatmap.pixels_mut().zip(upsampled.pixels()) {
            *dst = artifact::jet(src[0] as f32 / 255.0);
        }

        let overlay = artifact::blend(original, &heatmap, self.config.overlay_alpha)?;
        artifact::encode_png(DynamicImage::ImageRgb8(overlay))
    }

    fn explain(
        &self,
        classifier: &dyn ForensicClassifier,
        input: &ModelInput,
        original: &RgbImage,
    ) -> Result<Vec<u8>, ClassifierError> {
        let map = self.activation(classifier, input)?;
        self.render_overlay(&map, original)
            .map_err(|e| ClassifierError::Explanation(e.to_string()))
    }
}

impl Detector for LearnedClassifierDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Ai
    }

    fn detect(&self, image: &ImageInput, cancel: &CancellationToken) -> Result<Detection, DetectorError> {
        let classifier = self
            .classifier
            .as_deref()
            .ok_or_else(|| DetectorError::unavailable("no classifier model loaded"))?;

        let input = ModelInput::from_image(image.rgb(), self.config.input_size);
        check_cancelled(cancel)?;

        let probability = self.predict(classifier, &input).map_err(|e| match e {
            ClassifierError::ModelLoad(reason) => DetectorError::unavailable(reason),
            other => DetectorError::compute(format!("{} classifier: {}", classifier.name(), other)),
        })?;
        let score = probability as f64 * 100.0;
        debug!(
            classifier = classifier.name(),
            probability = probability,
            score = score,
            "Classifier prediction"
        );

        let message = format!(
            "{} classifier: authenticity probability {:.1}%",
            classifier.name(),
            score
        );
        let detection = Detection::new(score, message).with_metric(probability as f64);
        check_cancelled(cancel)?;

        match self.explain(classifier, &input, image.rgb()) {
            Ok(overlay) => Ok(detection.with_artifact(overlay)),
            Err(e) => {
                let layer = classifier.saliency_layer().unwrap_or("unspecified layer");
                Ok(detection.into_partial(format!(
                    "core score ok, explanation unavailable ({}: {}); authenticity probability {:.1}%",
                    layer, e, score
                )))
            }
        }
    }
}

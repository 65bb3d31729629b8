// Learned classifier contract
//
// The classifier is an injected, read-only dependency constructed outside the
// engine (loaded once per process). Its raw output is the probability that
// the image is AUTHENTIC; the engine never inverts it.

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;

use crate::error::ClassifierError;
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Square, normalized model input
///
/// Row-major HWC layout, RGB channel order, values in [0, 1].
#[derive(Debug, Clone)]
pub struct ModelInput {
    size: u32,
    data: Vec<f32>,
}

impl ModelInput {
    /// Resize (Lanczos3, aspect not preserved) and normalize
    pub fn from_image(image: &RgbImage, size: u32) -> Self {
        let resized = if image.dimensions() == (size, size) {
            image.clone()
        } else {
            imageops::resize(image, size, size, FilterType::Lanczos3)
        };
        let data = resized.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
        Self { size, data }
    }

    /// Edge length in pixels
    pub fn size(&self) -> u32 {
        self.size
    }

    /// HWC values, `size * size * 3` long
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Same values in CHW order
    pub fn to_chw(&self) -> Vec<f32> {
        let plane = (self.size * self.size) as usize;
        let mut chw = vec![0.0; plane * 3];
        for (i, px) in self.data.chunks_exact(3).enumerate() {
            for c in 0..3 {
                chw[c * plane + i] = px[c];
            }
        }
        chw
    }
}

/// Spatial activation (saliency) map over the classifier's feature layer
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl ActivationMap {
    /// Row-major map; `values.len()` must equal `width * height`
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self, ClassifierError> {
        if width == 0 || height == 0 || values.len() != (width as usize) * (height as usize) {
            return Err(ClassifierError::Explanation(format!(
                "activation map has {} values for {}x{}",
                values.len(),
                width,
                height
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ClassifierError::Explanation(
                "activation map contains non-finite values".to_string(),
            ));
        }
        Ok(Self { width, height, values })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Binary authenticity classifier with an optional explanation capability
///
/// Implementations must be safe to share across threads. If the underlying
/// inference engine cannot run concurrent calls, report `is_reentrant() ==
/// false` and the engine serializes every call.
pub trait ForensicClassifier: Send + Sync {
    /// Name used in logs and messages
    fn name(&self) -> &str;

    /// Probability that the image is authentic, in [0, 1]
    fn predict(&self, input: &ModelInput) -> Result<f32, ClassifierError>;

    /// Activation map over the feature layer named by [`saliency_layer`]
    ///
    /// [`saliency_layer`]: ForensicClassifier::saliency_layer
    fn explain(&self, _input: &ModelInput) -> Result<ActivationMap, ClassifierError> {
        Err(ClassifierError::ExplanationUnsupported)
    }

    /// Feature layer the explanation is computed over
    fn saliency_layer(&self) -> Option<&str> {
        None
    }

    fn is_reentrant(&self) -> bool {
        true
    }
}

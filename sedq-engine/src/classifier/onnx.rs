//! ONNX Runtime classifier backend
//!
//! Expects a model taking one `[1, H, W, 3]` float input (HWC, [0, 1]) and
//! producing a probability output plus, optionally, a feature-map output whose
//! channel-mean ReLU activation is used as the saliency map.

use super::{ActivationMap, ForensicClassifier, ModelInput};
use crate::config::{ActivationLayout, ClassifierConfig};
use crate::error::ClassifierError;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub struct OnnxClassifier {
    session: Mutex<Session>,
    name: String,
    probability_output: String,
    activation_output: Option<String>,
    layout: ActivationLayout,
}

impl OnnxClassifier {
    /// Load a model file once; the session is reused for every request
    pub fn load(model_path: &Path, config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        if !model_path.exists() {
            return Err(ClassifierError::ModelLoad(format!(
                "model not found at {}",
                model_path.display()
            )));
        }

        let model_bytes = std::fs::read(model_path)
            .map_err(|e| ClassifierError::ModelLoad(format!("read model file: {e}")))?;

        let session = Session::builder()
            .map_err(|e| ClassifierError::ModelLoad(format!("session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ClassifierError::ModelLoad(format!("optimization level: {e}")))?
            .commit_from_memory(model_bytes.as_slice())
            .map_err(|e| ClassifierError::ModelLoad(format!("load model: {e}")))?;

        let name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        info!(
            model = %model_path.display(),
            probability_output = %config.probability_output,
            activation_output = ?config.activation_output,
            "Loaded ONNX classifier"
        );

        Ok(Self {
            session: Mutex::new(session),
            name,
            probability_output: config.probability_output.clone(),
            activation_output: config.activation_output.clone(),
            layout: config.activation_layout,
        })
    }

    fn input_tensor(input: &ModelInput) -> Result<Value, ClassifierError> {
        let size = input.size() as usize;
        let shape = vec![1usize, size, size, 3];
        Tensor::from_array((shape, input.data().to_vec().into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| ClassifierError::Inference(format!("input tensor: {e}")))
    }

    /// Run the model and copy out one named output as `(shape, values)`
    fn run_output(&self, input: &ModelInput, output_name: &str) -> Result<(Vec<i64>, Vec<f32>), ClassifierError> {
        let tensor = Self::input_tensor(input)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::Inference("session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| ClassifierError::Inference(format!("run failed: {e}")))?;

        let output = outputs
            .get(output_name)
            .ok_or_else(|| ClassifierError::InvalidOutput(format!("missing output '{output_name}'")))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InvalidOutput(format!("extract '{output_name}': {e}")))?;

        Ok((shape.iter().copied().collect(), data.to_vec()))
    }
}

/// Channel-mean ReLU activation of a 4-D feature map
fn channel_mean_relu(shape: &[i64], data: &[f32], layout: ActivationLayout) -> Result<ActivationMap, ClassifierError> {
    if shape.len() != 4 || shape[0] != 1 || shape.iter().any(|&d| d <= 0) {
        return Err(ClassifierError::Explanation(format!(
            "expected a [1, ., ., .] feature map, got {:?}",
            shape
        )));
    }

    let (channels, height, width) = match layout {
        ActivationLayout::Nhwc => (shape[3] as usize, shape[1] as usize, shape[2] as usize),
        ActivationLayout::Nchw => (shape[1] as usize, shape[2] as usize, shape[3] as usize),
    };
    if data.len() != channels * height * width {
        return Err(ClassifierError::Explanation(format!(
            "feature map has {} values for shape {:?}",
            data.len(),
            shape
        )));
    }

    let plane = height * width;
    let mut values = vec![0.0f32; plane];
    for (i, value) in values.iter_mut().enumerate() {
        let total: f32 = (0..channels)
            .map(|c| match layout {
                ActivationLayout::Nhwc => data[i * channels + c],
                ActivationLayout::Nchw => data[c * plane + i],
            })
            .sum();
        *value = (total / channels as f32).max(0.0);
    }

    ActivationMap::new(width as u32, height as u32, values)
}

impl ForensicClassifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, input: &ModelInput) -> Result<f32, ClassifierError> {
        let (_, data) = self.run_output(input, &self.probability_output)?;
        // A single sigmoid unit; a two-way softmax reports [manipulated, authentic]
        match data.as_slice() {
            [p] => Ok(*p),
            [_, authentic] => Ok(*authentic),
            other => Err(ClassifierError::InvalidOutput(format!(
                "expected 1 or 2 probability values, got {}",
                other.len()
            ))),
        }
    }

    fn explain(&self, input: &ModelInput) -> Result<ActivationMap, ClassifierError> {
        let layer = self
            .activation_output
            .as_deref()
            .ok_or(ClassifierError::ExplanationUnsupported)?;
        let (shape, data) = self
            .run_output(input, layer)
            .map_err(|e| ClassifierError::Explanation(e.to_string()))?;
        channel_mean_relu(&shape, &data, self.layout)
    }

    fn saliency_layer(&self) -> Option<&str> {
        self.activation_output.as_deref()
    }
}

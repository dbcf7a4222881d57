use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;

use super::classifier::{Classifier, ClassifierError};
use super::preprocess::ImageTensor;

/// Classifier backed by an ONNX export of the trained model.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
}

impl OnnxClassifier {
    pub fn load(model_path: &Path) -> Result<Self, ClassifierError> {
        log::info!("Loading ONNX model from {}", model_path.display());

        let session = Session::builder()
            .map_err(|e| ClassifierError::load(model_path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ClassifierError::load(model_path, e))?
            .commit_from_file(model_path)
            .map_err(|e| ClassifierError::load(model_path, e))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| ClassifierError::load(model_path, "model declares no inputs"))?;
        if session.outputs.is_empty() {
            return Err(ClassifierError::load(model_path, "model declares no outputs"));
        }
        log::debug!("ONNX model input: {}", input_name);

        Ok(Self {
            session: Mutex::new(session),
            input_name,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, tensor: &ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        let input = Value::from_array(tensor.to_owned())
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::Inference("ONNX session lock poisoned".to_string()))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let scores = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        Ok(scores.iter().copied().collect())
    }

    fn backend(&self) -> &'static str {
        "onnx"
    }
}

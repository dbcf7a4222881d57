use shared::Vegetable;
use std::path::Path;
use std::sync::Arc;

use super::preprocess::ImageTensor;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Failed to load model from {path}: {reason}")]
    Load { path: String, reason: String },
    #[error("Unsupported model file {0}")]
    UnsupportedFormat(String),
    #[error("Model inference error: {0}")]
    Inference(String),
    #[error("Model produced {actual} scores, expected {expected}")]
    OutputShape { expected: usize, actual: usize },
}

impl ClassifierError {
    pub fn load(path: &Path, reason: impl ToString) -> Self {
        ClassifierError::Load {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A loaded image classification model. Implementations are shared by all
/// requests, so `predict` must not depend on earlier calls.
pub trait Classifier: Send + Sync {
    /// Returns one score per [`Vegetable`], in label order. Scores are
    /// whatever the model emits; no normalisation is applied.
    fn predict(&self, tensor: &ImageTensor) -> Result<Vec<f32>, ClassifierError>;

    fn backend(&self) -> &'static str;
}

/// Index of the largest score. Ties go to the lowest index and NaN never
/// wins.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}

pub fn resolve_label(scores: &[f32]) -> Result<Vegetable, ClassifierError> {
    if scores.len() != Vegetable::COUNT {
        return Err(ClassifierError::OutputShape {
            expected: Vegetable::COUNT,
            actual: scores.len(),
        });
    }
    argmax(scores)
        .and_then(Vegetable::from_index)
        .ok_or_else(|| ClassifierError::Inference("model produced no finite scores".to_string()))
}

/// Loads the model at `path`, picking the runtime from the file extension.
/// Only backends compiled in through cargo features are available.
pub fn load_classifier(path: &Path) -> Result<Arc<dyn Classifier>, ClassifierError> {
    if !path.is_file() {
        return Err(ClassifierError::load(path, "file not found"));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("onnx") => load_onnx(path),
        Some("pt" | "pth" | "torchscript") => load_torch(path),
        _ => Err(ClassifierError::UnsupportedFormat(format!(
            "{} (expected .onnx, .pt, .pth or .torchscript)",
            path.display()
        ))),
    }
}

#[cfg(feature = "onnx")]
fn load_onnx(path: &Path) -> Result<Arc<dyn Classifier>, ClassifierError> {
    Ok(Arc::new(super::onnx::OnnxClassifier::load(path)?))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(path: &Path) -> Result<Arc<dyn Classifier>, ClassifierError> {
    Err(ClassifierError::UnsupportedFormat(format!(
        "{} (built without the `onnx` feature)",
        path.display()
    )))
}

#[cfg(feature = "torch")]
fn load_torch(path: &Path) -> Result<Arc<dyn Classifier>, ClassifierError> {
    Ok(Arc::new(super::torch::TorchClassifier::load(path)?))
}

#[cfg(not(feature = "torch"))]
fn load_torch(path: &Path) -> Result<Arc<dyn Classifier>, ClassifierError> {
    Err(ClassifierError::UnsupportedFormat(format!(
        "{} (built without the `torch` feature)",
        path.display()
    )))
}

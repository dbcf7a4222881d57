use std::path::Path;
use std::sync::Mutex;
use tch::{CModule, Device, Kind, Tensor};

use super::classifier::{Classifier, ClassifierError};
use super::preprocess::ImageTensor;

/// Classifier backed by a TorchScript export of the trained model. The
/// module receives the same NHWC tensor as the ONNX backend.
pub struct TorchClassifier {
    model: Mutex<CModule>,
    device: Device,
}

impl TorchClassifier {
    pub fn load(model_path: &Path) -> Result<Self, ClassifierError> {
        let device = Device::cuda_if_available();
        log::info!(
            "Loading TorchScript model from {} on {:?}",
            model_path.display(),
            device
        );
        let model = CModule::load_on_device(model_path, device)
            .map_err(|e| ClassifierError::load(model_path, e))?;
        Ok(Self {
            model: Mutex::new(model),
            device,
        })
    }
}

impl Classifier for TorchClassifier {
    fn predict(&self, tensor: &ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        let shape: Vec<i64> = tensor.shape().iter().map(|&dim| dim as i64).collect();
        let data: Vec<f32> = tensor.iter().copied().collect();
        let input = Tensor::from_slice(&data)
            .view(shape.as_slice())
            .to_device(self.device);

        let output = self
            .model
            .lock()
            .map_err(|_| ClassifierError::Inference("TorchScript module lock poisoned".to_string()))?
            .forward_ts(&[input])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let output_flat = output
            .to_kind(Kind::Float)
            .to_device(Device::Cpu)
            .view([-1]);
        let num_elements = output_flat.size()[0] as usize;
        let mut output_vec = vec![0.0f32; num_elements];
        output_flat.copy_data(&mut output_vec, num_elements);
        Ok(output_vec)
    }

    fn backend(&self) -> &'static str {
        "torch"
    }
}

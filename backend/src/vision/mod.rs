pub mod classifier;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod preprocess;
#[cfg(feature = "torch")]
pub mod torch;

pub use classifier::{Classifier, ClassifierError, load_classifier, resolve_label};
pub use preprocess::{IMAGE_HEIGHT, IMAGE_WIDTH, ImageTensor, PreprocessError, preprocess_image};

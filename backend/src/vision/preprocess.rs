use image::ImageReader;
use image::imageops::FilterType;
use ndarray::Array4;
use std::path::Path;

/// Input size the model was trained on.
pub const IMAGE_WIDTH: u32 = 224;
pub const IMAGE_HEIGHT: u32 = 224;
pub const CHANNELS: usize = 3;

/// NHWC tensor of shape `[1, height, width, 3]`, values in `[0, 1]`.
pub type ImageTensor = Array4<f32>;

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Loads the image at `path` the same way the training pipeline did:
/// nearest-neighbour resize to exactly `width`x`height` (aspect ratio is not
/// preserved), RGB, scaled by 1/255, with a leading batch axis.
pub fn preprocess_image(
    path: &Path,
    width: u32,
    height: u32,
) -> Result<ImageTensor, PreprocessError> {
    // Format comes from the file content, the extension is client supplied.
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let rgb = image
        .resize_exact(width, height, FilterType::Nearest)
        .to_rgb8();

    let tensor = Array4::from_shape_fn(
        (1, height as usize, width as usize, CHANNELS),
        |(_, y, x, c)| rgb.get_pixel(x as u32, y as u32)[c] as f32 / 255.0,
    );
    Ok(tensor)
}

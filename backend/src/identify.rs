use actix_multipart::MultipartError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, web};
use shared::{ErrorResponse, IdentifyResponse, Vegetable, format_seconds};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::speech::{self, SpeechError, Speaker};
use crate::storage::{TempUpload, TempUploadStore, UploadError};
use crate::vision::{
    Classifier, ClassifierError, IMAGE_HEIGHT, IMAGE_WIDTH, PreprocessError, preprocess_image,
    resolve_label,
};

#[derive(Debug, thiserror::Error)]
pub enum IdentifyError {
    #[error("No image file provided")]
    NoImageProvided,
    #[error("No selected image")]
    NoSelectedImage,
    #[error("Invalid multipart payload: {0}")]
    Multipart(String),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error("Blocking task failed: {0}")]
    Blocking(String),
    /// The prediction succeeded but could not be announced.
    #[error("{source}")]
    Speech {
        source: SpeechError,
        partial: Box<IdentifyResponse>,
    },
}

impl From<MultipartError> for IdentifyError {
    fn from(err: MultipartError) -> Self {
        IdentifyError::Multipart(err.to_string())
    }
}

impl ResponseError for IdentifyError {
    fn status_code(&self) -> StatusCode {
        match self {
            IdentifyError::NoImageProvided
            | IdentifyError::NoSelectedImage
            | IdentifyError::Multipart(_)
            | IdentifyError::Preprocess(PreprocessError::Decode(_)) => StatusCode::BAD_REQUEST,
            IdentifyError::Upload(UploadError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            IdentifyError::Upload(UploadError::Io(_))
            | IdentifyError::Preprocess(PreprocessError::Io(_))
            | IdentifyError::Classifier(_)
            | IdentifyError::Blocking(_)
            | IdentifyError::Speech { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = ErrorResponse::new(self.to_string());
        if let IdentifyError::Speech { partial, .. } = self {
            body.partial = Some(partial.as_ref().clone());
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Outcome of preprocessing and classifying one upload.
#[derive(Debug, Clone, Copy)]
pub struct Identification {
    pub label: Vegetable,
    pub preprocessing: Duration,
    pub inference: Duration,
}

/// Runs the identify pipeline against the process-wide model and speech
/// engine.
pub struct IdentifyService {
    classifier: Arc<dyn Classifier>,
    speaker: Arc<dyn Speaker>,
    uploads: TempUploadStore,
}

impl IdentifyService {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        speaker: Arc<dyn Speaker>,
        uploads: TempUploadStore,
    ) -> Self {
        Self {
            classifier,
            speaker,
            uploads,
        }
    }

    pub fn uploads(&self) -> &TempUploadStore {
        &self.uploads
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    /// Classifies and announces `upload`. The upload is removed before this
    /// returns, on every path.
    pub async fn identify(&self, upload: TempUpload) -> Result<IdentifyResponse, IdentifyError> {
        let path = upload.path().to_path_buf();
        let classifier = self.classifier.clone();
        let identification = web::block(move || classify_file(classifier.as_ref(), &path))
            .await
            .map_err(|e| IdentifyError::Blocking(e.to_string()))??;

        let response = IdentifyResponse::new(
            identification.label,
            identification.preprocessing,
            identification.inference,
        );

        let spoken = self
            .speaker
            .speak(&speech::announcement(identification.label))
            .await;
        upload.close();

        match spoken {
            Ok(()) => Ok(response),
            Err(source) => {
                log::error!("Failed to announce {}: {}", identification.label, source);
                Err(IdentifyError::Speech {
                    source,
                    partial: Box::new(response),
                })
            }
        }
    }
}

/// Preprocesses and classifies the image at `path`, timing both steps.
pub fn classify_file(
    classifier: &dyn Classifier,
    path: &Path,
) -> Result<Identification, IdentifyError> {
    let started = Instant::now();
    let tensor = preprocess_image(path, IMAGE_WIDTH, IMAGE_HEIGHT)?;
    let preprocessing = started.elapsed();
    log::info!("Preprocessing time: {}", format_seconds(preprocessing));

    let started = Instant::now();
    let scores = classifier.predict(&tensor)?;
    let inference = started.elapsed();
    log::info!("Inference time: {}", format_seconds(inference));

    let label = resolve_label(&scores)?;
    Ok(Identification {
        label,
        preprocessing,
        inference,
    })
}

use actix_multipart::Multipart;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, web};
use futures::TryStreamExt;
use log::{info, warn};
use serde::Serialize;
use shared::Vegetable;
use uuid::Uuid;

use crate::identify::{IdentifyError, IdentifyService};
use crate::storage::{TempUpload, TempUploadStore};

const IMAGE_FIELD: &str = "image";

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/identify").route(web::post().to(identify)));
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Welcome to the model API")
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    backend: &'static str,
    classes: usize,
}

async fn health(service: web::Data<IdentifyService>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        backend: service.classifier().backend(),
        classes: Vegetable::COUNT,
    })
}

async fn identify(
    req: HttpRequest,
    service: web::Data<IdentifyService>,
    mut payload: Multipart,
) -> Result<HttpResponse, IdentifyError> {
    let request_id = Uuid::new_v4();

    if req.content_type() != "multipart/form-data" {
        warn!("[{}] Rejected non-multipart upload", request_id);
        return Err(IdentifyError::NoImageProvided);
    }

    let upload = receive_image(service.uploads(), &mut payload)
        .await
        .inspect_err(|e| warn!("[{}] Upload rejected: {}", request_id, e))?;
    info!(
        "[{}] Saved image to: {} ({} bytes)",
        request_id,
        upload.path().display(),
        upload.bytes_written()
    );

    let response = service
        .identify(upload)
        .await
        .inspect_err(|e| warn!("[{}] Identification failed: {}", request_id, e))?;
    info!("[{}] Predicted {}", request_id, response.prediction);

    Ok(HttpResponse::Ok().json(response))
}

/// Streams the first file sent under the `image` field into a temp file.
/// Fields with other names, and `image` fields that are not files, are
/// skipped.
async fn receive_image(
    store: &TempUploadStore,
    payload: &mut Multipart,
) -> Result<TempUpload, IdentifyError> {
    while let Some(mut field) = payload.try_next().await? {
        let filename = match field.content_disposition() {
            Some(disposition) if disposition.get_name() == Some(IMAGE_FIELD) => {
                disposition.get_filename().map(str::to_owned)
            }
            _ => continue,
        };
        let Some(filename) = filename else {
            continue;
        };
        if filename.is_empty() {
            return Err(IdentifyError::NoSelectedImage);
        }

        let mut upload = store.create(&filename)?;
        while let Some(chunk) = field.try_next().await? {
            upload.write_chunk(&chunk)?;
        }
        upload.finish()?;
        return Ok(upload);
    }

    Err(IdentifyError::NoImageProvided)
}

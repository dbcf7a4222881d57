mod config;
mod identify;
mod routes;
mod speech;
mod storage;
mod vision;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, http, web};
use config::AppConfig;
use identify::IdentifyService;
use routes::configure_routes;
use storage::TempUploadStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    // The model is loaded once; without it there is nothing to serve.
    let classifier = vision::load_classifier(&config.model_path).map_err(|e| {
        log::error!("Failed to load model at startup: {}", e);
        std::io::Error::other(format!("Model loading failed: {}", e))
    })?;
    log::info!(
        "Loaded {} model from {}",
        classifier.backend(),
        config.model_path.display()
    );

    let speaker = speech::from_config(&config.speech);
    let uploads = TempUploadStore::new(config.upload_dir.clone(), config.max_upload_bytes);
    log::info!("Uploads are staged in {}", uploads.dir().display());

    let service = web::Data::new(IdentifyService::new(classifier, speaker, uploads));
    let origins = config.cors_allowed_origins.clone();
    let any_origin = config.allows_any_origin();
    let bind_address = config.bind_address();

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&origins, any_origin))
            .wrap(Logger::default())
            .app_data(service.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn build_cors(origins: &[String], any_origin: bool) -> Cors {
    let cors = if any_origin {
        Cors::default().allow_any_origin()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![http::header::ACCEPT, http::header::CONTENT_TYPE])
        .max_age(3600)
}

use clap::Parser;
use reqwest::multipart::{Form, Part};
use shared::{ErrorResponse, IdentifyResponse};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "vegetable-id-client")]
#[command(about = "Send images to the vegetable identification service", long_about = None)]
struct Cli {
    /// Base URL of the service
    #[arg(long, env = "VEGETABLE_ID_SERVER", default_value = "http://127.0.0.1:5000")]
    server: String,

    /// Re-send the images every N milliseconds until interrupted
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Image files to identify
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum ClientError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned {status}: {}", body.error)]
    Server { status: u16, body: ErrorResponse },
    #[error("Unexpected response body (status {status}): {source}")]
    UnexpectedBody {
        status: u16,
        source: serde_json::Error,
    },
}

fn identify_endpoint(server: &str) -> String {
    format!("{}/identify", server.trim_end_matches('/'))
}

fn parse_response(status: u16, body: &[u8]) -> Result<IdentifyResponse, ClientError> {
    if (200..300).contains(&status) {
        return serde_json::from_slice(body)
            .map_err(|source| ClientError::UnexpectedBody { status, source });
    }

    let body = serde_json::from_slice::<ErrorResponse>(body)
        .unwrap_or_else(|_| ErrorResponse::new(String::from_utf8_lossy(body).into_owned()));
    Err(ClientError::Server { status, body })
}

async fn identify(
    client: &reqwest::Client,
    endpoint: &str,
    path: &Path,
) -> Result<IdentifyResponse, ClientError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ClientError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let form = Form::new().part("image", Part::bytes(bytes).file_name(filename));
    let response = client.post(endpoint).multipart(form).send().await?;
    let status = response.status().as_u16();
    let body = response.bytes().await?;
    parse_response(status, &body)
}

fn report(path: &Path, result: &Result<IdentifyResponse, ClientError>) {
    match result {
        Ok(response) => println!(
            "{}: {} (preprocessing {}, inference {})",
            path.display(),
            response.prediction,
            response.preprocessing_time,
            response.inference_time
        ),
        Err(e) => {
            log::error!("{}: {}", path.display(), e);
            if let ClientError::Server {
                body:
                    ErrorResponse {
                        partial: Some(partial),
                        ..
                    },
                ..
            } = e
            {
                println!(
                    "{}: {} (not announced)",
                    path.display(),
                    partial.prediction
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let endpoint = identify_endpoint(&cli.server);
    log::info!("Sending {} image(s) to {}", cli.images.len(), endpoint);

    loop {
        let mut failures = 0;
        for image in &cli.images {
            let result = identify(&client, &endpoint, image).await;
            if result.is_err() {
                failures += 1;
            }
            report(image, &result);
        }

        match cli.interval_ms {
            Some(interval) => tokio::time::sleep(Duration::from_millis(interval)).await,
            None if failures == 0 => return ExitCode::SUCCESS,
            None => return ExitCode::FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_url() {
        assert_eq!(
            identify_endpoint("http://127.0.0.1:5000"),
            "http://127.0.0.1:5000/identify"
        );
        assert_eq!(
            identify_endpoint("http://192.168.1.21:5000/"),
            "http://192.168.1.21:5000/identify"
        );
    }

    #[test]
    fn success_body_is_decoded() {
        let body = br#"{"prediction": "Tomato", "preprocessing_time": "0.0123 seconds", "inference_time": "0.2000 seconds"}"#;
        let response = parse_response(200, body).unwrap();
        assert_eq!(response.prediction, "Tomato");
        assert_eq!(response.inference_time, "0.2000 seconds");
    }

    #[test]
    fn client_errors_carry_the_server_message() {
        let err = parse_response(400, br#"{"error": "No selected image"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Server returned 400: No selected image");
    }

    #[test]
    fn partial_prediction_survives_server_error() {
        let body = br#"{"error": "speech failed", "prediction": "Radish", "preprocessing_time": "0.0100 seconds", "inference_time": "0.0200 seconds"}"#;
        match parse_response(500, body).unwrap_err() {
            ClientError::Server { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.partial.unwrap().prediction, "Radish");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_json_errors_fall_back_to_text() {
        let err = parse_response(502, b"Bad Gateway").unwrap_err();
        assert_eq!(err.to_string(), "Server returned 502: Bad Gateway");
    }

    #[test]
    fn garbled_success_body_is_reported() {
        let err = parse_response(200, b"<html>").unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedBody { status: 200, .. }));
    }

    #[test]
    fn cli_requires_images() {
        assert!(Cli::try_parse_from(["vegetable-id-client"]).is_err());

        let cli = Cli::try_parse_from([
            "vegetable-id-client",
            "--server",
            "http://10.0.0.2:5000",
            "--interval-ms",
            "1500",
            "frame.jpg",
        ])
        .unwrap();
        assert_eq!(cli.server, "http://10.0.0.2:5000");
        assert_eq!(cli.interval_ms, Some(1500));
        assert_eq!(cli.images, vec![PathBuf::from("frame.jpg")]);
    }
}

//! The convert endpoint
//!
//! One invocation serves one request end-to-end: stage the input, run the
//! generate-validate-retry loop, upload the artifact, mint a signed URL, and
//! shape the JSON response. Storage failures after a successful conversion
//! are reported in the body, never as an HTTP failure.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{error, info, warn};
use serde_json::json;

use crate::error::ConvertError;
use crate::id::generate_run_id;
use crate::llm::{DEFAULT_PROMPT, with_additional_instruction};
use crate::orchestrator::{LoopResult, OrchestratorConfig, RetryOrchestrator};
use crate::sandbox::{SandboxConfig, SandboxRunner};
use crate::validate::validate_csv;

use super::AppState;
use super::request::{ConvertRequest, normalize_folder_path, parse_expiration, parse_request, sanitize_filename};
use super::response::{ConvertResponse, ErrorDetails};

#[derive(Debug)]
enum HandlerError {
    /// Client-side input problem, mapped to 400
    BadRequest(String),

    /// Anything unexpected, mapped to a generic 500
    Internal(ConvertError),
}

impl From<ConvertError> for HandlerError {
    fn from(e: ConvertError) -> Self {
        HandlerError::Internal(e)
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        HandlerError::Internal(ConvertError::Io(e))
    }
}

/// POST /convert
pub async fn convert(State(state): State<Arc<AppState>>, req: Request) -> Response {
    let run_id = generate_run_id();
    info!("Starting JSONL to CSV conversion, run ID: {}", run_id);

    if req.method() != Method::POST {
        error!("Invalid method, only POST supported");
        return bad_request("Only POST method is supported");
    }

    match handle(&state, req, &run_id).await {
        Ok(response) => Json(response).into_response(),
        Err(HandlerError::BadRequest(message)) => {
            error!("{}", message);
            bad_request(&message)
        }
        Err(HandlerError::Internal(e)) => {
            error!("Unexpected error in conversion: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": format!("Unexpected error in conversion: {}", e),
                    "success": false,
                    "run_id": run_id,
                })),
            )
                .into_response()
        }
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

async fn handle(state: &AppState, req: Request, run_id: &str) -> Result<ConvertResponse, HandlerError> {
    let request = parse_request(req).await.map_err(HandlerError::BadRequest)?;
    let (filename, bytes) = resolve_file(&request)?;

    let Some(first_line) = first_line(&bytes) else {
        return Err(HandlerError::BadRequest("Input file is empty".to_string()));
    };
    info!("Processing file: {}, sample line: {:.100}", filename, first_line);

    let config = &state.config;
    let fields = &request.fields;

    let project_id = fields
        .project_id
        .clone()
        .unwrap_or_else(|| config.google_cloud_project_id.clone());
    let bucket = fields
        .gcs_bucket
        .clone()
        .unwrap_or_else(|| config.gcs_bucket_name.clone());
    let folder = normalize_folder_path(
        &fields
            .gcs_folder_path
            .clone()
            .unwrap_or_else(|| format!("{}/{}/", run_id, config.gcs_default_folder)),
    );
    let expiration = parse_expiration(fields.signed_url_expiration.as_deref(), config.signed_url_expiration);
    info!("Using GCS configuration - bucket: {}, folder path: {}", bucket, folder);

    let prompt = with_additional_instruction(
        DEFAULT_PROMPT,
        fields.additional_instruction.as_deref().unwrap_or(""),
    );

    let stem = Path::new(&filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    let (input_path, output_path) = stage_temp_files(run_id, &stem, &bytes)?;

    let orchestrator = RetryOrchestrator::new(
        state.model.clone(),
        SandboxRunner::new(SandboxConfig::new(
            config.python_interpreter.clone(),
            config.sandbox_timeout(),
        )),
        OrchestratorConfig::default().with_max_attempts(config.max_retry_attempts),
    );

    info!("Starting code generation and execution");
    let result = orchestrator
        .run(&input_path, &output_path, &prompt, &first_line, &project_id)
        .await;

    let mut response = ConvertResponse {
        run_id: run_id.to_string(),
        success: result.overall_success(),
        ..Default::default()
    };

    if result.overall_success() {
        let key = format!("{}{}.csv", folder, stem);
        match state.store.upload(&output_path, &bucket, &key).await {
            Ok(location) => {
                info!("CSV successfully uploaded to {}", location);
                response.gcs_path = Some(location);
                match state.store.sign_url(&bucket, &key, expiration).await {
                    Ok(url) => {
                        response.signed_url = Some(url);
                        response.signed_url_expiration_seconds = Some(expiration);
                    }
                    Err(e) => {
                        error!("Failed to generate signed URL: {}", e);
                        response.signed_url_error = Some(e.to_string());
                    }
                }
            }
            Err(e) => {
                error!("Failed to upload CSV to GCS: {}", e);
                response.gcs_error = Some(e.to_string());
            }
        }
    } else {
        let details = error_details(&result, &output_path);
        error!("Conversion failed: {:?}", details);
        response.error_details = Some(details);
    }

    cleanup(&input_path, &output_path, response.gcs_path.is_some());
    Ok(response)
}

/// Resolve the uploaded file from whichever delivery form was used
fn resolve_file(request: &ConvertRequest) -> Result<(String, Vec<u8>), HandlerError> {
    if let Some(upload) = &request.upload {
        info!("Processing file upload");
        return Ok((sanitize_filename(&upload.filename), upload.bytes.clone()));
    }

    if let Some(encoded) = &request.fields.file_base64 {
        info!("Processing base64 encoded file");
        let Some(file_name) = &request.fields.file_name else {
            return Err(HandlerError::BadRequest(
                "file_name is required when using file_base64".to_string(),
            ));
        };
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| HandlerError::BadRequest(format!("Error decoding base64 content: {}", e)))?;
        return Ok((sanitize_filename(file_name), bytes));
    }

    Err(HandlerError::BadRequest(
        "No file provided. Please provide either a file upload or base64 encoded file content with filename."
            .to_string(),
    ))
}

/// First non-empty-trimmed line of the input, the prompting sample
fn first_line(bytes: &[u8]) -> Option<String> {
    let line = bytes.split(|b| *b == b'\n').next().unwrap_or(&[]);
    let line = String::from_utf8_lossy(line).trim().to_string();
    if line.is_empty() { None } else { Some(line) }
}

/// Write the input to a unique temp file and derive the output path beside it
fn stage_temp_files(run_id: &str, stem: &str, bytes: &[u8]) -> Result<(PathBuf, PathBuf), HandlerError> {
    let mut input = tempfile::Builder::new()
        .prefix(&format!("{}_", run_id))
        .suffix(".jsonl")
        .tempfile()?;
    input.write_all(bytes)?;
    input.flush()?;

    let input_path = input
        .into_temp_path()
        .keep()
        .map_err(|e| HandlerError::Internal(ConvertError::Io(e.error)))?;

    // Output path includes the run ID so concurrent requests never collide
    let output_path = input_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{}_{}.csv", run_id, stem));

    Ok((input_path, output_path))
}

fn error_details(result: &LoopResult, output_path: &Path) -> ErrorDetails {
    let mut details = ErrorDetails::default();
    if !result.success {
        details.execution_error = Some(result.message.clone());
    }
    if !result.validation_success {
        details.validation_error = Some(if result.output_exists {
            validate_csv(output_path).message
        } else {
            "CSV file was not created".to_string()
        });
    }
    if !result.output_exists {
        details.file_error = Some("Output CSV file was not created".to_string());
    }
    details
}

/// Best-effort removal of per-request temp files. The output is kept when it
/// was never uploaded, so the artifact of a reported storage failure is not
/// lost.
fn cleanup(input_path: &Path, output_path: &Path, uploaded: bool) {
    if let Err(e) = std::fs::remove_file(input_path) {
        warn!("Error during cleanup of {}: {}", input_path.display(), e);
    }
    if uploaded && output_path.exists() {
        if let Err(e) = std::fs::remove_file(output_path) {
            warn!("Error during cleanup of {}: {}", output_path.display(), e);
        }
    }
    info!("Temporary files cleaned up");
}

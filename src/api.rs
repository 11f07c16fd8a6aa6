//! HTTP surface for the ingestion service.
//!
//! - `POST /process` – Authenticate with the shared secret, validate the request, then run the
//!   pipeline. Body: `{ fileId, fileName, fileType, fileContent? (base64), fileUrl? }`.
//!   Responds `{ success, chunksCreated, embeddingsCreated }` or `{ success: false, error }`.
//! - `GET /health` – Static liveness signal with a timestamp.
//! - `GET /metrics` – Pipeline counters since startup.
//!
//! Authentication runs before anything else, so a rejected request never produces a status
//! transition. The `/process` body is capped at the configured upload limit; an oversized body
//! is answered with a JSON `413`.

use crate::processing::{
    DocumentContent, ProcessingApi, ProcessingError, ProcessingReport, ProcessingRequest,
};
use crate::timestamp::current_timestamp_rfc3339;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;

const API_KEY_HEADER: &str = "x-api-key";

/// Digest of the shared secret callers must present.
pub struct SharedSecret {
    digest: [u8; 32],
}

impl SharedSecret {
    /// Wrap the configured secret.
    pub fn new(secret: &str) -> Self {
        Self {
            digest: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    /// Compare `candidate` against the secret without short-circuiting on the first mismatch.
    pub fn verify(&self, candidate: &str) -> bool {
        let candidate: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();
        self.digest
            .iter()
            .zip(candidate.iter())
            .fold(0u8, |acc, (left, right)| acc | (left ^ right))
            == 0
    }
}

struct AppState<S> {
    service: Arc<S>,
    secret: Arc<SharedSecret>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            secret: Arc::clone(&self.secret),
        }
    }
}

/// Build the HTTP router exposing the processing API surface.
///
/// `max_upload_bytes` bounds the `POST /process` body, which carries base64 content inline.
pub fn create_router<S>(service: Arc<S>, secret: SharedSecret, max_upload_bytes: usize) -> Router
where
    S: ProcessingApi + 'static,
{
    let state = AppState {
        service,
        secret: Arc::new(secret),
    };
    Router::new()
        .route(
            "/process",
            post(process_file::<S>).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/health", get(health))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(state)
}

/// Request body for `POST /process`. Fields are optional so validation can name what is missing.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ProcessFileRequest {
    file_id: Option<String>,
    file_name: Option<String>,
    file_type: Option<String>,
    file_content: Option<String>,
    file_url: Option<String>,
}

impl ProcessFileRequest {
    fn into_processing_request(self) -> Result<ProcessingRequest, ApiError> {
        let mut missing = Vec::new();
        let file_id = required(self.file_id, "fileId", &mut missing);
        let file_name = required(self.file_name, "fileName", &mut missing);
        let file_type = required(self.file_type, "fileType", &mut missing);
        let file_content = self.file_content.filter(|value| !value.trim().is_empty());
        let file_url = self.file_url.filter(|value| !value.trim().is_empty());

        if !missing.is_empty() {
            return Err(ApiError::InvalidRequest(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let content = match (file_content, file_url) {
            (Some(encoded), None) => DocumentContent::Inline(
                BASE64
                    .decode(encoded.trim())
                    .map_err(|err| ApiError::InvalidRequest(format!("Invalid fileContent: {err}")))?,
            ),
            (None, Some(url)) => DocumentContent::Remote(url),
            (None, None) => {
                return Err(ApiError::InvalidRequest(
                    "Missing required fields: fileContent or fileUrl".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(ApiError::InvalidRequest(
                    "Provide either fileContent or fileUrl, not both".to_string(),
                ));
            }
        };

        Ok(ProcessingRequest {
            request_id: file_id.unwrap_or_default(),
            file_name: file_name.unwrap_or_default(),
            format_tag: file_type.unwrap_or_default(),
            content,
        })
    }
}

fn required(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> Option<String> {
    let value = value.filter(|value| !value.trim().is_empty());
    if value.is_none() {
        missing.push(name);
    }
    value
}

/// Authenticate, validate, and run the pipeline for one file.
async fn process_file<S>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ProcessingReport>, ApiError>
where
    S: ProcessingApi,
{
    authorize(&headers, &state.secret)?;
    let body = body.map_err(ApiError::from)?;

    let request: ProcessFileRequest = serde_json::from_slice(&body)
        .map_err(|err| ApiError::InvalidRequest(format!("Invalid JSON body: {err}")))?;
    let request = request.into_processing_request()?;
    let request_id = request.request_id.clone();

    let outcome = state.service.process(request).await?;
    tracing::info!(
        request_id,
        chunks_created = outcome.chunks_created,
        embeddings_created = outcome.embeddings_created,
        "Process request completed"
    );
    Ok(Json(ProcessingReport::from(Ok(outcome))))
}

fn authorize(headers: &HeaderMap, secret: &SharedSecret) -> Result<(), ApiError> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match bearer.or(api_key) {
        Some(candidate) if secret.verify(candidate.trim()) => Ok(()),
        Some(_) => {
            tracing::warn!("Rejected request with invalid secret");
            Err(ApiError::Unauthorized)
        }
        None => {
            tracing::warn!("Rejected request without credentials");
            Err(ApiError::Unauthorized)
        }
    }
}

/// Response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "operational",
        timestamp: current_timestamp_rfc3339(),
    })
}

async fn get_metrics<S>(State(state): State<AppState<S>>) -> impl IntoResponse
where
    S: ProcessingApi,
{
    Json(state.service.metrics_snapshot())
}

enum ApiError {
    Unauthorized,
    InvalidRequest(String),
    PayloadTooLarge(String),
    Processing(ProcessingError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "error": "Unauthorized" })),
            )
                .into_response(),
            Self::InvalidRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": message })),
            )
                .into_response(),
            Self::PayloadTooLarge(message) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "success": false, "error": message })),
            )
                .into_response(),
            Self::Processing(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ProcessingReport::from(Err(error))),
            )
                .into_response(),
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            tracing::warn!("Rejected oversized request body");
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::InvalidRequest(rejection.body_text())
        }
    }
}

impl From<ProcessingError> for ApiError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}

//! HTTP handlers for the upload endpoint.
//! Orchestrates rate limiting, validation, and filename sanitisation before
//! delegating the bytes to the configured `RemoteStore`.

use crate::{
    models::upload::UploadResponse,
    services::{rate_limit::RateLimitInfo, upload_policy},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::json;
use tracing::{debug, error};

/// Multipart form field that carries the file payload.
const FILE_FIELD: &str = "file";

struct FileField {
    name: String,
    bytes: Bytes,
}

/// `POST /api/upload` — accept a multipart upload and commit it to the
/// remote store. Exactly one commit happens on success; no failure path
/// leaves partial state behind.
pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let client_id = client_identifier(&headers);

    if !state.limiter.allow(&client_id).await {
        let info = state.limiter.info(&client_id).await;
        debug!(client = %client_id, "upload rejected by rate limiter");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            rate_limit_headers(&info),
            Json(UploadResponse::rate_limited(info.retry_after_secs())),
        )
            .into_response();
    }

    let file = match read_file_field(&mut multipart).await {
        Ok(Some(file)) => file,
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(UploadResponse::failure("No file provided")),
            )
                .into_response();
        }
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(UploadResponse::failure(message)))
                .into_response();
        }
    };

    let size = file.bytes.len() as u64;
    if let Err(err) = upload_policy::validate(&file.name, size, state.max_file_size) {
        return (
            StatusCode::BAD_REQUEST,
            Json(UploadResponse::failure(err.to_string())),
        )
            .into_response();
    }

    let filename = upload_policy::sanitize_filename(&file.name);

    let stored = match state.store.store(&filename, file.bytes).await {
        Ok(stored) => stored,
        Err(err) => {
            error!(error = %err, %filename, "upload commit failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UploadResponse::failure(err.to_string())),
            )
                .into_response();
        }
    };

    debug!(path = %stored.path, size, "upload committed");

    let url = format!(
        "{}/file/{}",
        state.public_base_url.trim_end_matches('/'),
        filename
    );
    let info = state.limiter.info(&client_id).await;

    (
        StatusCode::OK,
        rate_limit_headers(&info),
        Json(UploadResponse::uploaded(url, filename, size)),
    )
        .into_response()
}

/// `GET /api/upload` — static description of the endpoint, no side effects.
pub async fn upload_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "message": "File upload API",
        "endpoint": "/api/upload",
        "method": "POST",
        "maxFileSize": format!("{}MB", state.max_file_size / 1024 / 1024),
    }))
}

/// Pull the `file` field out of the multipart body. `Ok(None)` means the
/// field was absent; `Err` carries a client-facing message for a body that
/// could not be read.
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<FileField>, String> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(err) => return Err(format!("Failed to read multipart body: {}", err)),
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| format!("Failed to read file data: {}", err))?;

        return Ok(Some(FileField { name, bytes }));
    }
}

/// Clients are bucketed by the first hop in `X-Forwarded-For`; direct
/// connections without the header share the `unknown` bucket.
fn client_identifier(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn rate_limit_headers(info: &RateLimitInfo) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&info.remaining.to_string()) {
        headers.insert(HeaderName::from_static("x-ratelimit-remaining"), value);
    }
    if let Ok(value) = HeaderValue::from_str(&info.reset_at.to_string()) {
        headers.insert(HeaderName::from_static("x-ratelimit-reset"), value);
    }
    headers
}

//! The response contract for the upload endpoint.

use serde::Serialize;

/// Body returned by `POST /api/upload` on every path: success, validation
/// failure, rate limiting, and store failure. Absent fields are omitted
/// from the JSON.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,

    /// Retrieval link on this service, not the raw remote URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Sanitised filename the upload was stored under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Upload size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Seconds until the rate-limit window resets; only on 429 responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<i64>,
}

impl UploadResponse {
    pub fn uploaded(url: String, filename: String, size: u64) -> Self {
        Self {
            success: true,
            url: Some(url),
            filename: Some(filename),
            size: Some(size),
            message: Some("File uploaded successfully".to_string()),
            error: None,
            retry_after: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: None,
            filename: None,
            size: None,
            message: None,
            error: Some(error.into()),
            retry_after: None,
        }
    }

    pub fn rate_limited(retry_after: i64) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::failure("Rate limit exceeded")
        }
    }
}

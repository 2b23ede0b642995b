//! Defines routes for the upload service.
//!
//! ## Structure
//! - **Upload endpoints**
//!   - `POST /api/upload` — multipart upload (`file` form field)
//!   - `GET  /api/upload` — static endpoint description
//!
//! - **Retrieval endpoints**
//!   - `GET /file/{filename}` — redirect to the stored content
//!   - `GET /api/file/{filename}` — same handler, API-prefixed
//!
//! Health endpoints (`/healthz`, `/readyz`) are mounted at the root.

use crate::{
    handlers::{
        file_handlers::get_file,
        health_handlers::{healthz, readyz},
        upload_handlers::{upload_file, upload_info},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Headroom over the configured maximum upload for multipart framing.
const BODY_LIMIT_OVERHEAD: usize = 64 * 1024;

/// Build and return the router for all upload-service routes.
///
/// The router carries shared state (`AppState`) to all handlers. The body
/// limit is raised above axum's default so uploads up to the configured
/// maximum reach the handler; anything larger is refused by the framework
/// before the handler runs.
pub fn routes(max_file_size: u64) -> Router<AppState> {
    let body_limit = max_file_size as usize + BODY_LIMIT_OVERHEAD;

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // upload endpoints
        .route("/api/upload", post(upload_file).get(upload_info))
        // retrieval endpoints
        .route("/file/{filename}", get(get_file))
        .route("/api/file/{filename}", get(get_file))
        .layer(DefaultBodyLimit::max(body_limit))
}

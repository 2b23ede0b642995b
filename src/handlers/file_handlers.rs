//! Retrieval handler: resolves an uploaded filename against the remote
//! store and redirects to the content location.

use crate::{errors::AppError, state::AppState};
use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::debug;

/// `GET /file/{filename}` (also mounted at `/api/file/{filename}`).
///
/// The redirect is temporary so a later re-upload under the same name,
/// which lands on a new remote path, is picked up by subsequent requests.
pub async fn get_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let url = state.store.resolve(&filename).await?;

    debug!(%filename, %url, "redirecting to stored content");

    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

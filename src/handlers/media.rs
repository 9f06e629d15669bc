use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};

use crate::error::{AppError, Result};
use crate::models::StorageId;
use crate::services::UploadService;
use crate::AppState;

/// Serve a stored blob (public). Blobs are immutable, so the cache policy
/// is maximal; the CORS headers let the gallery pages and the export
/// packager fetch from any origin.
/// GET /api/v1/media/:storage_id
pub async fn get_media(
    State(state): State<AppState>,
    Path(storage_id): Path<StorageId>,
) -> Result<Response> {
    let blob = UploadService::get_blob(&state.db, &storage_id).await?;
    let bytes = state.storage.get(storage_id.as_str()).await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, blob.content_type)
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .header("Cross-Origin-Resource-Policy", "cross-origin")
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

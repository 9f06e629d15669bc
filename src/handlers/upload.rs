use axum::{
    body::Bytes,
    extract::{Path, State},
    http::header,
    http::HeaderMap,
    Extension, Json,
};

use crate::error::{ApiResponse, Result};
use crate::models::{AuthSession, TransferResponse, UploadTargetResponse};
use crate::services::UploadService;
use crate::AppState;

/// Issue a one-time upload target
/// POST /api/v1/uploads
pub async fn issue_upload_target(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<ApiResponse<UploadTargetResponse>>> {
    let target =
        UploadService::issue_ticket(&state.db, &state.config, &session.external_id).await?;
    Ok(Json(ApiResponse::success(target)))
}

/// Transfer raw bytes to a previously issued target. The token in the path
/// is the capability; no session is required.
/// PUT /api/v1/uploads/:token
pub async fn transfer_bytes(
    State(state): State<AppState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<TransferResponse>>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let stored = UploadService::receive_bytes(
        &state.db,
        state.storage.as_ref(),
        &token,
        content_type,
        body,
    )
    .await?;

    Ok(Json(ApiResponse::success(stored)))
}

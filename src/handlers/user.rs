use axum::{extract::State, Extension, Json};

use crate::error::{ApiResponse, Result};
use crate::models::{AuthSession, PostResponse, RenameRequest, SyncProfileRequest, UserResponse, UserStats};
use crate::services::{PostService, UserService};
use crate::AppState;

/// Sync the signed-in guest's profile
/// POST /api/v1/users/sync
pub async fn sync_profile(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<SyncProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    // Token claims carry the provider's display name as a fallback
    let name = req.name.or(session.name);
    let profile =
        UserService::sync_profile(&state.db, &session.external_id, name, req.avatar_url).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// Get the current guest's profile
/// GET /api/v1/users/me
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let user = UserService::get_by_external_id(&state.db, &session.external_id).await?;
    Ok(Json(ApiResponse::success(UserResponse::from(user))))
}

/// Rename the current guest (backfills author names on their posts)
/// PUT /api/v1/users/me/name
pub async fn rename(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<ApiResponse<UserResponse>>> {
    let profile = UserService::rename(&state.db, &session.external_id, &req.name).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// Gallery stats for the current guest
/// GET /api/v1/users/me/stats
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<ApiResponse<UserStats>>> {
    let stats = PostService::user_stats(&state.db, &session.external_id).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// The current guest's posts
/// GET /api/v1/users/me/posts
pub async fn list_my_posts(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> Result<Json<ApiResponse<Vec<PostResponse>>>> {
    let posts = PostService::list_user_posts(&state.db, &session.external_id).await?;
    Ok(Json(ApiResponse::success(posts)))
}

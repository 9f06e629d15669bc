use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use crate::error::{ApiResponse, Result};
use crate::models::{AuthSession, CreatePostRequest, PostId, PostQuery, PostResponse, ToggleLikeResponse};
use crate::services::{PostService, UserService};
use crate::AppState;

/// List the feed
/// GET /api/v1/posts?sort_by=most_liked&search=ala
pub async fn list_posts(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<PostQuery>,
) -> Result<Json<ApiResponse<Vec<PostResponse>>>> {
    // Guests who never synced still see the feed, just without viewer flags
    let viewer = UserService::find_by_external_id(&state.db, &session.external_id)
        .await?
        .map(|u| u.id);
    let posts = PostService::list_posts(&state.db, viewer.as_ref(), &query).await?;
    Ok(Json(ApiResponse::success(posts)))
}

/// Create a post from an uploaded blob
/// POST /api/v1/posts
pub async fn create_post(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<ApiResponse<PostResponse>>> {
    let post = PostService::create_post(&state.db, &session.external_id, req).await?;
    Ok(Json(ApiResponse::success(post)))
}

/// Toggle a like on a post
/// POST /api/v1/posts/:id/like
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(post_id): Path<PostId>,
) -> Result<Json<ApiResponse<ToggleLikeResponse>>> {
    let result = PostService::toggle_like(&state.db, &session.external_id, &post_id).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// Delete one's own post
/// DELETE /api/v1/posts/:id
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(post_id): Path<PostId>,
) -> Result<Json<ApiResponse<()>>> {
    PostService::delete_post(
        &state.db,
        state.storage.as_ref(),
        &session.external_id,
        &post_id,
    )
    .await?;
    Ok(Json(ApiResponse::<()>::success_message("Post deleted")))
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::id::{PostId, StorageId, UserId};

/// Kind of media a post carries. Live photos are `Image` posts with a
/// companion video blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "video" => MediaKind::Video,
            _ => MediaKind::Image,
        }
    }
}

/// Post model
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub author_name: String,
    pub storage_id: StorageId,
    pub live_photo_video_id: Option<StorageId>,
    pub media_type: String,
    pub caption: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub created_at: String,
}

impl Post {
    pub fn kind(&self) -> MediaKind {
        MediaKind::from_str(&self.media_type)
    }
}

/// Post row annotated with the viewer-dependent like columns
#[derive(Debug, Clone, FromRow)]
pub struct PostWithMeta {
    #[sqlx(flatten)]
    pub post: Post,
    pub like_count: i64,
    pub liked_by_me: bool,
}

/// Post response with resolved media URLs
#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    pub id: PostId,
    pub author_name: String,
    pub media_type: String,
    pub caption: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub created_at: String,
    pub media_url: String,
    pub live_photo_video_url: Option<String>,
    pub like_count: i64,
    pub liked_by_me: bool,
    pub is_mine: bool,
}

impl PostResponse {
    pub fn from_meta(meta: PostWithMeta, viewer: Option<&UserId>) -> Self {
        let post = meta.post;
        Self {
            is_mine: viewer.is_some_and(|v| *v == post.author_id),
            media_url: format!("/api/v1/media/{}", post.storage_id),
            live_photo_video_url: post
                .live_photo_video_id
                .as_ref()
                .map(|id| format!("/api/v1/media/{}", id)),
            id: post.id,
            author_name: post.author_name,
            media_type: post.media_type,
            caption: post.caption,
            width: post.width,
            height: post.height,
            created_at: post.created_at,
            like_count: meta.like_count,
            liked_by_me: meta.liked_by_me,
        }
    }
}

/// Create post request. Also serialized by the upload pipeline's client, so
/// it derives both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub storage_id: StorageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_photo_video_id: Option<StorageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub media_type: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Feed sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Newest,
    MostLiked,
}

/// Feed query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PostQuery {
    #[serde(default)]
    pub sort_by: SortBy,
    pub search: Option<String>,
}

/// Like toggle result
#[derive(Debug, Clone, Serialize)]
pub struct ToggleLikeResponse {
    pub liked: bool,
    pub like_count: i64,
}

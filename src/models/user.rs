use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::id::UserId;

/// Guest profile model
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub external_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Guest profile response
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
        }
    }
}

/// Profile sync request (after sign-in with the identity provider)
#[derive(Debug, Deserialize)]
pub struct SyncProfileRequest {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Rename request
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// Per-guest gallery stats
#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub post_count: i64,
    pub likes_received: i64,
}

/// Verified session identity (extracted from the bearer token)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub external_id: String,
    pub name: Option<String>,
}

/// Session token claims minted by the identity provider
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // identity provider subject
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize, // expiration time
    pub iat: usize, // issued at
}

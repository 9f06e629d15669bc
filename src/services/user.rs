use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{User, UserId, UserResponse};

/// Fallback display name for guests whose identity provider profile has none.
const DEFAULT_GUEST_NAME: &str = "Party Guest";

/// User service
pub struct UserService;

impl UserService {
    /// Find a profile by the identity provider's subject
    pub async fn find_by_external_id(db: &Database, external_id: &str) -> Result<Option<User>> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE external_id = ?")
            .bind(external_id)
            .fetch_optional(db.pool())
            .await?;

        Ok(user)
    }

    /// Get a profile by the identity provider's subject, or fail
    pub async fn get_by_external_id(db: &Database, external_id: &str) -> Result<User> {
        Self::find_by_external_id(db, external_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not synced yet".to_string()))
    }

    /// Upsert the profile for a signed-in guest, keyed on the token subject.
    /// Called after every sign-in so name and avatar follow the provider.
    pub async fn sync_profile(
        db: &Database,
        external_id: &str,
        name: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<UserResponse> {
        let now = chrono::Utc::now().to_rfc3339();
        let name = match name.map(|n| n.trim().to_string()) {
            Some(n) if !n.is_empty() => n,
            _ => DEFAULT_GUEST_NAME.to_string(),
        };

        let existing = Self::find_by_external_id(db, external_id).await?;

        match existing {
            Some(user) => {
                sqlx::query("UPDATE users SET name = ?, avatar_url = ?, updated_at = ? WHERE id = ?")
                    .bind(&name)
                    .bind(&avatar_url)
                    .bind(&now)
                    .bind(&user.id)
                    .execute(db.pool())
                    .await?;
            }
            None => {
                let id = UserId::generate();
                sqlx::query(
                    r#"
                    INSERT INTO users (id, external_id, name, avatar_url, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&id)
                .bind(external_id)
                .bind(&name)
                .bind(&avatar_url)
                .bind(&now)
                .bind(&now)
                .execute(db.pool())
                .await?;
            }
        }

        let user = Self::get_by_external_id(db, external_id).await?;
        Ok(UserResponse::from(user))
    }

    /// Rename a guest and backfill the denormalized author name on all of
    /// their posts so old entries show the new name.
    pub async fn rename(db: &Database, external_id: &str, name: &str) -> Result<UserResponse> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > 50 {
            return Err(AppError::BadRequest(
                "Name must be between 1 and 50 characters".to_string(),
            ));
        }

        let user = Self::get_by_external_id(db, external_id).await?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query("UPDATE users SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(&now)
            .bind(&user.id)
            .execute(db.pool())
            .await?;

        sqlx::query("UPDATE posts SET author_name = ? WHERE author_id = ?")
            .bind(name)
            .bind(&user.id)
            .execute(db.pool())
            .await?;

        let user = Self::get_by_external_id(db, external_id).await?;
        Ok(UserResponse::from(user))
    }
}

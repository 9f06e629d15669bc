use bytes::Bytes;

use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{MediaBlob, StorageId, TransferResponse, UploadTargetResponse};
use crate::services::UserService;
use crate::storage::StorageProvider;

/// Upload service: one-time upload targets and blob registration
pub struct UploadService;

impl UploadService {
    /// Issue a one-time upload target for a signed-in guest. The returned
    /// relative URL is the capability; it expires after the configured TTL.
    pub async fn issue_ticket(
        db: &Database,
        config: &Config,
        external_id: &str,
    ) -> Result<UploadTargetResponse> {
        let user = UserService::get_by_external_id(db, external_id).await?;

        let now = chrono::Utc::now();
        // Sweep expired tickets while we are here
        sqlx::query("DELETE FROM upload_tickets WHERE expires_at <= ?")
            .bind(now.to_rfc3339())
            .execute(db.pool())
            .await?;

        let token = uuid::Uuid::new_v4().to_string();
        let expires_at = (now + chrono::Duration::minutes(config.storage.ticket_ttl_minutes as i64))
            .to_rfc3339();

        sqlx::query(
            "INSERT INTO upload_tickets (token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(&user.id)
        .bind(&expires_at)
        .bind(now.to_rfc3339())
        .execute(db.pool())
        .await?;

        Ok(UploadTargetResponse {
            upload_url: format!("/api/v1/uploads/{}", token),
            expires_at,
        })
    }

    /// Consume a ticket and store the transferred bytes. The conditional
    /// DELETE spends the token exactly once, so a replayed or expired
    /// transfer cannot produce a second blob.
    pub async fn receive_bytes(
        db: &Database,
        storage: &dyn StorageProvider,
        token: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<TransferResponse> {
        let now = chrono::Utc::now().to_rfc3339();

        let consumed = sqlx::query("DELETE FROM upload_tickets WHERE token = ? AND expires_at > ?")
            .bind(token)
            .bind(&now)
            .execute(db.pool())
            .await?
            .rows_affected();

        if consumed == 0 {
            return Err(AppError::NotFound(
                "Upload target expired or already used".to_string(),
            ));
        }

        if data.is_empty() {
            return Err(AppError::BadRequest("Empty upload body".to_string()));
        }

        let storage_id = StorageId::generate();
        let size = data.len() as i64;
        storage.put(storage_id.as_str(), data).await?;

        sqlx::query(
            "INSERT INTO media_blobs (storage_id, content_type, size, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&storage_id)
        .bind(content_type)
        .bind(size)
        .bind(&now)
        .execute(db.pool())
        .await?;

        tracing::debug!(
            "Stored blob {} ({} bytes, {})",
            storage_id,
            size,
            content_type
        );

        Ok(TransferResponse { storage_id })
    }

    /// Fetch blob metadata for the media endpoint
    pub async fn get_blob(db: &Database, storage_id: &StorageId) -> Result<MediaBlob> {
        let blob: MediaBlob = sqlx::query_as("SELECT * FROM media_blobs WHERE storage_id = ?")
            .bind(storage_id)
            .fetch_optional(db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("Media not found".to_string()))?;

        Ok(blob)
    }
}

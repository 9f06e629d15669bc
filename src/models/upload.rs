use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::id::StorageId;

/// One-time upload target. The relative `upload_url` is the capability:
/// whoever PUTs bytes to it before `expires_at` consumes the ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadTargetResponse {
    pub upload_url: String,
    pub expires_at: String,
}

/// Byte transfer result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResponse {
    pub storage_id: StorageId,
}

/// Stored blob metadata
#[derive(Debug, Clone, FromRow)]
pub struct MediaBlob {
    pub storage_id: StorageId,
    pub content_type: String,
    pub size: i64,
    pub created_at: String,
}

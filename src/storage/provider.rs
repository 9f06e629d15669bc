use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Storage provider trait. Blobs are addressed by their storage id; the
/// provider never sees post or user identifiers.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Upload data to storage
    async fn put(&self, path: &str, data: Bytes) -> Result<()>;

    /// Download data from storage
    async fn get(&self, path: &str) -> Result<Bytes>;

    /// Delete data from storage
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check if a blob exists
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Get the storage type name
    fn storage_type(&self) -> &'static str;
}

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::StorageProvider;

/// Local file system storage provider. Blobs are flat files named by their
/// storage id under the base directory.
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: PathBuf::from(base_path),
        }
    }

    fn get_full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

#[async_trait]
impl StorageProvider for LocalStorage {
    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let full_path = self.get_full_path(path);

        // Ensure parent directory exists
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create directory: {}", e)))?;
        }

        // Write file
        let mut file = fs::File::create(&full_path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create file: {}", e)))?;
        file.write_all(&data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write file: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to flush file: {}", e)))?;

        tracing::debug!("Saved blob to {:?}", full_path);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Bytes> {
        let full_path = self.get_full_path(path);

        let data = fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("Blob not found: {}", path))
            } else {
                AppError::Storage(format!("Failed to read blob: {}", e))
            }
        })?;

        Ok(Bytes::from(data))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.get_full_path(path);

        if full_path.exists() {
            fs::remove_file(&full_path)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to delete blob: {}", e)))?;
            tracing::debug!("Deleted blob {:?}", full_path);
        }

        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full_path = self.get_full_path(path);
        Ok(full_path.exists())
    }

    fn storage_type(&self) -> &'static str {
        "local"
    }
}

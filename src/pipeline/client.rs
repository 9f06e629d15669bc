use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::ApiResponse;
use crate::models::{CreatePostRequest, PostId, StorageId, TransferResponse, UploadTargetResponse};

use super::error::{FetchError, UploadError};

/// The slice of a created post the pipeline needs back
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPost {
    pub id: PostId,
}

/// Backend operations the upload sequencer drives. Implemented over HTTP
/// by [`HttpGalleryClient`] and by in-memory fakes in tests.
#[async_trait]
pub trait GalleryApi: Send + Sync {
    async fn issue_upload_target(&self) -> Result<UploadTargetResponse, UploadError>;

    async fn transfer_bytes(
        &self,
        upload_url: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StorageId, UploadError>;

    async fn create_post(&self, request: &CreatePostRequest) -> Result<CreatedPost, UploadError>;
}

/// Blob retrieval seam for the export packager
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// Talks to a gallery server over its JSON API
#[derive(Debug, Clone)]
pub struct HttpGalleryClient {
    http: reqwest::Client,
    base_url: String,
    session_token: String,
}

impl HttpGalleryClient {
    pub fn new(base_url: impl Into<String>, session_token: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token: session_token.into(),
        }
    }

    /// The server hands out relative URLs; join them onto the configured origin
    fn absolute(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}{}", self.base_url, url)
        }
    }
}

/// Pull the short error message out of an envelope, falling back to the status
async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<ApiResponse<serde_json::Value>>().await {
        Ok(body) if !body.message.is_empty() => body.message,
        _ => format!("HTTP {}", status),
    }
}

async fn decode_data<T>(response: reqwest::Response) -> Result<T, String>
where
    T: serde::de::DeserializeOwned,
{
    let body: ApiResponse<T> = response.json().await.map_err(|e| e.to_string())?;
    body.data.ok_or_else(|| "Response carried no data".to_string())
}

#[async_trait]
impl GalleryApi for HttpGalleryClient {
    async fn issue_upload_target(&self) -> Result<UploadTargetResponse, UploadError> {
        let response = self
            .http
            .post(format!("{}/api/v1/uploads", self.base_url))
            .bearer_auth(&self.session_token)
            .send()
            .await
            .map_err(|e| UploadError::TargetUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UploadError::TargetUnavailable(error_message(response).await));
        }
        decode_data(response).await.map_err(UploadError::TargetUnavailable)
    }

    async fn transfer_bytes(
        &self,
        upload_url: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<StorageId, UploadError> {
        // The ticket in the URL is the credential; no bearer token here
        let response = self
            .http
            .put(self.absolute(upload_url))
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| UploadError::TransferFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UploadError::TransferFailed(error_message(response).await));
        }
        let transfer: TransferResponse = decode_data(response)
            .await
            .map_err(UploadError::TransferFailed)?;
        Ok(transfer.storage_id)
    }

    async fn create_post(&self, request: &CreatePostRequest) -> Result<CreatedPost, UploadError> {
        let response = self
            .http
            .post(format!("{}/api/v1/posts", self.base_url))
            .bearer_auth(&self.session_token)
            .json(request)
            .send()
            .await
            .map_err(|e| UploadError::TransferFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(match status {
                StatusCode::UNAUTHORIZED => UploadError::Unauthorized(message),
                StatusCode::NOT_FOUND => UploadError::AuthorNotFound(message),
                _ => UploadError::TransferFailed(message),
            });
        }
        decode_data(response).await.map_err(UploadError::TransferFailed)
    }
}

#[async_trait]
impl MediaFetcher for HttpGalleryClient {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self
            .http
            .get(self.absolute(url))
            .send()
            .await
            .map_err(|e| FetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError(format!("HTTP {}", response.status())));
        }
        response.bytes().await.map_err(|e| FetchError(e.to_string()))
    }
}

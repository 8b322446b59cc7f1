use std::path::Path;

use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Destination coordinates inside the remote store, built fresh per call
/// from injected configuration.
#[derive(Debug, Clone, Serialize)]
pub struct UploadDestination {
    pub project_id: String,
    pub folder_id: String,
}

/// The storage service's own response shape, snake_case on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageUploadResponse {
    #[serde(default)]
    pub status_code: Option<i32>,
    #[serde(default)]
    pub message: Option<String>,
    pub url: String,
    pub file_id: String,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read encoded file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("encoded file is {size} bytes, over the {max} byte upload limit")]
    TooLarge { size: usize, max: usize },
    #[error("failed to encode upload descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),
    #[error("upload request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("storage service returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("remote file {file_id} not found")]
    NotFound { file_id: String },
    #[error("delete request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("storage service returned status {status}")]
    Status { status: StatusCode },
}

#[async_trait]
pub trait StorageApi: Send + Sync + 'static {
    /// Uploads the file as one multipart request; the remote service is the
    /// source of truth for the returned `url` and `file_id`.
    async fn upload(
        &self,
        file: &Path,
        destination: &UploadDestination,
    ) -> Result<StorageUploadResponse, UploadError>;

    /// Deletes a remote object. Not retried; a remote 404 surfaces as
    /// `DeleteError::NotFound`.
    async fn delete(&self, project_id: &str, file_id: &str) -> Result<(), DeleteError>;
}

pub struct HttpStorageApi {
    client: Client,
    base_url: String,
    max_body_bytes: usize,
}

impl HttpStorageApi {
    pub fn new(client: Client, base_url: impl Into<String>, max_body_bytes: usize) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            max_body_bytes,
        }
    }
}

#[async_trait]
impl StorageApi for HttpStorageApi {
    async fn upload(
        &self,
        file: &Path,
        destination: &UploadDestination,
    ) -> Result<StorageUploadResponse, UploadError> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|source| UploadError::Io {
                path: file.display().to_string(),
                source,
            })?;
        if bytes.len() > self.max_body_bytes {
            return Err(UploadError::TooLarge {
                size: bytes.len(),
                max: self.max_body_bytes,
            });
        }

        let descriptor = serde_json::to_string(destination)?;
        let form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(bytes)
                    .file_name("qr-code.png")
                    .mime_str("application/octet-stream")?,
            )
            .part(
                "uploadFileRequest",
                multipart::Part::text(descriptor).mime_str("application/json")?,
            );

        let response = self
            .client
            .post(format!("{}/v1/google-drive/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Status { status, body });
        }

        Ok(response.json().await?)
    }

    async fn delete(&self, project_id: &str, file_id: &str) -> Result<(), DeleteError> {
        let response = self
            .client
            .delete(format!(
                "{}/v1/google-drive/resources/{}/delete/{}",
                self.base_url, project_id, file_id
            ))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::NOT_FOUND {
            Err(DeleteError::NotFound {
                file_id: file_id.to_string(),
            })
        } else {
            Err(DeleteError::Status { status })
        }
    }
}

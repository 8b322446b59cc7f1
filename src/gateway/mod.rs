use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

pub mod shortener;
pub mod storage;

pub use shortener::{HttpShortener, ShortenError, ShortenerApi};
pub use storage::{
    DeleteError, HttpStorageApi, StorageApi, StorageUploadResponse, UploadDestination, UploadError,
};

pub fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build outbound HTTP client")
}

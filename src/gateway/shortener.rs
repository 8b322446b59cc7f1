use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShortenError {
    #[error("shorten request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("shortener returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

/// Pure pass-through: the long URL goes out as the request body, the
/// response body comes back as the short URL. No local validation.
#[async_trait]
pub trait ShortenerApi: Send + Sync + 'static {
    async fn shorten(&self, long_url: &str) -> Result<String, ShortenError>;
}

pub struct HttpShortener {
    client: Client,
    base_url: String,
}

impl HttpShortener {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ShortenerApi for HttpShortener {
    async fn shorten(&self, long_url: &str) -> Result<String, ShortenError> {
        let response = self
            .client
            .post(format!("{}/shorten", self.base_url))
            .body(long_url.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ShortenError::Status { status, body });
        }

        Ok(response.text().await?)
    }
}

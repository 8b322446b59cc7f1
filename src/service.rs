use chrono::{Months, NaiveDateTime, Utc};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::task;
use tracing::info;

use crate::encoder::{
    self, ColorParseError, EncodeError, Logo, LogoLoadError, LogoStyle, QrStyle,
    DEFAULT_BACKGROUND, DEFAULT_FOREGROUND, DEFAULT_SIZE,
};
use crate::gateway::{DeleteError, ShortenError, StorageUploadResponse, UploadDestination, UploadError};
use crate::models::{NewQrCode, QrCode};
use crate::state::AppState;
use crate::store::{self, StoreError};

#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub text: String,
    pub foreground_color: Option<String>,
    pub background_color: Option<String>,
    pub logo_path: Option<String>,
    pub logo_style: LogoStyle,
}

impl GenerateParams {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            foreground_color: None,
            background_color: None,
            logo_path: None,
            logo_style: LogoStyle::default(),
        }
    }
}

pub struct GeneratedLink {
    pub png: Vec<u8>,
    pub url: String,
    pub upload: StorageUploadResponse,
    pub record: QrCode,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid color: {0}")]
    Color(#[from] ColorParseError),
    #[error("failed to load logo: {0}")]
    Logo(#[from] LogoLoadError),
    #[error("failed to encode QR code: {0}")]
    Encode(#[from] EncodeError),
    #[error("encoding task panicked: {0}")]
    TaskPanicked(#[from] task::JoinError),
}

#[derive(Debug, Error)]
pub enum GenerationLinkError {
    #[error("failed to encode QR code: {0}")]
    Encode(#[from] EncodeError),
    #[error("encoding task panicked: {0}")]
    TaskPanicked(#[from] task::JoinError),
    #[error("failed to upload QR code image: {0}")]
    Upload(#[from] UploadError),
    #[error("failed to shorten URL: {0}")]
    Shorten(#[from] ShortenError),
    #[error("failed to persist QR code record: {0}")]
    Store(#[from] StoreError),
    #[error("failed to read back encoded file: {0}")]
    Io(#[from] std::io::Error),
    #[error("database pool unavailable: {0}")]
    Pool(String),
}

#[derive(Debug, Error)]
pub enum DeleteQrCodeError {
    #[error("QR code {file_id} not found")]
    NotFound { file_id: String },
    #[error("failed to delete remote file: {0}")]
    Remote(#[from] DeleteError),
    #[error("failed to persist QR code record: {0}")]
    Store(#[from] StoreError),
    #[error("database pool unavailable: {0}")]
    Pool(String),
}

/// Generates QR code PNG bytes, with optional styling and logo overlay.
/// Encoding runs on the blocking pool so the request task never stalls on
/// CPU-bound pixel work.
pub async fn generate(params: GenerateParams) -> Result<Vec<u8>, GenerationError> {
    let style = QrStyle {
        foreground: parse_color_or(params.foreground_color.as_deref(), DEFAULT_FOREGROUND)?,
        background: parse_color_or(params.background_color.as_deref(), DEFAULT_BACKGROUND)?,
    };

    let logo = match params.logo_path.as_deref() {
        Some(location) => Some(Logo {
            bytes: encoder::fetch_logo(location).await?,
            style: params.logo_style,
        }),
        None => None,
    };

    let text = params.text;
    let bytes = task::spawn_blocking(move || {
        encoder::encode_png(&text, DEFAULT_SIZE, DEFAULT_SIZE, &style, logo.as_ref())
    })
    .await??;
    Ok(bytes)
}

/// Encodes `text` with the default visual into a caller-owned temp file.
pub async fn generate_to_file(text: &str) -> Result<NamedTempFile, GenerationError> {
    let text = text.to_string();
    let file =
        task::spawn_blocking(move || encoder::encode_to_temp_file(&text, DEFAULT_SIZE, DEFAULT_SIZE))
            .await??;
    Ok(file)
}

/// The full chain: encode to a temp file, upload it, shorten the returned
/// URL when a shortener is wired, persist the record, and read the encoded
/// image back for the response. Any failure aborts the chain; a completed
/// upload is not rolled back when a later step fails.
pub async fn generate_link(
    state: &AppState,
    text: &str,
) -> Result<GeneratedLink, GenerationLinkError> {
    let owned_text = text.to_string();
    let file = task::spawn_blocking(move || {
        encoder::encode_to_temp_file(&owned_text, DEFAULT_SIZE, DEFAULT_SIZE)
    })
    .await??;

    let destination = UploadDestination {
        project_id: state.config.storage_project_id.clone(),
        folder_id: state.config.storage_folder_id.clone(),
    };
    let upload = state.storage.upload(file.path(), &destination).await?;

    let url = match &state.shortener {
        Some(shortener) => shortener.shorten(&upload.url).await?,
        None => upload.url.clone(),
    };

    let now = Utc::now().naive_utc();
    let record = {
        let mut conn = state
            .db()
            .map_err(|err| GenerationLinkError::Pool(format!("{err:?}")))?;
        store::insert_record(
            &mut conn,
            NewQrCode {
                url: url.clone(),
                file_id: upload.file_id.clone(),
                is_active: true,
                expiration_date: expiration_from(now),
            },
        )?
    };

    let png = tokio::fs::read(file.path()).await?;
    info!(file_id = %record.file_id, url = %record.url, "generated QR code link");

    Ok(GeneratedLink {
        png,
        url,
        upload,
        record,
    })
}

/// Two-phase delete: the remote file goes first, and the local soft-delete
/// is skipped entirely when the remote side fails.
pub async fn delete(state: &AppState, file_id: &str) -> Result<(), DeleteQrCodeError> {
    info!(file_id = %file_id, "deleting QR code");

    let record = {
        let mut conn = state
            .db()
            .map_err(|err| DeleteQrCodeError::Pool(format!("{err:?}")))?;
        store::find_active_by_file_id(&mut conn, file_id)?
    }
    .ok_or_else(|| DeleteQrCodeError::NotFound {
        file_id: file_id.to_string(),
    })?;

    state
        .storage
        .delete(&state.config.storage_project_id, file_id)
        .await?;

    let now = Utc::now().naive_utc();
    let mut conn = state
        .db()
        .map_err(|err| DeleteQrCodeError::Pool(format!("{err:?}")))?;
    store::update_record(&mut conn, &record.soft_deleted(now))?;
    Ok(())
}

pub fn expiration_from(now: NaiveDateTime) -> NaiveDateTime {
    now.checked_add_months(Months::new(1))
        .unwrap_or_else(|| now + chrono::Duration::days(31))
}

fn parse_color_or(input: Option<&str>, default: u32) -> Result<u32, ColorParseError> {
    match input {
        Some(value) => encoder::parse_hex_color(value),
        None => Ok(default),
    }
}

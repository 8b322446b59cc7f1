use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::encoder::LogoStyle;
use crate::error::AppResult;
use crate::gateway::StorageUploadResponse;
use crate::service::{self, GenerateParams};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateQrCodeRequest {
    pub text: String,
    pub foreground_color: Option<String>,
    pub background_color: Option<String>,
    pub logo_path: Option<String>,
    #[serde(default)]
    pub logo_style: LogoStyle,
}

#[derive(Debug, Deserialize)]
pub struct TextQuery {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub file_id: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateQrCodeLinkResponse {
    pub qr_code: String,
    pub url: String,
}

pub async fn generate(
    Json(payload): Json<GenerateQrCodeRequest>,
) -> AppResult<impl IntoResponse> {
    let bytes = service::generate(GenerateParams {
        text: payload.text,
        foreground_color: payload.foreground_color,
        background_color: payload.background_color,
        logo_path: payload.logo_path,
        logo_style: payload.logo_style,
    })
    .await?;
    Ok(png_response(bytes))
}

pub async fn generate_get(Query(query): Query<TextQuery>) -> AppResult<impl IntoResponse> {
    let bytes = service::generate(GenerateParams::plain(query.text)).await?;
    Ok(png_response(bytes))
}

pub async fn generate_link(
    State(state): State<AppState>,
    Json(payload): Json<GenerateQrCodeRequest>,
) -> AppResult<Json<GenerateQrCodeLinkResponse>> {
    let link = service::generate_link(&state, &payload.text).await?;
    Ok(Json(GenerateQrCodeLinkResponse {
        qr_code: format!("data:image/png;base64,{}", STANDARD.encode(&link.png)),
        url: link.url,
    }))
}

/// Same pipeline as the POST variant, answering with the storage service's
/// own response shape.
pub async fn generate_link_get(
    State(state): State<AppState>,
    Query(query): Query<TextQuery>,
) -> AppResult<Json<StorageUploadResponse>> {
    let link = service::generate_link(&state, &query.text).await?;
    Ok(Json(link.upload))
}

pub async fn download(Query(query): Query<TextQuery>) -> AppResult<impl IntoResponse> {
    let file = service::generate_to_file(&query.text).await?;
    let bytes = tokio::fs::read(file.path()).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"qr-code.png\"".to_string(),
            ),
        ],
        bytes,
    ))
}

pub async fn delete_qr_code(
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<StatusCode> {
    service::delete(&state, &query.file_id).await?;
    Ok(StatusCode::OK)
}

fn png_response(bytes: Vec<u8>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], bytes)
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;

use crate::service::{DeleteQrCodeError, GenerationError, GenerationLinkError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn bad_gateway<E: Display>(error: E) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, error.to_string())
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<GenerationError> for AppError {
    fn from(value: GenerationError) -> Self {
        match value {
            GenerationError::Color(err) => AppError::bad_request(err.to_string()),
            GenerationError::Logo(err) => AppError::bad_request(err.to_string()),
            other => AppError::internal(other),
        }
    }
}

impl From<GenerationLinkError> for AppError {
    fn from(value: GenerationLinkError) -> Self {
        match value {
            GenerationLinkError::Upload(err) => AppError::bad_gateway(err),
            GenerationLinkError::Shorten(err) => AppError::bad_gateway(err),
            other => AppError::internal(other),
        }
    }
}

impl From<DeleteQrCodeError> for AppError {
    fn from(value: DeleteQrCodeError) -> Self {
        match value {
            DeleteQrCodeError::NotFound { .. } => AppError::not_found(),
            DeleteQrCodeError::Remote(err) => AppError::bad_gateway(err),
            other => AppError::internal(other),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::internal(value)
    }
}

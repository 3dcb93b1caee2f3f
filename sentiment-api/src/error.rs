//! Error types for the sentiment API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::ingest::IngestError;

/// Result type alias for the API.
pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Upload could not be turned into reviews.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Request is well-formed HTTP but unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// The multipart stream broke while reading the upload.
    #[error("Failed to read upload: {0}")]
    UploadRead(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Server error: {0}")]
    Server(String),
}

/// Error response body for HTTP endpoints.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Ingest(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UploadRead(_) | Self::Configuration(_) | Self::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Ingest(IngestError::UnsupportedFormat(_)) => "INVALID_FILE_FORMAT",
            Self::Ingest(_) | Self::InvalidInput(_) => "INVALID_INPUT",
            Self::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            Self::UploadRead(_) => "UPLOAD_READ_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Server(_) => "SERVER_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, details) = match &self {
            Self::Ingest(e) => {
                tracing::warn!(error = %e, "Rejected upload");
                (e.to_string(), None)
            }
            Self::InvalidInput(msg) | Self::PayloadTooLarge(msg) => (msg.clone(), None),
            Self::UploadRead(msg) => {
                tracing::error!(error = %msg, "Upload read error");
                ("Failed to read uploaded file".to_string(), Some(msg.clone()))
            }
            Self::Configuration(msg) | Self::Server(msg) => (msg.clone(), None),
        };

        let body = ErrorResponse {
            error: message,
            code: self.code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

// Shared enums and the HTTP-facing error type

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::relay::RelayError;
use crate::storage::StorageError;

/// Per-file progress shown by every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Success,
    Failure,
}

impl UploadStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, UploadStatus::Success | UploadStatus::Failure)
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStatus::Idle => write!(f, "idle"),
            UploadStatus::Uploading => write!(f, "uploading"),
            UploadStatus::Success => write!(f, "success"),
            UploadStatus::Failure => write!(f, "failure"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Form parsing error: {0}")]
    FormParse(String),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Too many requests")]
    RateLimited,
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "message": message }))
            }
            AppError::Storage(e) => {
                error!(error = %e, "Error generating signed URL");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Failed to generate signed URL" }),
                )
            }
            AppError::FormParse(e) => {
                error!(error = %e, "Error parsing form");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": "Error parsing form data." }),
                )
            }
            AppError::Relay(e) => {
                error!(error = %e, "Relay request failed");
                (StatusCode::BAD_GATEWAY, json!({ "message": e.to_string() }))
            }
            AppError::Unavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, json!({ "message": message }))
            }
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "message": "Too many requests, slow down" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Fixed message for an inference response that is not the expected
/// two-image result. Surfaced verbatim so callers can tell an upstream
/// contract change apart from a transient failure.
pub const UNEXPECTED_FORMAT_MESSAGE: &str =
    "Unexpected response format from inference service. Expected two output images.";

/// Fixed message when the storage client was never initialized (missing
/// endpoint or key at startup).
pub const STORAGE_UNAVAILABLE_MESSAGE: &str =
    "Storage client not initialized. Cannot upload files. Check server configuration.";

/// Failure taxonomy for a single try-on request. Each request either
/// succeeds fully or surfaces exactly one of these to the caller; nothing
/// is retried.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or empty required request fields.
    #[error("{0}")]
    Validation(String),

    /// An input image could not be fetched from its origin.
    #[error("{0}")]
    Download(String),

    /// The inference call itself failed (transport, HTTP, or upload error).
    #[error("{0}")]
    Inference(String),

    /// The inference call succeeded but did not return two output images.
    #[error("{UNEXPECTED_FORMAT_MESSAGE}")]
    UnexpectedResponseFormat,

    /// Publishing is disabled because storage was not configured at startup.
    #[error("{STORAGE_UNAVAILABLE_MESSAGE}")]
    StorageUnavailable,

    /// The storage backend rejected or failed an upload.
    #[error("{0}")]
    Upload(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn download(message: impl Into<String>) -> Self {
        Self::Download(message.into())
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Download(_)
            | Self::Inference(_)
            | Self::UnexpectedResponseFormat
            | Self::StorageUnavailable
            | Self::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

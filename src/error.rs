//! Error types for the upload gateway
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// The first five variants are the storage/credential taxonomy. The rest
/// only exist at the HTTP surface.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid settings, detected before any network call (500)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Credential rejected or connectivity probe failed (500)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Object absent from the bucket (404)
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Storage used before credentials were resolved (503)
    #[error("Storage is not initialized")]
    NotReady,

    /// Any other failure from the storage or secret manager API (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uploaded file exceeds the configured cap (413)
    #[error("File too large: exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Collapsed storage failure reported to clients (500)
    #[error("{0}")]
    Storage(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "configuration",
            AppError::Authentication(_) => "authentication",
            AppError::NotFound(_) => "not_found",
            AppError::NotReady => "not_ready",
            AppError::Upstream(_) => "upstream",
            AppError::Validation(_) => "validation",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::Storage(_) => "storage",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "File not found".to_string()),
            AppError::NotReady => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()),
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, "Upstream error".to_string()),
            AppError::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Configuration(_) | AppError::Authentication(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[self.kind()])
            .inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

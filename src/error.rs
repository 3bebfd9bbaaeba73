//! Error types for mailbridge.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for mailbridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mailbridge.
///
/// Upstream variants carry a generic, client-safe message; the raw upstream
/// status and body are logged at the call site, never returned to the caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Access token is required")]
    MissingToken,

    #[error("{0}")]
    BadRequest(String),

    #[error("Mail provider request failed: {0}")]
    Graph(String),

    #[error("Text generation failed: {0}")]
    GenAi(String),

    #[error("CRM request failed: {0}")]
    Crm(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::MissingToken => StatusCode::UNAUTHORIZED,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Config(_)
            | Error::Graph(_)
            | Error::GenAi(_)
            | Error::Crm(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "message": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}

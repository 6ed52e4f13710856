use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Top-level server error. Upstream variants share one generic message so
/// provider details only ever reach the log.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Relay request errors ─────────────────────────────────────────────────
    #[error("Invalid messages format")]
    InvalidMessages,

    // ── Upstream provider errors ─────────────────────────────────────────────
    #[error("Failed to get response from GROQ API")]
    UpstreamUnavailable(#[source] reqwest::Error),

    #[error("Failed to get response from GROQ API")]
    UpstreamStatus { status: u16, body: String },

    #[error("Failed to get response from GROQ API")]
    UpstreamDecode(#[source] serde_json::Error),

    // ── Database errors ──────────────────────────────────────────────────────
    #[error("Database connection failed: {0}")]
    DatabaseConnectionFailed(#[source] sqlx::Error),

    #[error("Database query failed: {message}")]
    DatabaseQueryFailed {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    // ── Store request errors ─────────────────────────────────────────────────
    #[error("Invalid message body: {message}")]
    InvalidBody { message: String },

    // ── Access errors ────────────────────────────────────────────────────────
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    // ── Configuration errors ─────────────────────────────────────────────────
    #[error("Environment variable '{name}' must be set")]
    MissingConfig { name: String },

    #[error("Environment variable '{name}' is invalid: {value}")]
    InvalidConfig { name: String, value: String },
}

impl AppError {
    pub fn db_query(message: impl Into<String>, source: sqlx::Error) -> Self {
        AppError::DatabaseQueryFailed { message: message.into(), source }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized { message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidBody { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            // The relay contract answers every failure with a 500.
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chat_core::session::user_id_from_token;
use chat_core::NewMessage;
use tracing::warn;

use crate::db::message_repository::MessageRepository;
use crate::errors::AppError;

/// GET `/rest/v1/messages` — the caller's rows, oldest first
pub async fn list_messages_handler(
    State(repo): State<MessageRepository>,
    headers: HeaderMap,
) -> Response {
    let user_id = match bearer_user(&headers) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match repo.find_by_user(&user_id).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST `/rest/v1/messages` — single-row insert for the caller
pub async fn insert_message_handler(
    State(repo): State<MessageRepository>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let user_id = match bearer_user(&headers) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let message: NewMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => return AppError::InvalidBody { message: e.to_string() }.into_response(),
    };

    if message.user_id != user_id {
        warn!("Rejected insert for {} from {user_id}", message.user_id);
        return AppError::Forbidden {
            message: "user_id does not match the session".to_string(),
        }
        .into_response();
    }

    match repo.save(message).await {
        Ok(row) => (StatusCode::CREATED, Json(row)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Resolves the user behind a `Bearer` access token.
pub fn bearer_user(headers: &HeaderMap) -> Result<String, AppError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

    user_id_from_token(token).map_err(|e| AppError::unauthorized(e.to_string()))
}

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::error;

use crate::errors::AppError;
use crate::relay::GroqClient;

/// `/functions/v1/chat` — forwards `{"messages": [...]}` to the provider.
///
/// `OPTIONS` answers immediately with an empty 200; every other method is
/// handled like `POST`.
pub async fn chat_handler(
    State(provider): State<GroqClient>,
    method: Method,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    match relay(&provider, &body).await {
        Ok(data) => ([(CONTENT_TYPE, "application/json")], data).into_response(),
        Err(e) => {
            error!("Error in chat function: {e}");
            e.into_response()
        }
    }
}

async fn relay(provider: &GroqClient, body: &[u8]) -> Result<Bytes, AppError> {
    let messages = parse_messages(body)?;
    provider.complete(&messages).await
}

/// Accepts any JSON object whose `messages` field is an array. Entries are
/// passed upstream as received.
pub fn parse_messages(body: &[u8]) -> Result<Vec<Value>, AppError> {
    let mut value: Value = serde_json::from_slice(body).map_err(|_| AppError::InvalidMessages)?;
    match value.get_mut("messages").map(Value::take) {
        Some(Value::Array(messages)) => Ok(messages),
        _ => Err(AppError::InvalidMessages),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_message_array() {
        let messages =
            parse_messages(br#"{"messages":[{"role":"user","content":"hi"}]}"#).unwrap();
        assert_eq!(messages, vec![json!({"role": "user", "content": "hi"})]);
    }

    #[test]
    fn entries_keep_every_field_and_role() {
        let messages = parse_messages(
            br#"{"messages":[
                {"role":"user","content":"hi","name":"bob"},
                {"role":"tool","tool_call_id":"call_1","content":"42"},
                {"role":"user","content":[{"type":"text","text":"hi"}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(messages[0]["name"], "bob");
        assert_eq!(messages[1]["role"], "tool");
        assert_eq!(messages[1]["tool_call_id"], "call_1");
        assert!(messages[2]["content"].is_array());
    }

    #[test]
    fn rejects_missing_or_non_array_messages() {
        let bodies: [&[u8]; 5] = [
            br#"{"messages":"not-an-array"}"#,
            br#"{"prompt":"hi"}"#,
            br#"{"messages":null}"#,
            b"",
            b"not json",
        ];
        for body in bodies {
            assert!(matches!(parse_messages(body), Err(AppError::InvalidMessages)));
        }
    }

    #[test]
    fn empty_array_is_accepted() {
        assert!(parse_messages(br#"{"messages":[]}"#).unwrap().is_empty());
    }
}

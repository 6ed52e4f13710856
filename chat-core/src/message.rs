use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChatError;

/// One entry of the visible thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub is_ai: bool,
}

/// Which side of the thread a message is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    User,
    Assistant,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_ai: false }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_ai: true }
    }

    pub fn role(&self) -> Role {
        if self.is_ai { Role::Assistant } else { Role::User }
    }

    pub fn side(&self) -> Side {
        if self.is_ai { Side::Assistant } else { Side::User }
    }
}

impl From<StoredMessage> for Message {
    fn from(row: StoredMessage) -> Self {
        Self {
            text: row.content,
            is_ai: row.is_ai.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single `{role, content}` entry sent to the completion provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub role: Role,
    pub content: String,
}

impl CompletionMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

impl From<&Message> for CompletionMessage {
    fn from(m: &Message) -> Self {
        Self::new(m.role(), m.text.clone())
    }
}

/// Request body accepted by the completion relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRequest {
    pub messages: Vec<CompletionMessage>,
}

/// Replays the whole visible thread followed by the new user text.
pub fn history_payload(prior: &[Message], new_text: &str) -> Vec<CompletionMessage> {
    prior
        .iter()
        .map(CompletionMessage::from)
        .chain(std::iter::once(CompletionMessage::new(Role::User, new_text)))
        .collect()
}

/// Pulls `choices[0].message.content` out of a raw provider response.
pub fn first_choice_content(response: &Value) -> Result<String, ChatError> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ChatError::MalformedResponse {
            message: "missing choices[0].message.content".to_string(),
        })
}

/// A persisted row, as read back from the message store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub content: String,
    #[serde(default)]
    pub is_ai: Option<bool>,
    pub user_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Single-row insert body for the message store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub content: String,
    pub is_ai: bool,
    pub user_id: String,
}

impl NewMessage {
    pub fn new(message: &Message, user_id: &str) -> Self {
        Self {
            content: message.text.clone(),
            is_ai: message.is_ai,
            user_id: user_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn history_payload_maps_roles_and_appends_new_text() {
        let prior = vec![Message::user("A"), Message::assistant("B")];
        let payload = history_payload(&prior, "C");
        assert_eq!(
            payload,
            vec![
                CompletionMessage::new(Role::User, "A"),
                CompletionMessage::new(Role::Assistant, "B"),
                CompletionMessage::new(Role::User, "C"),
            ]
        );
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(CompletionMessage::new(Role::Assistant, "x")).unwrap();
        assert_eq!(json, json!({"role": "assistant", "content": "x"}));
        assert_eq!(serde_json::to_value(Role::System).unwrap(), json!("system"));
    }

    #[test]
    fn first_choice_content_extracts_text() {
        let response = json!({"choices": [{"message": {"content": "hello"}}]});
        assert_eq!(first_choice_content(&response).unwrap(), "hello");
    }

    #[test]
    fn first_choice_content_rejects_empty_choices() {
        let err = first_choice_content(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, ChatError::MalformedResponse { .. }));
    }

    #[test]
    fn stored_row_without_flag_is_user_authored() {
        let row: StoredMessage =
            serde_json::from_value(json!({"content": "hi", "is_ai": null, "user_id": "u1"}))
                .unwrap();
        assert_eq!(Message::from(row), Message::user("hi"));
    }
}

use chat_core::NewMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of the `messages` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub content: String,
    pub is_ai: Option<bool>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl MessageRow {
    pub fn new(message: NewMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: message.content,
            is_ai: Some(message.is_ai),
            user_id: message.user_id,
            created_at: Utc::now(),
        }
    }
}

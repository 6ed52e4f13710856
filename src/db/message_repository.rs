use chat_core::NewMessage;
use sqlx::PgPool;
use tracing::error;

use crate::errors::AppError;
use crate::models::MessageRow;

#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Rows owned by `user_id`, oldest first.
    pub async fn find_by_user(&self, user_id: &str) -> Result<Vec<MessageRow>, AppError> {
        sqlx::query_as::<_, MessageRow>(
            "SELECT id, content, is_ai, user_id, created_at
             FROM messages
             WHERE user_id = $1
             ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to fetch messages for user {user_id}: {e}");
            AppError::db_query(format!("Failed to fetch messages for user {user_id}"), e)
        })
    }

    pub async fn save(&self, message: NewMessage) -> Result<MessageRow, AppError> {
        let row = MessageRow::new(message);
        sqlx::query(
            "INSERT INTO messages (id, content, is_ai, user_id, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(row.id)
        .bind(&row.content)
        .bind(row.is_ai)
        .bind(&row.user_id)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to save message {}: {e}", row.id);
            AppError::db_query("Failed to save message", e)
        })?;
        Ok(row)
    }
}

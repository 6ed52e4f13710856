use async_trait::async_trait;
use serde_json::Value;

use crate::error::ChatError;
use crate::message::{CompletionMessage, NewMessage, StoredMessage};
use crate::session::Session;

/// Row-oriented message table behind the conversation controller.
///
/// Futures are not required to be `Send` so browser implementations can
/// hold JS handles across awaits.
#[async_trait(?Send)]
pub trait MessageStore {
    /// All rows visible to `session`, ascending by creation time.
    async fn load(&self, session: &Session) -> Result<Vec<StoredMessage>, ChatError>;

    async fn insert(&self, session: &Session, message: NewMessage) -> Result<(), ChatError>;
}

/// The network-facing completion relay.
#[async_trait(?Send)]
pub trait CompletionRelay {
    /// Sends the conversation and returns the provider's raw JSON response.
    async fn complete(
        &self,
        session: &Session,
        messages: &[CompletionMessage],
    ) -> Result<Value, ChatError>;
}

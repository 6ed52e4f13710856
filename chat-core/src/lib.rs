pub mod composer;
pub mod conversation;
pub mod error;
pub mod message;
pub mod session;
pub mod store;

pub use conversation::{ChatController, Conversation, PendingSend};
pub use error::ChatError;
pub use message::{CompletionMessage, Message, NewMessage, Role, StoredMessage};
pub use session::{Session, SessionHub, Subscription, User};
pub use store::{CompletionRelay, MessageStore};

use async_trait::async_trait;

use crate::error::TransportError;
use crate::events::{MessageId, Reply, UserId};

/// Delivers rendered replies to a user's chat.
#[async_trait]
pub trait Transport: Send + Sync {
	/// Returns the id of the message that now shows the reply. Notices get
	/// an id too, even if the chat never shows it as a message.
	async fn deliver(&self, user: UserId, reply: &Reply) -> Result<MessageId, TransportError>;
}

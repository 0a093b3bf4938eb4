//! Chat message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents who authored a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    /// Message sent by the end user.
    User,
    /// Message sent by a support agent.
    Agent,
    /// System-generated message (automated replies, notices).
    System,
}

/// A single message in a conversation.
///
/// The server-assigned `id` is the deduplication key everywhere a message
/// sequence is merged; two messages with the same id are the same message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Server-assigned message identifier.
    pub id: String,
    /// Identifier of the conversation this message belongs to.
    pub conversation_id: String,
    /// Who authored the message.
    pub direction: MessageDirection,
    /// Message body text.
    pub body: String,
    /// When the message was created on the server.
    pub created_at: DateTime<Utc>,
    /// Attachment URLs, if any.
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl ChatMessage {
    /// Key used to keep message sequences in chronological order.
    ///
    /// Ties on the timestamp are broken by id so the ordering is total.
    pub fn chronological_key(&self) -> (DateTime<Utc>, &str) {
        (self.created_at, &self.id)
    }
}

//! Conversation summary types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A lightweight view of one conversation, as shown in the conversation list.
///
/// Summaries are maintained by the conversation list source: full refreshes
/// replace the whole set, out-of-band updates upsert or remove single entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Stable conversation identifier.
    pub id: String,
    /// Preview text, typically the body of the latest message.
    pub preview: String,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent message in the conversation.
    pub last_message_at: DateTime<Utc>,
    /// Number of messages the user has not seen yet.
    #[serde(default)]
    pub unread_count: u32,
}

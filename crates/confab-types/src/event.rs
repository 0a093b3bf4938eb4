//! Out-of-band event payloads.
//!
//! These events are delivered by the push/live-update collaborator and routed
//! into the session's data sources. Delivery order within a single
//! conversation is the collaborator's responsibility; the session layer does
//! not reorder.

use serde::{Deserialize, Serialize};

use crate::{ChatMessage, ConversationSummary};

/// An event arriving outside the request/response cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutOfBandEvent {
    /// A new message arrived in a conversation.
    Message {
        conversation_id: String,
        message: ChatMessage,
    },
    /// A conversation was created or its summary changed.
    ConversationChanged { summary: ConversationSummary },
    /// A conversation was deleted server-side.
    ConversationDeleted { conversation_id: String },
}

//! Request fingerprints.

use serde::{Deserialize, Serialize};
use strum::Display;

/// The logical kind of a coordinated network operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Initial message fetch for a conversation.
    InitialMessages,
    /// Older-history page fetch for a conversation.
    OlderMessages,
    /// Session-wide conversation list refresh.
    ConversationList,
}

/// Deterministic key identifying one logical network operation.
///
/// Two calls carrying equal fingerprints are the same operation: the request
/// coordinator folds them into a single outstanding network call. Equality
/// is exactly (conversation id, operation kind, paging cursor). Fingerprints
/// are conversation-scoped, so operations for different conversations never
/// collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestFingerprint {
    conversation_id: Option<String>,
    kind: OperationKind,
    cursor: Option<String>,
}

impl RequestFingerprint {
    /// Fingerprint for the initial message fetch of a conversation.
    pub fn initial_messages(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
            kind: OperationKind::InitialMessages,
            cursor: None,
        }
    }

    /// Fingerprint for an older-history page, keyed by its paging cursor.
    pub fn older_messages(conversation_id: impl Into<String>, cursor: Option<String>) -> Self {
        Self {
            conversation_id: Some(conversation_id.into()),
            kind: OperationKind::OlderMessages,
            cursor,
        }
    }

    /// The fixed session-scoped fingerprint for the conversation list refresh.
    pub fn conversation_list() -> Self {
        Self {
            conversation_id: None,
            kind: OperationKind::ConversationList,
            cursor: None,
        }
    }

    /// The conversation this operation is scoped to, if any.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// The logical operation kind.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }
}

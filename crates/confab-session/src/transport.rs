//! Transport contract.
//!
//! Defines the interface the session layer expects from the network
//! transport collaborator. The session layer never builds HTTP requests
//! itself; it hands abstract operation descriptions to an implementation of
//! [`ChatTransport`] and consumes the typed responses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use confab_types::{ChatMessage, ConversationSummary};

use crate::error::Result;

/// Describes one logical network operation.
///
/// Requests are plain data so implementations can map them onto whatever
/// wire protocol they speak, and so tests can record and assert on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum TransportRequest {
    /// Fetch a page of messages for one conversation.
    ///
    /// `before` is the exclusive paging cursor: when set, only messages older
    /// than the referenced message id are returned.
    FetchMessages {
        conversation_id: String,
        before: Option<String>,
        limit: usize,
    },
    /// Fetch the conversation summaries visible to the user.
    FetchConversations,
}

/// One page of messages, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<ChatMessage>,
    /// Whether older history exists beyond this page.
    pub has_more: bool,
}

/// The typed result of a [`TransportRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportResponse {
    Messages(MessagePage),
    Conversations(Vec<ConversationSummary>),
}

/// An abstract asynchronous transport for chat operations.
///
/// This trait decouples the session layer from the concrete network client.
/// Implementations are expected to report every failure as an error rather
/// than retrying internally; retry is a caller-initiated action.
///
/// # Implementation Notes
///
/// Implementations should handle:
/// - Authentication of outbound calls
/// - Timeouts (reported as a transport failure)
/// - Mapping server error payloads onto `ChatError` variants
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Performs one network operation.
    ///
    /// # Arguments
    ///
    /// * `request` - The operation to perform
    ///
    /// # Returns
    ///
    /// - `Ok(TransportResponse)`: the operation's typed result
    /// - `Err(_)`: the operation failed
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse>;
}

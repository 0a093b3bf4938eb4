//! User session composition root.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use confab_types::OutOfBandEvent;

use crate::conversation_list::ConversationListSource;
use crate::coordinator::RequestCoordinator;
use crate::error::{ChatError, Result};
use crate::registry::MessageStreamRegistry;
use crate::stream::MessageStreamSource;
use crate::transport::ChatTransport;

/// One authenticated user's connection context.
///
/// `UserSession` owns exactly one request coordinator, one conversation
/// list source, and one message stream registry, and is the sole entry
/// point for obtaining any of them. Two sessions in one process share
/// nothing: each owns its own coordinator, so request deduplication never
/// crosses session boundaries.
///
/// After [`teardown`](Self::teardown) the session is hard-closed: every
/// subsequent call returns [`ChatError::SessionClosed`] and callers are
/// expected to discard the object.
pub struct UserSession {
    session_id: String,
    coordinator: Arc<RequestCoordinator>,
    conversation_list: Arc<ConversationListSource>,
    streams: MessageStreamRegistry,
    closed: AtomicBool,
}

impl UserSession {
    /// Creates a session for an authenticated user.
    ///
    /// # Arguments
    ///
    /// * `session_id` - Opaque token identifying the authenticated session
    /// * `transport` - The network transport collaborator
    pub fn new(session_id: impl Into<String>, transport: Arc<dyn ChatTransport>) -> Self {
        let coordinator = Arc::new(RequestCoordinator::new(transport));
        Self {
            session_id: session_id.into(),
            conversation_list: Arc::new(ConversationListSource::new(Arc::clone(&coordinator))),
            streams: MessageStreamRegistry::new(Arc::clone(&coordinator)),
            coordinator,
            closed: AtomicBool::new(false),
        }
    }

    /// The opaque token this session was created with.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Returns the message stream source for a conversation, creating it on
    /// first use.
    ///
    /// This is the only way to obtain a source; direct construction is not
    /// exposed, which preserves the one-instance-per-conversation invariant.
    pub async fn message_stream(&self, conversation_id: &str) -> Result<Arc<MessageStreamSource>> {
        self.ensure_open()?;
        Ok(self.streams.source_for(conversation_id).await)
    }

    /// Returns the session-wide conversation list source.
    pub fn conversation_list(&self) -> Result<Arc<ConversationListSource>> {
        self.ensure_open()?;
        Ok(Arc::clone(&self.conversation_list))
    }

    /// Routes an out-of-band event into the owned data sources.
    ///
    /// A pushed message reaches only an already-realized stream source;
    /// delivery never creates one, so conversations the UI never opened
    /// stay unrealized. A deletion evicts the conversation from both the
    /// registry and the list.
    pub async fn dispatch_event(&self, event: OutOfBandEvent) -> Result<()> {
        self.ensure_open()?;
        match event {
            OutOfBandEvent::Message {
                conversation_id,
                message,
            } => {
                if let Some(source) = self.streams.get(&conversation_id).await {
                    source.append_incoming(message).await;
                }
            }
            OutOfBandEvent::ConversationChanged { summary } => {
                self.conversation_list.upsert(summary).await;
            }
            OutOfBandEvent::ConversationDeleted { conversation_id } => {
                self.streams.remove(&conversation_id).await;
                self.conversation_list.remove(&conversation_id).await;
            }
        }
        Ok(())
    }

    /// Tears the session down.
    ///
    /// Force-cancels every outstanding request (attached callers receive
    /// `Canceled`) and clears the stream registry. Idempotent: the second
    /// and later calls do nothing.
    pub async fn teardown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Tearing down session {}", self.session_id);
        self.coordinator.cancel_all().await;
        self.streams.reset().await;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChatError::SessionClosed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as ChatResult;
    use crate::transport::{MessagePage, TransportRequest, TransportResponse};
    use chrono::{TimeZone, Utc};
    use confab_types::{ChatMessage, MessageDirection};

    struct EmptyTransport;

    #[async_trait::async_trait]
    impl ChatTransport for EmptyTransport {
        async fn perform(&self, request: TransportRequest) -> ChatResult<TransportResponse> {
            match request {
                TransportRequest::FetchMessages { .. } => {
                    Ok(TransportResponse::Messages(MessagePage {
                        messages: Vec::new(),
                        has_more: false,
                    }))
                }
                TransportRequest::FetchConversations => {
                    Ok(TransportResponse::Conversations(Vec::new()))
                }
            }
        }
    }

    fn message(conversation_id: &str, id: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            direction: MessageDirection::Agent,
            body: "hi".to_string(),
            created_at: Utc.timestamp_opt(100, 0).unwrap(),
            attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn pushed_message_does_not_realize_a_source() {
        let session = UserSession::new("sess", Arc::new(EmptyTransport));

        session
            .dispatch_event(OutOfBandEvent::Message {
                conversation_id: "never-opened".to_string(),
                message: message("never-opened", "m1"),
            })
            .await
            .unwrap();

        assert!(session.streams.is_empty().await);
    }

    #[tokio::test]
    async fn pushed_message_reaches_a_realized_source() {
        let session = UserSession::new("sess", Arc::new(EmptyTransport));
        let source = session.message_stream("c1").await.unwrap();

        session
            .dispatch_event(OutOfBandEvent::Message {
                conversation_id: "c1".to_string(),
                message: message("c1", "m1"),
            })
            .await
            .unwrap();

        assert_eq!(source.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn teardown_is_idempotent_and_closes_the_session() {
        let session = UserSession::new("sess", Arc::new(EmptyTransport));
        let _ = session.message_stream("c1").await.unwrap();

        session.teardown().await;
        session.teardown().await;

        assert!(session.streams.is_empty().await);
        assert!(
            session
                .message_stream("c1")
                .await
                .unwrap_err()
                .is_session_closed()
        );
        assert!(session.conversation_list().unwrap_err().is_session_closed());
        let err = session
            .dispatch_event(OutOfBandEvent::ConversationDeleted {
                conversation_id: "c1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.is_session_closed());
    }
}

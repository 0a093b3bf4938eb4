//! Common test fixtures.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};

use confab_session::error::{ChatError, Result};
use confab_session::transport::{ChatTransport, MessagePage, TransportRequest, TransportResponse};
use confab_types::{ChatMessage, ConversationSummary, MessageDirection};

/// In-memory transport with adjustable latency and scripted failures.
///
/// Unknown conversations produce a `NotFound` error, like a server
/// rejecting the identifier.
pub struct FakeTransport {
    messages: Mutex<HashMap<String, Vec<ChatMessage>>>,
    conversations: Mutex<Vec<ConversationSummary>>,
    delay: Mutex<Duration>,
    fail_next: AtomicBool,
    message_fetches: AtomicUsize,
    conversation_fetches: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(HashMap::new()),
            conversations: Mutex::new(Vec::new()),
            delay: Mutex::new(Duration::ZERO),
            fail_next: AtomicBool::new(false),
            message_fetches: AtomicUsize::new(0),
            conversation_fetches: AtomicUsize::new(0),
        }
    }

    /// Seeds the full (chronological) message history of a conversation.
    pub fn with_messages(self, conversation_id: &str, messages: Vec<ChatMessage>) -> Self {
        self.messages
            .lock()
            .unwrap()
            .insert(conversation_id.to_string(), messages);
        self
    }

    pub fn with_conversations(self, conversations: Vec<ConversationSummary>) -> Self {
        *self.conversations.lock().unwrap() = conversations;
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Makes the next performed operation fail with a transport error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn message_fetches(&self) -> usize {
        self.message_fetches.load(Ordering::SeqCst)
    }

    pub fn conversation_fetches(&self) -> usize {
        self.conversation_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ChatTransport for FakeTransport {
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match request {
            TransportRequest::FetchMessages {
                conversation_id,
                before,
                limit,
            } => {
                self.message_fetches.fetch_add(1, Ordering::SeqCst);
                if self.fail_next.swap(false, Ordering::SeqCst) {
                    return Err(ChatError::transport("injected failure"));
                }

                let store = self.messages.lock().unwrap();
                let Some(all) = store.get(&conversation_id) else {
                    return Err(ChatError::not_found("conversation", conversation_id));
                };
                let older: Vec<ChatMessage> = match &before {
                    Some(cursor) => {
                        let cut = all.iter().position(|m| &m.id == cursor).unwrap_or(0);
                        all[..cut].to_vec()
                    }
                    None => all.clone(),
                };
                let start = older.len().saturating_sub(limit);
                let has_more = start > 0;
                Ok(TransportResponse::Messages(MessagePage {
                    messages: older[start..].to_vec(),
                    has_more,
                }))
            }
            TransportRequest::FetchConversations => {
                self.conversation_fetches.fetch_add(1, Ordering::SeqCst);
                if self.fail_next.swap(false, Ordering::SeqCst) {
                    return Err(ChatError::transport("injected failure"));
                }
                Ok(TransportResponse::Conversations(
                    self.conversations.lock().unwrap().clone(),
                ))
            }
        }
    }
}

pub fn message(conversation_id: &str, id: &str, secs: i64) -> ChatMessage {
    ChatMessage {
        id: id.to_string(),
        conversation_id: conversation_id.to_string(),
        direction: MessageDirection::Agent,
        body: format!("body {id}"),
        created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        attachments: Vec::new(),
    }
}

pub fn summary(id: &str, last_message_secs: i64) -> ConversationSummary {
    ConversationSummary {
        id: id.to_string(),
        preview: format!("preview {id}"),
        created_at: Utc.timestamp_opt(0, 0).unwrap(),
        last_message_at: Utc.timestamp_opt(last_message_secs, 0).unwrap(),
        unread_count: 0,
    }
}

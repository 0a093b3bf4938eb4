//! Message stream data source.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::{RwLock, broadcast};

use confab_types::ChatMessage;

use crate::coordinator::{OperationKind, RequestCoordinator, RequestFingerprint};
use crate::error::{ChatError, Result};
use crate::transport::{TransportRequest, TransportResponse};

use super::merge::{insert_chronological, merge_messages};

/// Messages fetched per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Lifecycle phase of a message stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StreamPhase {
    /// No messages loaded and no fetch issued yet.
    Empty,
    /// The initial fetch is outstanding.
    Loading,
    /// Messages are available and no initial fetch is outstanding.
    Loaded,
    /// The last initial fetch failed; retry via `load_initial`.
    Failed,
}

/// Notifications published to stream observers.
///
/// One notification is published per merge batch, never per message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The stream moved to a new phase.
    PhaseChanged { phase: StreamPhase },
    /// A merge batch finished; `added` of the batch were new messages.
    MessagesMerged { added: usize, total: usize },
    /// A fetch failed; `operation` names the logical request kind so
    /// observers can decide whether and what to retry.
    LoadFailed { operation: String, error: ChatError },
}

struct StreamState {
    phase: StreamPhase,
    messages: Vec<ChatMessage>,
    has_more: bool,
    /// An older-history page fetch is outstanding.
    paging: bool,
}

/// The live state of one conversation.
///
/// One instance exists per conversation id, created and cached by the
/// session's registry; the conversation id is immutable for the lifetime of
/// the instance. Every fetch goes through the session's shared
/// [`RequestCoordinator`], so overlapping loads from any number of consumers
/// of this source fold into a single network call.
pub struct MessageStreamSource {
    conversation_id: String,
    coordinator: Arc<RequestCoordinator>,
    state: RwLock<StreamState>,
    events: broadcast::Sender<StreamEvent>,
    page_size: usize,
}

impl std::fmt::Debug for MessageStreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStreamSource")
            .field("conversation_id", &self.conversation_id)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl MessageStreamSource {
    pub(crate) fn new(conversation_id: String, coordinator: Arc<RequestCoordinator>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            conversation_id,
            coordinator,
            state: RwLock::new(StreamState {
                phase: StreamPhase::Empty,
                messages: Vec::new(),
                has_more: false,
                paging: false,
            }),
            events,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// The conversation this source belongs to.
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> StreamPhase {
        self.state.read().await.phase
    }

    /// Whether older history exists beyond what is loaded.
    pub async fn has_more(&self) -> bool {
        self.state.read().await.has_more
    }

    /// Snapshot of the current message sequence, oldest first.
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().await.messages.clone()
    }

    /// Registers an observer for state and content changes.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.events.subscribe()
    }

    /// Loads the first page of history.
    ///
    /// From `Empty` or `Failed` this issues a fetch through the coordinator;
    /// overlapping calls, from this or any other consumer of the source,
    /// attach to the same outstanding request and observe its single
    /// completion. From `Loaded` this is a no-op.
    pub async fn load_initial(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            match state.phase {
                StreamPhase::Loaded => return Ok(()),
                StreamPhase::Loading => {}
                StreamPhase::Empty | StreamPhase::Failed => {
                    state.phase = StreamPhase::Loading;
                    self.notify(StreamEvent::PhaseChanged {
                        phase: StreamPhase::Loading,
                    });
                }
            }
        }

        let handle = self
            .coordinator
            .execute(
                RequestFingerprint::initial_messages(self.conversation_id.as_str()),
                TransportRequest::FetchMessages {
                    conversation_id: self.conversation_id.clone(),
                    before: None,
                    limit: self.page_size,
                },
            )
            .await;

        // A folded caller may have applied the result between our phase
        // check and the attach, leaving us a fresh operation nobody needs.
        if self.phase().await == StreamPhase::Loaded {
            self.coordinator.cancel(handle).await;
            return Ok(());
        }

        match handle.wait().await {
            Ok(TransportResponse::Messages(page)) => {
                let (added, total, phase_changed) = {
                    let mut state = self.state.write().await;
                    let added = merge_messages(&mut state.messages, page.messages);
                    state.has_more = page.has_more;
                    let phase_changed = state.phase != StreamPhase::Loaded;
                    state.phase = StreamPhase::Loaded;
                    (added, state.messages.len(), phase_changed)
                };
                if phase_changed {
                    self.notify(StreamEvent::PhaseChanged {
                        phase: StreamPhase::Loaded,
                    });
                }
                if added > 0 {
                    self.notify(StreamEvent::MessagesMerged { added, total });
                }
                Ok(())
            }
            Ok(_) => {
                let err = ChatError::internal("unexpected transport response for a message fetch");
                self.fail_initial(err.clone()).await;
                Err(err)
            }
            Err(err) => {
                self.fail_initial(err.clone()).await;
                Err(err)
            }
        }
    }

    /// Loads one page of older history.
    ///
    /// Valid only while `Loaded` with more history available; otherwise a
    /// no-op. The paging cursor is the oldest known message id, so
    /// overlapping calls carry the same fingerprint and fold into one fetch.
    pub async fn load_more(&self) -> Result<()> {
        let cursor = {
            let mut state = self.state.write().await;
            if state.phase != StreamPhase::Loaded || !state.has_more {
                return Ok(());
            }
            state.paging = true;
            state.messages.first().map(|m| m.id.clone())
        };

        let handle = self
            .coordinator
            .execute(
                RequestFingerprint::older_messages(self.conversation_id.as_str(), cursor.clone()),
                TransportRequest::FetchMessages {
                    conversation_id: self.conversation_id.clone(),
                    before: cursor,
                    limit: self.page_size,
                },
            )
            .await;

        match handle.wait().await {
            Ok(TransportResponse::Messages(page)) => {
                let (added, total) = {
                    let mut state = self.state.write().await;
                    let added = merge_messages(&mut state.messages, page.messages);
                    state.has_more = page.has_more;
                    state.paging = false;
                    (added, state.messages.len())
                };
                if added > 0 {
                    self.notify(StreamEvent::MessagesMerged { added, total });
                }
                Ok(())
            }
            Ok(_) => {
                let err = ChatError::internal("unexpected transport response for a message fetch");
                self.fail_page(err.clone()).await;
                Err(err)
            }
            Err(err) => {
                self.fail_page(err.clone()).await;
                Err(err)
            }
        }
    }

    /// Ingests a message that arrived out-of-band.
    ///
    /// Insertion preserves chronological order. A message whose id is
    /// already present leaves the sequence untouched, so delivery is
    /// idempotent.
    pub async fn append_incoming(&self, message: ChatMessage) {
        let (inserted, total) = {
            let mut state = self.state.write().await;
            let inserted = insert_chronological(&mut state.messages, message);
            (inserted, state.messages.len())
        };
        if inserted {
            self.notify(StreamEvent::MessagesMerged { added: 1, total });
        }
    }

    /// Seeds the sequence from a persisted cache.
    ///
    /// Only applies while `Empty` with no messages, and leaves the phase at
    /// `Empty`: a subsequent `load_initial` still fetches and merges server
    /// truth over the seed. Seeding anything else is a no-op.
    pub async fn seed_from_cache(&self, messages: Vec<ChatMessage>) {
        let (added, total) = {
            let mut state = self.state.write().await;
            if state.phase != StreamPhase::Empty || !state.messages.is_empty() {
                return;
            }
            let added = merge_messages(&mut state.messages, messages);
            (added, state.messages.len())
        };
        if added > 0 {
            self.notify(StreamEvent::MessagesMerged { added, total });
        }
    }

    /// Clears all loaded state and returns to `Empty`.
    pub async fn reset(&self) {
        {
            let mut state = self.state.write().await;
            state.messages.clear();
            state.has_more = false;
            state.paging = false;
            state.phase = StreamPhase::Empty;
        }
        self.notify(StreamEvent::PhaseChanged {
            phase: StreamPhase::Empty,
        });
    }

    async fn fail_initial(&self, error: ChatError) {
        let phase_changed = {
            let mut state = self.state.write().await;
            let changed = state.phase != StreamPhase::Failed;
            state.phase = StreamPhase::Failed;
            changed
        };
        // Folded callers all run this path; only the first one reports.
        if phase_changed {
            self.notify(StreamEvent::PhaseChanged {
                phase: StreamPhase::Failed,
            });
            self.notify(StreamEvent::LoadFailed {
                operation: OperationKind::InitialMessages.to_string(),
                error,
            });
        }
    }

    async fn fail_page(&self, error: ChatError) {
        // A failed page load leaves the loaded history intact.
        let was_paging = {
            let mut state = self.state.write().await;
            let was_paging = state.paging;
            state.paging = false;
            was_paging
        };
        if was_paging {
            self.notify(StreamEvent::LoadFailed {
                operation: OperationKind::OlderMessages.to_string(),
                error,
            });
        }
    }

    fn notify(&self, event: StreamEvent) {
        // Send only fails when no observer is attached, which is fine.
        let _ = self.events.send(event);
    }
}

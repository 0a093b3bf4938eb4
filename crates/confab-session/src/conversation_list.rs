//! Conversation list data source.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::{RwLock, broadcast};

use confab_types::ConversationSummary;

use crate::coordinator::{RequestCoordinator, RequestFingerprint};
use crate::error::{ChatError, Result};
use crate::transport::{TransportRequest, TransportResponse};

/// Load status of the conversation list.
///
/// Transitions are monotone within one refresh cycle: `Loading` resolves to
/// `Loaded` or `Failed`, and only an explicit `refresh` re-enters `Loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ListStatus {
    /// No refresh has been issued yet.
    NotLoaded,
    /// A refresh is outstanding.
    Loading,
    /// The list reflects the last successful refresh.
    Loaded,
    /// The last refresh failed; retry via `refresh`.
    Failed,
}

/// Notifications published to list observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListEvent {
    /// The list moved to a new status.
    StatusChanged { status: ListStatus },
    /// A refresh completed and replaced the list.
    Refreshed { count: usize },
    /// A single summary was inserted or updated out-of-band.
    Upserted { conversation_id: String },
    /// A single conversation was removed out-of-band.
    Removed { conversation_id: String },
    /// A refresh failed.
    RefreshFailed { error: ChatError },
}

struct ListState {
    status: ListStatus,
    conversations: Vec<ConversationSummary>,
}

/// The set of conversations visible to the user.
///
/// One instance exists per session. A refresh replaces the whole summary
/// sequence; out-of-band events patch single entries so the list stays
/// consistent without a full round trip.
pub struct ConversationListSource {
    coordinator: Arc<RequestCoordinator>,
    state: RwLock<ListState>,
    events: broadcast::Sender<ListEvent>,
}

impl std::fmt::Debug for ConversationListSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationListSource").finish_non_exhaustive()
    }
}

impl ConversationListSource {
    pub(crate) fn new(coordinator: Arc<RequestCoordinator>) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            coordinator,
            state: RwLock::new(ListState {
                status: ListStatus::NotLoaded,
                conversations: Vec::new(),
            }),
            events,
        }
    }

    /// Current load status.
    pub async fn status(&self) -> ListStatus {
        self.state.read().await.status
    }

    /// Snapshot of the current summaries, in the order the last refresh
    /// delivered them (out-of-band upserts are positioned by recency).
    pub async fn conversations(&self) -> Vec<ConversationSummary> {
        self.state.read().await.conversations.clone()
    }

    /// Registers an observer for status and content changes.
    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.events.subscribe()
    }

    /// Refreshes the list from the server.
    ///
    /// All concurrent callers share one fetch: the refresh carries the fixed
    /// session-scoped fingerprint, so at most one is outstanding regardless
    /// of how many callers ask. Success replaces the summary sequence in the
    /// server-provided order.
    pub async fn refresh(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if state.status != ListStatus::Loading {
                state.status = ListStatus::Loading;
                self.notify(ListEvent::StatusChanged {
                    status: ListStatus::Loading,
                });
            }
        }

        let handle = self
            .coordinator
            .execute(
                RequestFingerprint::conversation_list(),
                TransportRequest::FetchConversations,
            )
            .await;

        match handle.wait().await {
            Ok(TransportResponse::Conversations(summaries)) => {
                let (count, status_changed) = {
                    let mut state = self.state.write().await;
                    state.conversations = summaries;
                    let changed = state.status != ListStatus::Loaded;
                    state.status = ListStatus::Loaded;
                    (state.conversations.len(), changed)
                };
                // Folded callers all apply the same result; only the first
                // one reports it.
                if status_changed {
                    self.notify(ListEvent::StatusChanged {
                        status: ListStatus::Loaded,
                    });
                    self.notify(ListEvent::Refreshed { count });
                }
                Ok(())
            }
            Ok(_) => {
                let err =
                    ChatError::internal("unexpected transport response for a conversation fetch");
                self.fail(err.clone()).await;
                Err(err)
            }
            Err(err) => {
                self.fail(err.clone()).await;
                Err(err)
            }
        }
    }

    /// Inserts or updates one summary out-of-band.
    ///
    /// The patched entry is positioned by its last activity; the relative
    /// (server-provided) order of every other entry is untouched.
    pub async fn upsert(&self, summary: ConversationSummary) {
        let conversation_id = summary.id.clone();
        {
            let mut state = self.state.write().await;
            state.conversations.retain(|existing| existing.id != summary.id);
            let position = state
                .conversations
                .partition_point(|c| c.last_message_at >= summary.last_message_at);
            state.conversations.insert(position, summary);
        }
        self.notify(ListEvent::Upserted { conversation_id });
    }

    /// Removes one conversation out-of-band. Unknown ids are ignored.
    pub async fn remove(&self, conversation_id: &str) {
        let removed = {
            let mut state = self.state.write().await;
            let before = state.conversations.len();
            state.conversations.retain(|c| c.id != conversation_id);
            state.conversations.len() != before
        };
        if removed {
            self.notify(ListEvent::Removed {
                conversation_id: conversation_id.to_string(),
            });
        }
    }

    async fn fail(&self, error: ChatError) {
        let status_changed = {
            let mut state = self.state.write().await;
            let changed = state.status != ListStatus::Failed;
            state.status = ListStatus::Failed;
            changed
        };
        if status_changed {
            self.notify(ListEvent::StatusChanged {
                status: ListStatus::Failed,
            });
            self.notify(ListEvent::RefreshFailed { error });
        }
    }

    fn notify(&self, event: ListEvent) {
        let _ = self.events.send(event);
    }
}

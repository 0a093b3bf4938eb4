//! Per-session registry of message stream sources.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::coordinator::RequestCoordinator;
use crate::stream::MessageStreamSource;

/// Lazily creates and caches one [`MessageStreamSource`] per conversation.
///
/// The map is always present: `reset` empties it rather than replacing it
/// with an absent state, so a lookup after a reset transparently re-creates
/// sources on demand. Callers holding a pre-reset source keep a working
/// instance; they simply no longer share it with new callers.
pub struct MessageStreamRegistry {
    coordinator: Arc<RequestCoordinator>,
    sources: RwLock<HashMap<String, Arc<MessageStreamSource>>>,
}

impl MessageStreamRegistry {
    pub(crate) fn new(coordinator: Arc<RequestCoordinator>) -> Self {
        Self {
            coordinator,
            sources: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached source for a conversation, creating it on miss.
    ///
    /// Creation is atomic with respect to concurrent callers: the map is
    /// re-checked under the write lock before inserting, so exactly one
    /// instance ever exists per conversation id no matter how many callers
    /// race on the first lookup.
    pub async fn source_for(&self, conversation_id: &str) -> Arc<MessageStreamSource> {
        if let Some(source) = self.sources.read().await.get(conversation_id) {
            return Arc::clone(source);
        }

        let mut sources = self.sources.write().await;
        if let Some(source) = sources.get(conversation_id) {
            return Arc::clone(source);
        }

        debug!("Creating message stream source for conversation {}", conversation_id);
        let source = Arc::new(MessageStreamSource::new(
            conversation_id.to_string(),
            Arc::clone(&self.coordinator),
        ));
        sources.insert(conversation_id.to_string(), Arc::clone(&source));
        source
    }

    /// Returns the cached source without creating one.
    pub async fn get(&self, conversation_id: &str) -> Option<Arc<MessageStreamSource>> {
        self.sources.read().await.get(conversation_id).cloned()
    }

    /// Evicts one conversation and force-cancels its in-flight requests.
    ///
    /// Fingerprints are conversation-scoped, so the cancellation cannot
    /// disturb operations belonging to other sources.
    pub async fn remove(&self, conversation_id: &str) {
        let removed = self.sources.write().await.remove(conversation_id);
        if removed.is_some() {
            debug!("Evicted message stream source for conversation {}", conversation_id);
        }
        self.coordinator.cancel_conversation(conversation_id).await;
    }

    /// Clears every cached source.
    ///
    /// Existing instances keep working for callers that already hold them;
    /// subsequent `source_for` calls create fresh instances.
    pub async fn reset(&self) {
        self.sources.write().await.clear();
    }

    /// Number of realized sources.
    pub async fn len(&self) -> usize {
        self.sources.read().await.len()
    }

    /// Whether no source has been realized (or all were cleared).
    pub async fn is_empty(&self) -> bool {
        self.sources.read().await.is_empty()
    }
}

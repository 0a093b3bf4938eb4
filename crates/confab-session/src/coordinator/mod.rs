//! Shared request coordination.
//!
//! [`RequestCoordinator`] owns every outbound network operation for one
//! session. Concurrent calls for the same logical resource (equal
//! fingerprints) fold into a single transport call whose result is fanned
//! out to every attached caller. Cancellation is reference-counted: the
//! underlying call is only canceled once the last attached caller detaches,
//! or when the session force-cancels on teardown.

mod fingerprint;
mod handle;

pub use fingerprint::{OperationKind, RequestFingerprint};
pub use handle::RequestHandle;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ChatError, Result};
use crate::transport::{ChatTransport, TransportRequest, TransportResponse};

/// Bookkeeping for one outstanding operation.
struct InFlight {
    /// Distinguishes this operation from a later one reusing the fingerprint.
    op_id: u64,
    sender: broadcast::Sender<Result<TransportResponse>>,
    cancel: CancellationToken,
    /// Callers attached via `execute` and not yet detached.
    attached: usize,
}

/// The single point of network access for one session.
///
/// The only shared mutable state is the fingerprint table; every mutating
/// operation takes its lock for one short critical section. The transport
/// call itself runs on a spawned task outside any lock, so callers are never
/// blocked behind a network operation.
pub struct RequestCoordinator {
    transport: Arc<dyn ChatTransport>,
    in_flight: Arc<Mutex<HashMap<RequestFingerprint, InFlight>>>,
    next_op_id: AtomicU64,
}

impl RequestCoordinator {
    /// Creates a coordinator backed by the given transport.
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_op_id: AtomicU64::new(0),
        }
    }

    /// Executes an operation, deduplicating against outstanding calls.
    ///
    /// If an operation with the same fingerprint is already outstanding, the
    /// caller is attached to it and no new transport call starts; every
    /// attached caller receives the identical result. Otherwise the
    /// operation begins immediately and is recorded under the fingerprint
    /// until it completes. The fingerprint entry is cleared on completion,
    /// success or failure, so a later `execute` always starts fresh instead
    /// of replaying a cached outcome.
    ///
    /// `request` must describe the operation the fingerprint identifies;
    /// the fingerprint is the deduplication key, not the request value.
    pub async fn execute(
        &self,
        fingerprint: RequestFingerprint,
        request: TransportRequest,
    ) -> RequestHandle {
        let mut in_flight = self.in_flight.lock().await;

        if let Some(entry) = in_flight.get_mut(&fingerprint) {
            entry.attached += 1;
            debug!(
                "Attaching caller to outstanding {} request ({} attached)",
                fingerprint.kind(),
                entry.attached
            );
            return RequestHandle::new(fingerprint.clone(), entry.sender.subscribe());
        }

        let op_id = self.next_op_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = broadcast::channel(1);
        let cancel = CancellationToken::new();
        in_flight.insert(
            fingerprint.clone(),
            InFlight {
                op_id,
                sender: sender.clone(),
                cancel: cancel.clone(),
                attached: 1,
            },
        );
        drop(in_flight);

        let transport = Arc::clone(&self.transport);
        let table = Arc::clone(&self.in_flight);
        let task_fingerprint = fingerprint.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    Err(ChatError::canceled(task_fingerprint.kind().to_string()))
                }
                result = transport.perform(request) => result,
            };

            if let Err(err) = &outcome {
                warn!("{} request failed: {}", task_fingerprint.kind(), err);
            }

            // Clear the fingerprint before publishing, so a caller retrying
            // right after the completion starts a fresh operation. The entry
            // may already be gone, or belong to a newer operation, when this
            // one was force-canceled.
            let mut in_flight = table.lock().await;
            if in_flight
                .get(&task_fingerprint)
                .is_some_and(|entry| entry.op_id == op_id)
            {
                in_flight.remove(&task_fingerprint);
            }
            drop(in_flight);

            let _ = sender.send(outcome);
        });

        RequestHandle::new(fingerprint, receiver)
    }

    /// Detaches a caller from its outstanding operation.
    ///
    /// The underlying transport call is canceled only when the last attached
    /// caller detaches; earlier detaches leave the operation running for the
    /// remaining callers. Detaching from an already-completed operation does
    /// nothing.
    pub async fn cancel(&self, handle: RequestHandle) {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(entry) = in_flight.get_mut(handle.fingerprint()) {
            entry.attached = entry.attached.saturating_sub(1);
            if entry.attached == 0 {
                debug!(
                    "Last caller detached, canceling {} request",
                    handle.fingerprint().kind()
                );
                entry.cancel.cancel();
                in_flight.remove(handle.fingerprint());
            }
        }
    }

    /// Force-cancels every outstanding operation scoped to a conversation.
    ///
    /// Callers still attached receive a `Canceled` error. Fingerprints are
    /// conversation-scoped, so operations belonging to other conversations
    /// are untouched.
    pub async fn cancel_conversation(&self, conversation_id: &str) {
        let mut in_flight = self.in_flight.lock().await;
        in_flight.retain(|fingerprint, entry| {
            if fingerprint.conversation_id() == Some(conversation_id) {
                entry.cancel.cancel();
                false
            } else {
                true
            }
        });
    }

    /// Force-cancels every outstanding operation. Session teardown path.
    ///
    /// Every attached caller receives a `Canceled` error regardless of how
    /// many were attached.
    pub async fn cancel_all(&self) {
        let mut in_flight = self.in_flight.lock().await;
        for (_, entry) in in_flight.drain() {
            entry.cancel.cancel();
        }
    }

    /// Number of operations currently outstanding.
    pub async fn outstanding(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}

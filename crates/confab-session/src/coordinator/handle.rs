//! Caller-side handle to a coordinated request.

use tokio::sync::broadcast;

use crate::error::{ChatError, Result};
use crate::transport::TransportResponse;

use super::fingerprint::RequestFingerprint;

/// A caller's attachment to one outstanding coordinated operation.
///
/// Every handle attached to a given fingerprint resolves to the identical
/// completion, success value or failure. Dropping a handle merely stops
/// listening; it does not detach the caller for cancellation accounting.
/// Use [`RequestCoordinator::cancel`](super::RequestCoordinator::cancel)
/// for an explicit detach.
pub struct RequestHandle {
    fingerprint: RequestFingerprint,
    receiver: broadcast::Receiver<Result<TransportResponse>>,
}

impl RequestHandle {
    pub(crate) fn new(
        fingerprint: RequestFingerprint,
        receiver: broadcast::Receiver<Result<TransportResponse>>,
    ) -> Self {
        Self {
            fingerprint,
            receiver,
        }
    }

    /// The fingerprint this handle is attached to.
    pub fn fingerprint(&self) -> &RequestFingerprint {
        &self.fingerprint
    }

    /// Waits for the shared completion of the underlying operation.
    pub async fn wait(mut self) -> Result<TransportResponse> {
        match self.receiver.recv().await {
            Ok(outcome) => outcome,
            // The operation task went away without publishing a result.
            Err(_) => Err(ChatError::canceled(self.fingerprint.kind().to_string())),
        }
    }
}

//! Error types for the Confab session layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire session layer.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait. Variants are `Clone` so a
/// single failure can be delivered to every caller attached to a shared
/// request.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatError {
    /// Network or server error surfaced by the transport collaborator
    #[error("Transport failure: {message}")]
    Transport { message: String },

    /// The server rejected a referenced entity
    #[error("Not found: {entity_type} '{id}'")]
    NotFound { entity_type: String, id: String },

    /// The operation was canceled before completion
    #[error("Canceled: {operation}")]
    Canceled { operation: String },

    /// The session has been torn down; callers must discard it
    #[error("Session is closed")]
    SessionClosed,

    /// Serialization/deserialization error at the wire boundary
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Creates a Canceled error for the named logical operation
    pub fn canceled(operation: impl Into<String>) -> Self {
        Self::Canceled {
            operation: operation.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a Transport error
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Canceled error
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }

    /// Check if this is a SessionClosed error
    pub fn is_session_closed(&self) -> bool {
        matches!(self, Self::SessionClosed)
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ChatError>`.
pub type Result<T> = std::result::Result<T, ChatError>;

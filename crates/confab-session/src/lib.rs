//! Client-side session layer of the Confab support messaging SDK.
//!
//! One authenticated [`UserSession`] exposes a consistent, lazily-populated
//! view of the user's conversations and of the live message stream for each
//! conversation the UI opens. All network activity behind these views runs
//! through one shared [`RequestCoordinator`], so duplicate or conflicting
//! in-flight calls for the same resource never occur.
//!
//! # Module Structure
//!
//! - `error`: the shared error type (`ChatError`)
//! - `transport`: the contract expected from the network collaborator
//! - `coordinator`: request deduplication and cancellation
//! - `stream`: the per-conversation message stream source
//! - `registry`: the per-session cache of stream sources
//! - `conversation_list`: the session-wide conversation list source
//! - `session`: the composition root

pub mod conversation_list;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod session;
pub mod stream;
pub mod transport;

// Re-export the entry points.
pub use error::{ChatError, Result};
pub use session::UserSession;

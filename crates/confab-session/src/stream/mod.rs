//! Per-conversation message stream.
//!
//! # Module Structure
//!
//! - `source`: the data source owning one conversation's live message state
//! - `merge`: chronological merge helpers shared by its load paths

mod merge;
mod source;

pub use source::{DEFAULT_PAGE_SIZE, MessageStreamSource, StreamEvent, StreamPhase};

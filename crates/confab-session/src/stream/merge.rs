//! Chronological merge helpers for message sequences.
//!
//! A message sequence is kept sorted by `(created_at, id)` and deduplicated
//! by message id. Merging never reorders messages already present and never
//! silently drops one; the only way to shrink a sequence is an explicit
//! reset on the owning source.

use confab_types::ChatMessage;

/// Inserts one message preserving chronological order.
///
/// Returns `false` if a message with the same id was already present, in
/// which case the sequence is untouched.
pub(crate) fn insert_chronological(existing: &mut Vec<ChatMessage>, message: ChatMessage) -> bool {
    if existing.iter().any(|m| m.id == message.id) {
        return false;
    }
    let position =
        existing.partition_point(|m| m.chronological_key() <= message.chronological_key());
    existing.insert(position, message);
    true
}

/// Merges a batch of messages into the sequence.
///
/// Returns how many messages were actually added; duplicates within the
/// batch and against the existing sequence are skipped.
pub(crate) fn merge_messages(existing: &mut Vec<ChatMessage>, incoming: Vec<ChatMessage>) -> usize {
    let mut added = 0;
    for message in incoming {
        if insert_chronological(existing, message) {
            added += 1;
        }
    }
    added
}

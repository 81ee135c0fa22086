use std::collections::HashMap;

use parking_lot::Mutex;

use super::workflow::EditOptions;

/// A suspended edit waiting on one more message from its requester.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConfirmation {
    /// The normalized options of the suspended edit.
    pub options: EditOptions,
    /// Ids of the records the suspended edit replaces.
    pub targets: Vec<u32>,
}

/// One-shot continuations keyed by requester session.
///
/// An entry intercepts exactly the next inbound message for its session and
/// is removed on first use, committed or bypassed alike, so a stale entry
/// can never fire twice. Entries for different sessions are independent.
#[derive(Debug, Default)]
pub struct ContinuationRegistry {
    pending: Mutex<HashMap<String, PendingConfirmation>>,
}

impl ContinuationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a continuation for the session, replacing any stale one.
    pub fn put(&self, session: &str, pending: PendingConfirmation) {
        self.pending.lock().insert(session.to_string(), pending);
    }

    /// Removes and returns the session's continuation, if present.
    pub fn take(&self, session: &str) -> Option<PendingConfirmation> {
        self.pending.lock().remove(session)
    }

    /// True when the session has a continuation registered.
    #[must_use]
    pub fn has_pending(&self, session: &str) -> bool {
        self.pending.lock().contains_key(session)
    }
}

/// True for a reply that confirms the swap: an empty line or a bare period
/// in either script form.
#[must_use]
pub fn is_confirmation(reply: &str) -> bool {
    let trimmed = reply.trim();
    trimmed.is_empty() || trimmed == "." || trimmed == "。"
}

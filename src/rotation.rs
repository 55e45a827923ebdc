//! Round-robin agent selection for human handoff.
//!
//! The cursor is the only state shared across webhook invocations; the
//! roster itself is re-fetched from Chatwoot on every handoff, so two
//! consecutive calls may see rosters of different sizes. Advancing always
//! uses the size observed at call time.

use std::sync::Mutex;

use crate::chatwoot::Member;

/// Cursor value before any selection has been made.
const NO_SELECTION: i64 = -1;

/// Rotation state over the inbox member roster.
pub struct AgentRotation {
    cursor: Mutex<i64>,
}

impl AgentRotation {
    pub fn new() -> Self {
        Self {
            cursor: Mutex::new(NO_SELECTION),
        }
    }

    /// Return the next agent id, advancing the cursor. Empty roster returns
    /// `None` and leaves the cursor untouched. The read-modify-write is a
    /// single step under the lock, so concurrent relays never tear it.
    pub fn next(&self, roster: &[Member]) -> Option<i64> {
        if roster.is_empty() {
            return None;
        }
        let mut cursor = self.cursor.lock().expect("rotation cursor poisoned");
        let idx = (*cursor + 1).rem_euclid(roster.len() as i64);
        *cursor = idx;
        Some(roster[idx as usize].id)
    }
}

impl Default for AgentRotation {
    fn default() -> Self {
        Self::new()
    }
}

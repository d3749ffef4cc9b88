//! Wait-for-all-end session window.
//!
//! When the end announcement mode defers to a single summary, this set
//! tracks every source that went live at least once in the current
//! window and the subset still live. The window drains atomically the
//! moment the still-live subset empties: the snapshot becomes the
//! finishing announcement and a fresh window starts immediately, so a
//! source going live while that announcement is still in flight joins
//! the *next* window rather than the in-flight summary.

use std::collections::HashSet;

use crate::types::Source;

#[derive(Debug, Clone, Default)]
pub struct PendingAllEndSet {
    /// Sources that went live at least once this window, in the order
    /// they first went live.
    participants: Vec<Source>,
    /// Subset of `participants` currently still live.
    still_live: HashSet<Source>,
}

impl PendingAllEndSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a source went live. Idempotent per window.
    pub fn observe_live(&mut self, source: &Source) {
        if !self.participants.contains(source) {
            self.participants.push(source.clone());
        }
        self.still_live.insert(source.clone());
    }

    /// Record that a source went offline. Returns `true` if the window
    /// is now fully drained (at least one participant and none still
    /// live); the caller should then take [`Self::drain`].
    pub fn observe_offline(&mut self, source: &Source) -> bool {
        self.still_live.remove(source);
        self.all_ended()
    }

    /// Whether every participant of a non-empty window has ended.
    pub fn all_ended(&self) -> bool {
        !self.participants.is_empty() && self.still_live.is_empty()
    }

    /// Take the participant snapshot and reset the window.
    pub fn drain(&mut self) -> Vec<Source> {
        self.still_live.clear();
        std::mem::take(&mut self.participants)
    }

    pub fn participants(&self) -> &[Source] {
        &self.participants
    }

    pub fn still_live_len(&self) -> usize {
        self.still_live.len()
    }

    pub fn is_still_live(&self, source: &Source) -> bool {
        self.still_live.contains(source)
    }

    /// Invariant: the still-live subset is always ⊆ the participant set.
    pub fn invariant_holds(&self) -> bool {
        self.still_live
            .iter()
            .all(|s| self.participants.contains(s))
    }
}

// ─── Tests ───────────────────────────────────────────────────────

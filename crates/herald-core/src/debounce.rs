//! Debounce state machine for live/offline readings.
//!
//! Stream platform APIs flap: a channel can read offline for one poll in
//! the middle of a broadcast, or briefly live while a VOD premieres. The
//! committed state therefore only flips after `threshold` consecutive
//! identical raw readings that differ from the committed state.

/// Default number of consecutive consistent readings required to commit
/// a state change.
pub const DEFAULT_DEBOUNCE_THRESHOLD: u32 = 2;

/// Per-source debounce tracking state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceState {
    /// The committed (stable) live state.
    pub committed: bool,
    /// The most recent raw reading.
    pub last_raw: bool,
    /// How many consecutive polls returned `last_raw`.
    pub consecutive: u32,
}

impl DebounceState {
    /// Seed the state from the first reading of a source. The committed
    /// state starts at the raw reading, so a channel that is already live
    /// when the daemon starts is not re-announced.
    pub fn seeded(initial: bool) -> Self {
        Self {
            committed: initial,
            last_raw: initial,
            consecutive: 1,
        }
    }
}

/// Output of a debounce update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceOutput {
    /// The committed state after this update.
    pub committed: bool,
    /// Whether the committed state changed in this update.
    pub changed: bool,
    /// Whether a differing raw reading was suppressed by the threshold.
    pub suppressed: bool,
}

/// Update the debounce state with a new raw reading.
///
/// A `threshold` of 0 is treated as 1 (commit immediately).
pub fn update(state: &DebounceState, raw: bool, threshold: u32) -> (DebounceState, DebounceOutput) {
    let threshold = threshold.max(1);

    let consecutive = if raw == state.last_raw {
        state.consecutive.saturating_add(1)
    } else {
        1
    };

    let (committed, changed, suppressed) = if raw == state.committed {
        (state.committed, false, false)
    } else if consecutive >= threshold {
        (raw, true, false)
    } else {
        (state.committed, false, true)
    };

    let next = DebounceState {
        committed,
        last_raw: raw,
        consecutive,
    };
    let output = DebounceOutput {
        committed,
        changed,
        suppressed,
    };
    (next, output)
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Run a reading sequence through the machine, returning the final
    /// state and the number of committed changes.
    fn run(initial: bool, readings: &[bool], threshold: u32) -> (DebounceState, u32) {
        let mut state = DebounceState::seeded(initial);
        let mut changes = 0;
        for &raw in readings {
            let (next, out) = update(&state, raw, threshold);
            if out.changed {
                changes += 1;
            }
            state = next;
        }
        (state, changes)
    }

    #[test]
    fn seeded_state_matches_first_reading() {
        let s = DebounceState::seeded(true);
        assert!(s.committed);
        assert_eq!(s.consecutive, 1);
    }

    #[test]
    fn single_differing_reading_suppressed_at_threshold_two() {
        let state = DebounceState::seeded(false);
        let (next, out) = update(&state, true, 2);
        assert!(!out.changed);
        assert!(out.suppressed);
        assert!(!out.committed);
        assert_eq!(next.consecutive, 1);
    }

    #[test]
    fn two_consecutive_readings_commit_at_threshold_two() {
        let state = DebounceState::seeded(false);
        let (state, out1) = update(&state, true, 2);
        assert!(out1.suppressed);
        let (state, out2) = update(&state, true, 2);
        assert!(out2.changed);
        assert!(out2.committed);
        assert!(state.committed);
    }

    #[test]
    fn threshold_one_commits_immediately() {
        let state = DebounceState::seeded(false);
        let (_, out) = update(&state, true, 1);
        assert!(out.changed);
        assert!(!out.suppressed);
    }

    #[test]
    fn threshold_zero_treated_as_one() {
        let state = DebounceState::seeded(false);
        let (_, out) = update(&state, true, 0);
        assert!(out.changed);
    }

    #[test]
    fn flapping_reading_never_commits() {
        // live, offline, live, offline... each run of 1 < threshold 2.
        let (state, changes) = run(false, &[true, false, true, false, true], 2);
        assert_eq!(changes, 0);
        assert!(!state.committed);
    }

    #[test]
    fn counter_resets_on_reading_change() {
        let state = DebounceState::seeded(false);
        let (state, _) = update(&state, true, 3); // consecutive = 1
        let (state, _) = update(&state, true, 3); // consecutive = 2
        let (state, _) = update(&state, false, 3); // reset
        assert_eq!(state.consecutive, 1);
        // Needs three fresh live readings again.
        let (state, _) = update(&state, true, 3);
        let (state, out) = update(&state, true, 3);
        assert!(!out.changed);
        let (_, out) = update(&state, true, 3);
        assert!(out.changed);
    }

    #[test]
    fn matching_reading_is_neither_change_nor_suppression() {
        let state = DebounceState::seeded(true);
        let (_, out) = update(&state, true, 2);
        assert!(!out.changed);
        assert!(!out.suppressed);
    }

    #[test]
    fn full_live_cycle_with_threshold_two() {
        // offline -> live (2 polls) -> stays live -> offline (2 polls)
        let mut state = DebounceState::seeded(false);
        let mut committed_log = Vec::new();
        for &raw in &[true, true, true, false, false] {
            let (next, out) = update(&state, raw, 2);
            if out.changed {
                committed_log.push(out.committed);
            }
            state = next;
        }
        assert_eq!(committed_log, vec![true, false]);
    }

    #[test]
    fn property_commit_requires_threshold_run() {
        // For every prefix of a random-ish sequence, a commit only happens
        // when the trailing run of identical readings differing from the
        // previous committed state reaches the threshold.
        let readings = [
            true, false, false, true, true, true, false, true, false, false, false, true,
        ];
        for threshold in 1..=4u32 {
            let mut state = DebounceState::seeded(false);
            for (i, &raw) in readings.iter().enumerate() {
                let prev_committed = state.committed;
                let (next, out) = update(&state, raw, threshold);
                if out.changed {
                    // Trailing identical run length must be >= threshold.
                    let mut run_len = 0;
                    for j in (0..=i).rev() {
                        if readings[j] == raw {
                            run_len += 1;
                        } else {
                            break;
                        }
                    }
                    assert!(
                        run_len as u32 >= threshold,
                        "commit at index {i} with run {run_len} < threshold {threshold}"
                    );
                    assert_ne!(prev_committed, out.committed);
                }
                state = next;
            }
        }
    }
}

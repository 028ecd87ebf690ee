//! Edge tracking for the active app
//!
//! A key that is already down when an app takes over must not look like a
//! fresh press to that app. The tracker masks such keys until they have been
//! released once, then reports them normally.

use log::debug;

use crate::config::MAX_KEYS;
use crate::types::{self, ButtonVector, EdgeFrame};

// ===================================================================
// Per-key State
// ===================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct KeyTrackState {
    /// Down at activation and not released since
    held_at_start: bool,
    /// Last masked state handed to the app
    reported: bool,
}

// ===================================================================
// Edge Tracker
// ===================================================================

/// Turns raw logical button vectors into edge frames for one app session
#[derive(Clone, Debug)]
pub struct EdgeTracker {
    keys: [KeyTrackState; MAX_KEYS],
    key_count: usize,
}

impl EdgeTracker {
    /// Start tracking with `current` as the state at activation
    pub fn new(current: &ButtonVector) -> Self {
        let mut tracker = Self {
            keys: [KeyTrackState::default(); MAX_KEYS],
            key_count: 0,
        };
        tracker.reseed(current);
        tracker
    }

    /// Restart tracking for a newly activated app
    pub fn reseed(&mut self, current: &ButtonVector) {
        self.key_count = current.len();
        for (key, state) in self.keys.iter_mut().enumerate() {
            *state = KeyTrackState {
                held_at_start: current.get(key).copied().unwrap_or(false),
                reported: false,
            };
        }
        let held = current.iter().filter(|&&down| down).count();
        if held > 0 {
            debug!("Tracker seeded with {} key(s) held", held);
        }
    }

    /// Number of keys covered by emitted frames
    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// Feed one poll's raw logical vector and get the frame for the app
    pub fn update(&mut self, raw: &ButtonVector) -> EdgeFrame {
        let mut before = types::released(self.key_count);
        let mut after = types::released(self.key_count);

        for key in 0..self.key_count {
            let down = raw.get(key).copied().unwrap_or(false);
            let state = &mut self.keys[key];
            let masked = down && !state.held_at_start;

            before[key] = state.reported;
            after[key] = masked;

            state.held_at_start = state.held_at_start && down;
            state.reported = masked;
        }

        EdgeFrame::new(before, after)
    }

    /// Whether `key` is still masked from its activation-time hold
    pub fn is_suppressed(&self, key: usize) -> bool {
        key < self.key_count && self.keys[key].held_at_start
    }
}

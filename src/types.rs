//! Common types shared across the deck host
//!
//! Button vectors are fixed-capacity so a poll never allocates.

use heapless::Vec;

use crate::config::MAX_KEYS;

/// Per-key pressed state for one poll, index = key number
pub type ButtonVector = Vec<bool, MAX_KEYS>;

/// Build a vector of `key_count` released keys
pub fn released(key_count: usize) -> ButtonVector {
    let mut keys = ButtonVector::new();
    for _ in 0..key_count.min(MAX_KEYS) {
        let _ = keys.push(false);
    }
    keys
}

/// Build a vector from a slice, truncated to [`MAX_KEYS`]
pub fn from_slice(states: &[bool]) -> ButtonVector {
    states.iter().copied().take(MAX_KEYS).collect()
}

/// Build a vector of `key_count` keys where only `pressed` are down
pub fn with_pressed(key_count: usize, pressed: &[usize]) -> ButtonVector {
    let mut keys = released(key_count);
    for &key in pressed {
        if let Some(state) = keys.get_mut(key) {
            *state = true;
        }
    }
    keys
}

/// Edge-filtered pair of consecutive button vectors handed to apps
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeFrame {
    pub before: ButtonVector,
    pub after: ButtonVector,
}

impl EdgeFrame {
    pub fn new(before: ButtonVector, after: ButtonVector) -> Self {
        debug_assert_eq!(before.len(), after.len());
        Self { before, after }
    }

    /// Number of keys covered by this frame
    pub fn key_count(&self) -> usize {
        self.after.len()
    }

    /// Key went down between the two polls
    pub fn pressed(&self, key: usize) -> bool {
        !self.state_before(key) && self.state_after(key)
    }

    /// Key came up between the two polls
    pub fn released(&self, key: usize) -> bool {
        self.state_before(key) && !self.state_after(key)
    }

    /// Key is currently held
    pub fn is_down(&self, key: usize) -> bool {
        self.state_after(key)
    }

    /// Keys with a rising edge, in index order
    pub fn presses(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.key_count()).filter(|&key| self.pressed(key))
    }

    /// Keys with a falling edge, in index order
    pub fn releases(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.key_count()).filter(|&key| self.released(key))
    }

    fn state_before(&self, key: usize) -> bool {
        self.before.get(key).copied().unwrap_or(false)
    }

    fn state_after(&self, key: usize) -> bool {
        self.after.get(key).copied().unwrap_or(false)
    }
}

/// Crate version shown in the startup banner
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_reported_per_direction() {
        let frame = EdgeFrame::new(with_pressed(4, &[0, 1]), with_pressed(4, &[1, 2]));
        assert!(frame.released(0));
        assert!(!frame.pressed(1) && !frame.released(1));
        assert!(frame.pressed(2));
        assert_eq!(frame.presses().collect::<std::vec::Vec<_>>(), [2]);
        assert_eq!(frame.releases().collect::<std::vec::Vec<_>>(), [0]);
    }

    #[test]
    fn out_of_range_keys_read_as_released() {
        let frame = EdgeFrame::new(released(3), with_pressed(3, &[2]));
        assert!(!frame.is_down(7));
        assert!(!frame.pressed(7));
    }

    #[test]
    fn vectors_are_capped_at_max_keys() {
        assert_eq!(released(64).len(), MAX_KEYS);
        assert_eq!(from_slice(&[true; 40]).len(), MAX_KEYS);
    }
}

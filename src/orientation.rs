//! Physical mounting of the panel
//!
//! Apps address keys by their upright position. The key map translates those
//! logical indices to physical ones and back, and decides whether outgoing
//! bitmaps need a 180° turn.

use heapless::Vec;
use serde::Deserialize;

use crate::config::MAX_KEYS;
use crate::types::ButtonVector;

/// How the panel is mounted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Orientation {
    /// Reference mounting; images are turned 180° before transmission
    #[default]
    #[serde(rename = "default")]
    Default,
    /// Panel upside down; key order is reversed and images sent as-is
    #[serde(rename = "flipped_180")]
    Flipped180,
}

impl Orientation {
    /// Whether outgoing images are rotated 180°
    pub fn rotates_images(self) -> bool {
        matches!(self, Orientation::Default)
    }
}

/// Permutation from logical to physical key index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    orientation: Orientation,
    map: Vec<u8, MAX_KEYS>,
}

impl KeyMap {
    pub fn new(orientation: Orientation, key_count: usize) -> Self {
        let key_count = key_count.min(MAX_KEYS);
        let map = match orientation {
            Orientation::Default => (0..key_count as u8).collect(),
            Orientation::Flipped180 => (0..key_count as u8).rev().collect(),
        };
        Self { orientation, map }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn key_count(&self) -> usize {
        self.map.len()
    }

    /// Physical index for a logical key, `None` when out of range
    pub fn to_physical(&self, logical: usize) -> Option<usize> {
        self.map.get(logical).map(|&physical| physical as usize)
    }

    /// Reorder a physical button vector into logical order
    pub fn to_logical(&self, physical: &ButtonVector) -> ButtonVector {
        self.map
            .iter()
            .map(|&p| physical.get(p as usize).copied().unwrap_or(false))
            .collect()
    }
}

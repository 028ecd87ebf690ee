//! Per-key press and release callbacks

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, error};

use crate::render::AppKeys;
use crate::types::EdgeFrame;

use super::panic_message;

pub type KeyCallback = Box<dyn FnMut(&AppKeys) + Send>;

/// Handle returned on registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallbackId(u64);

impl core::fmt::Display for CallbackId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyEdge {
    Press,
    Release,
}

struct Entry {
    id: CallbackId,
    edge: KeyEdge,
    callback: KeyCallback,
}

/// Callbacks by key, each list kept in registration order
#[derive(Default)]
pub struct KeyCallbacks {
    by_key: BTreeMap<usize, Vec<Entry>>,
    next_id: u64,
}

impl KeyCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, edge: KeyEdge, key: usize, callback: KeyCallback) -> CallbackId {
        let id = CallbackId(self.next_id);
        self.next_id += 1;
        self.by_key.entry(key).or_default().push(Entry {
            id,
            edge,
            callback,
        });
        debug!("Callback {} registered for {:?} on key {}", id, edge, key);
        id
    }

    pub fn unregister(&mut self, id: CallbackId) -> bool {
        let mut found = false;
        self.by_key.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            found |= entries.len() != before;
            !entries.is_empty()
        });
        found
    }

    pub fn len(&self) -> usize {
        self.by_key.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Drop every callback
    pub fn clear(&mut self) {
        self.by_key.clear();
    }

    /// Fire the callbacks matching the edges in `frame`
    ///
    /// A panicking callback is logged and skipped; the others still run.
    pub fn dispatch(&mut self, frame: &EdgeFrame, keys: &AppKeys) {
        for (&key, entries) in self.by_key.iter_mut() {
            let pressed = frame.pressed(key);
            let released = frame.released(key);
            if !pressed && !released {
                continue;
            }
            for entry in entries.iter_mut() {
                let fire = match entry.edge {
                    KeyEdge::Press => pressed,
                    KeyEdge::Release => released,
                };
                if !fire {
                    continue;
                }
                let callback = &mut entry.callback;
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(keys))) {
                    error!(
                        "Callback {} on key {} panicked: {}",
                        entry.id,
                        key,
                        panic_message(&*payload)
                    );
                }
            }
        }
    }
}

//! Serialized access to the panel
//!
//! Every image write, poll and feature command goes through one
//! [`RenderGate`], so the poll loop and app background threads never
//! interleave on the wire. Callers use logical key numbers; the gate applies
//! the key map and the image rotation for the configured orientation.

use core::cell::RefCell;
use core::ops::Range;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use log::debug;

use crate::config::{BACK_KEY, LAUNCHER_FIRST_KEY};
use crate::device::Device;
use crate::error::PanelError;
use crate::image::KeyImage;
use crate::orientation::{KeyMap, Orientation};
use crate::panel::PanelDriver;
use crate::protocol::PanelDescriptor;
use crate::sprites;
use crate::types::ButtonVector;

type SharedPanel = Mutex<CriticalSectionRawMutex, RefCell<Box<dyn PanelDriver>>>;

// ===================================================================
// Render Gate
// ===================================================================

/// Single-writer gate around the panel driver
#[derive(Clone)]
pub struct RenderGate {
    panel: Arc<SharedPanel>,
    key_map: KeyMap,
    device: Device,
    descriptor: PanelDescriptor,
}

impl RenderGate {
    pub fn new(panel: Box<dyn PanelDriver>, orientation: Orientation) -> Self {
        let device = panel.device();
        let descriptor = panel.descriptor();
        Self {
            key_map: KeyMap::new(orientation, descriptor.key_count),
            panel: Arc::new(Mutex::new(RefCell::new(panel))),
            device,
            descriptor,
        }
    }

    fn with_panel<R>(&self, f: impl FnOnce(&mut dyn PanelDriver) -> R) -> R {
        self.panel.lock(|panel| {
            let mut panel = panel.borrow_mut();
            f(&mut **panel)
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn descriptor(&self) -> &PanelDescriptor {
        &self.descriptor
    }

    pub fn key_count(&self) -> usize {
        self.descriptor.key_count
    }

    pub fn icon_size(&self) -> u32 {
        self.descriptor.icon_pixel_size
    }

    pub fn key_map(&self) -> &KeyMap {
        &self.key_map
    }

    pub fn orientation(&self) -> Orientation {
        self.key_map.orientation()
    }

    /// Write an image to logical `key`; false when out of range or on I/O failure
    pub fn set_key(&self, key: usize, image: &KeyImage) -> bool {
        let Some(physical) = self.key_map.to_physical(key) else {
            return false;
        };
        if self.orientation().rotates_images() {
            let rotated = image.rotated_180();
            self.with_panel(|panel| panel.write_key_image(physical, &rotated))
        } else {
            self.with_panel(|panel| panel.write_key_image(physical, image))
        }
    }

    /// Blank every key, painting the back glyph on key 0 when asked
    pub fn clear_all(&self, with_back_button: bool) -> bool {
        debug!("Clearing panel (back button: {})", with_back_button);
        let blank = sprites::clear(self.icon_size());
        let mut ok = true;
        for key in 0..self.key_count() {
            ok &= self.set_key(key, &blank);
        }
        if with_back_button {
            ok &= self.set_key(BACK_KEY, &sprites::back_button(self.icon_size()));
        }
        ok
    }

    /// Poll the panel; the result is in logical key order
    pub fn poll(&self) -> Result<Option<ButtonVector>, PanelError> {
        let raw = self.with_panel(|panel| panel.poll())?;
        Ok(raw.map(|physical| self.key_map.to_logical(&physical)))
    }

    pub fn set_brightness(&self, percent: u8) -> bool {
        self.with_panel(|panel| panel.set_brightness(percent))
    }

    pub fn set_standby(&self, seconds: u16) -> bool {
        self.with_panel(|panel| panel.set_standby(seconds))
    }

    pub fn close(&self) {
        self.with_panel(|panel| panel.close());
    }
}

// ===================================================================
// App-facing key handle
// ===================================================================

/// Cloneable, thread-safe handle apps use to draw on their keys
///
/// Unprivileged handles cannot touch the back key.
#[derive(Clone)]
pub struct AppKeys {
    gate: RenderGate,
    privileged: bool,
}

impl AppKeys {
    /// Handle for user apps
    pub fn new(gate: RenderGate) -> Self {
        Self {
            gate,
            privileged: false,
        }
    }

    /// Handle for the launcher and the system itself
    pub fn privileged(gate: RenderGate) -> Self {
        Self {
            gate,
            privileged: true,
        }
    }

    pub fn key_count(&self) -> usize {
        self.gate.key_count()
    }

    /// Edge length of key images in pixels
    pub fn icon_size(&self) -> u32 {
        self.gate.icon_size()
    }

    /// Keys an unprivileged app may draw on
    pub fn usable_keys(&self) -> Range<usize> {
        LAUNCHER_FIRST_KEY..self.key_count()
    }

    /// Draw `image` on logical `key`; false if the key is not writable here
    pub fn set_key(&self, key: usize, image: &KeyImage) -> bool {
        if key >= self.key_count() || (key == BACK_KEY && !self.privileged) {
            return false;
        }
        self.gate.set_key(key, image)
    }

    /// Blank one key
    pub fn clear_key(&self, key: usize) -> bool {
        self.set_key(key, &sprites::clear(self.icon_size()))
    }
}

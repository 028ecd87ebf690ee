//! Software-only panel
//!
//! Behaves like a Stream Deck MK.2 without hardware: presses are injected
//! through a [`VirtualPanelHandle`], images are stored in memory. Images are
//! kept turned by 180° on write, mirroring what the real panel does with the
//! bitmaps it receives.

use std::collections::VecDeque;
use std::sync::Arc;

use core::cell::RefCell;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use log::{debug, info};

use super::PanelDriver;
use crate::device::Device;
use crate::error::{PanelError, TransportError};
use crate::image::KeyImage;
use crate::types::{self, ButtonVector};

#[derive(Debug)]
struct VirtualState {
    device: Device,
    /// Latest reported physical state
    keys: ButtonVector,
    pending: VecDeque<ButtonVector>,
    images: Vec<Option<KeyImage>>,
    writes: Vec<usize>,
    brightness: u8,
    standby_secs: Option<u16>,
    disconnected: bool,
    closed: bool,
}

impl VirtualState {
    fn new(device: Device) -> Self {
        let key_count = device.key_count();
        Self {
            device,
            keys: types::released(key_count),
            pending: VecDeque::new(),
            images: vec![None; key_count],
            writes: Vec::new(),
            brightness: 100,
            standby_secs: None,
            disconnected: false,
            closed: false,
        }
    }

    /// State after every queued report has been consumed
    fn latest(&self) -> ButtonVector {
        self.pending.back().unwrap_or(&self.keys).clone()
    }

    fn queue_with(&mut self, key: usize, pressed: bool) {
        let mut next = self.latest();
        if let Some(state) = next.get_mut(key) {
            *state = pressed;
        }
        self.pending.push_back(next);
    }
}

type SharedState = Arc<Mutex<CriticalSectionRawMutex, RefCell<VirtualState>>>;

/// In-memory panel driver
pub struct VirtualPanel {
    state: SharedState,
}

impl VirtualPanel {
    /// Virtual MK.2 plus the handle used to drive it
    pub fn new() -> (Self, VirtualPanelHandle) {
        Self::with_device(Device::Mk2)
    }

    pub fn with_device(device: Device) -> (Self, VirtualPanelHandle) {
        info!("Virtual {} created", device.device_name());
        let state: SharedState = Arc::new(Mutex::new(RefCell::new(VirtualState::new(device))));
        (
            Self {
                state: state.clone(),
            },
            VirtualPanelHandle { state },
        )
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut VirtualState) -> R) -> R {
        self.state.lock(|state| f(&mut state.borrow_mut()))
    }
}

impl PanelDriver for VirtualPanel {
    fn device(&self) -> Device {
        self.with_state(|s| s.device)
    }

    fn poll(&mut self) -> Result<Option<ButtonVector>, PanelError> {
        self.with_state(|s| {
            if s.closed {
                return Err(PanelError::Disconnected(TransportError::Closed));
            }
            if s.disconnected {
                return Err(PanelError::Disconnected(TransportError::Io {
                    reason: "virtual panel unplugged".into(),
                }));
            }
            Ok(s.pending.pop_front().map(|keys| {
                s.keys = keys.clone();
                keys
            }))
        })
    }

    fn write_key_image(&mut self, key: usize, image: &KeyImage) -> bool {
        self.with_state(|s| {
            if s.closed || s.disconnected || key >= s.images.len() {
                return false;
            }
            let size = s.device.descriptor().icon_pixel_size;
            s.images[key] = Some(image.resized(size).rotated_180());
            s.writes.push(key);
            debug!("Virtual key {} updated", key);
            true
        })
    }

    fn set_brightness(&mut self, percent: u8) -> bool {
        self.with_state(|s| {
            s.brightness = percent.min(100);
            !s.closed
        })
    }

    fn set_standby(&mut self, seconds: u16) -> bool {
        self.with_state(|s| {
            s.standby_secs = Some(seconds);
            !s.closed
        })
    }

    fn close(&mut self) {
        self.with_state(|s| s.closed = true);
        info!("Virtual panel closed");
    }
}

/// Test and demo side of a [`VirtualPanel`]
#[derive(Clone)]
pub struct VirtualPanelHandle {
    state: SharedState,
}

impl VirtualPanelHandle {
    fn with_state<R>(&self, f: impl FnOnce(&mut VirtualState) -> R) -> R {
        self.state.lock(|state| f(&mut state.borrow_mut()))
    }

    pub fn key_count(&self) -> usize {
        self.with_state(|s| s.images.len())
    }

    /// Queue a report with physical `key` held down
    pub fn press(&self, key: usize) {
        self.with_state(|s| s.queue_with(key, true));
    }

    /// Queue a report with physical `key` let go
    pub fn release(&self, key: usize) {
        self.with_state(|s| s.queue_with(key, false));
    }

    /// Queue a press report followed by a release report
    pub fn tap(&self, key: usize) {
        self.with_state(|s| {
            s.queue_with(key, true);
            s.queue_with(key, false);
        });
    }

    /// Queue a raw physical button vector
    pub fn queue(&self, keys: ButtonVector) {
        self.with_state(|s| s.pending.push_back(keys));
    }

    /// Reports not yet consumed by a poll
    pub fn pending(&self) -> usize {
        self.with_state(|s| s.pending.len())
    }

    /// Make every following poll fail
    pub fn disconnect(&self) {
        self.with_state(|s| s.disconnected = true);
    }

    /// Image on physical `key` as stored by the panel (turned by 180°)
    pub fn image(&self, key: usize) -> Option<KeyImage> {
        self.with_state(|s| s.images.get(key).cloned().flatten())
    }

    /// Physical keys written so far, in write order
    pub fn writes(&self) -> Vec<usize> {
        self.with_state(|s| s.writes.clone())
    }

    pub fn clear_writes(&self) {
        self.with_state(|s| s.writes.clear());
    }

    pub fn brightness(&self) -> u8 {
        self.with_state(|s| s.brightness)
    }

    /// Last standby timeout written, if any
    pub fn standby(&self) -> Option<u16> {
        self.with_state(|s| s.standby_secs)
    }

    pub fn is_closed(&self) -> bool {
        self.with_state(|s| s.closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::with_pressed;
    use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
    use embedded_graphics::prelude::*;

    #[test]
    fn idle_panel_reports_no_data() {
        let (mut panel, _handle) = VirtualPanel::new();
        assert_eq!(panel.poll().unwrap(), None);
    }

    #[test]
    fn tap_yields_press_then_release() {
        let (mut panel, handle) = VirtualPanel::new();
        handle.tap(3);
        assert_eq!(panel.poll().unwrap(), Some(with_pressed(15, &[3])));
        assert_eq!(panel.poll().unwrap(), Some(types::released(15)));
        assert_eq!(panel.poll().unwrap(), None);
    }

    #[test]
    fn held_keys_stay_down_across_reports() {
        let (mut panel, handle) = VirtualPanel::new();
        handle.press(1);
        handle.tap(2);
        let _ = panel.poll().unwrap();
        assert_eq!(panel.poll().unwrap(), Some(with_pressed(15, &[1, 2])));
        assert_eq!(panel.poll().unwrap(), Some(with_pressed(15, &[1])));
    }

    #[test]
    fn images_are_stored_turned() {
        let (mut panel, handle) = VirtualPanel::new();
        let mut image = KeyImage::new(72);
        Pixel(Point::new(0, 0), Rgb888::RED).draw(&mut image).unwrap();

        assert!(panel.write_key_image(4, &image));
        assert!(!panel.write_key_image(15, &image));
        assert_eq!(handle.image(4).unwrap().pixel(71, 71), Some(Rgb888::RED));
        assert_eq!(handle.image(4).map(|i| i.rotated_180()), Some(image));
        assert_eq!(handle.writes(), [4]);
    }

    #[test]
    fn disconnect_fails_polls() {
        let (mut panel, handle) = VirtualPanel::new();
        handle.disconnect();
        assert!(matches!(panel.poll(), Err(PanelError::Disconnected(_))));
    }

    #[test]
    fn close_is_observable() {
        let (mut panel, handle) = VirtualPanel::new();
        assert!(panel.set_standby(1));
        panel.close();
        assert!(handle.is_closed());
        assert_eq!(handle.standby(), Some(1));
        assert!(!panel.write_key_image(0, &KeyImage::new(72)));
    }
}

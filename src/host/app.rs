//! App plugin contract
//!
//! An app is anything that can draw an icon, set itself up on activation and
//! react to edge frames. The host owns every app; apps only ever see the panel
//! through the [`AppContext`] they are handed.

use core::ops::Range;

use crate::config::LAUNCHER_FIRST_KEY;
use crate::image::KeyImage;
use crate::render::AppKeys;
use crate::types::EdgeFrame;

use super::callbacks::{CallbackId, KeyCallbacks, KeyEdge};

/// Error an app may return from `init` or `update`
pub type AppError = Box<dyn std::error::Error + Send + Sync>;

pub type AppResult = Result<(), AppError>;

/// A program that takes over the panel while active
pub trait App: Send {
    /// Name shown in logs
    fn name(&self) -> &str;

    /// Launcher icon, `size` x `size` pixels
    fn icon(&self, size: u32) -> KeyImage;

    /// Called once each time the app becomes active
    fn init(&mut self, ctx: &mut AppContext<'_>) -> AppResult;

    /// Called with every edge frame while the app is active
    fn update(&mut self, ctx: &mut AppContext<'_>, frame: &EdgeFrame) -> AppResult;

    /// Keys the app may draw on; key 0 belongs to the back button
    fn usable_keys(&self, key_count: usize) -> Range<usize> {
        LAUNCHER_FIRST_KEY..key_count
    }

    /// Called once when the app is stopped
    fn on_close(&mut self) {}
}

/// Action an app asks the host to perform after the current call returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HostRequest {
    Close,
    Launch(usize),
}

/// What an app may do during `init` and `update`
pub struct AppContext<'a> {
    keys: &'a AppKeys,
    callbacks: &'a mut KeyCallbacks,
    request: &'a mut Option<HostRequest>,
}

impl<'a> AppContext<'a> {
    pub(crate) fn new(
        keys: &'a AppKeys,
        callbacks: &'a mut KeyCallbacks,
        request: &'a mut Option<HostRequest>,
    ) -> Self {
        Self {
            keys,
            callbacks,
            request,
        }
    }

    /// Key handle; clone it to draw from background threads
    pub fn keys(&self) -> &AppKeys {
        self.keys
    }

    pub fn key_count(&self) -> usize {
        self.keys.key_count()
    }

    pub fn icon_size(&self) -> u32 {
        self.keys.icon_size()
    }

    /// Draw on logical `key`; false if the key is not writable
    pub fn set_key(&self, key: usize, image: &KeyImage) -> bool {
        self.keys.set_key(key, image)
    }

    /// Return to the launcher once this call finishes
    pub fn close_app(&mut self) {
        *self.request = Some(HostRequest::Close);
    }

    pub(crate) fn launch(&mut self, index: usize) {
        *self.request = Some(HostRequest::Launch(index));
    }

    /// Run `f` on every press of `key` while this app session lasts
    pub fn on_press<F>(&mut self, key: usize, f: F) -> CallbackId
    where
        F: FnMut(&AppKeys) + Send + 'static,
    {
        self.callbacks.register(KeyEdge::Press, key, Box::new(f))
    }

    /// Run `f` on every release of `key` while this app session lasts
    pub fn on_release<F>(&mut self, key: usize, f: F) -> CallbackId
    where
        F: FnMut(&AppKeys) + Send + 'static,
    {
        self.callbacks.register(KeyEdge::Release, key, Box::new(f))
    }

    /// Remove a callback; false if it was already gone
    pub fn unregister(&mut self, id: CallbackId) -> bool {
        self.callbacks.unregister(id)
    }
}

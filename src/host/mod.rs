//! App host and scheduler
//!
//! [`System`] owns the panel (through a [`RenderGate`]), every registered app
//! and the edge tracker. Exactly one app is active at a time: either the
//! built-in launcher or one user app. Logical key 0 is the back button while
//! a user app runs.

pub mod app;
pub mod callbacks;
mod launcher;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use embassy_futures::yield_now;
use embassy_time::Timer;
use log::{debug, error, info, warn};
use portable_atomic::{AtomicBool, Ordering};

use crate::buttons::EdgeTracker;
use crate::config::{SystemConfig, BACK_KEY, SHUTDOWN_STANDBY_SECS};
use crate::error::Error;
use crate::panel::PanelDriver;
use crate::render::{AppKeys, RenderGate};
use crate::sprites;
use crate::types::{self, ButtonVector};

pub use app::{App, AppContext, AppError, AppResult};
pub use callbacks::{CallbackId, KeyCallbacks, KeyEdge};

use app::HostRequest;
use launcher::{Launcher, LauncherEntry};

/// What currently owns the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunState {
    /// Not started yet, or shut down
    Stopped,
    Launcher,
    /// Index of the registered app
    RunningApp(usize),
}

/// Clonable handle that ends [`System::run`] from anywhere
#[derive(Clone, Debug)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    /// Ask the poll loop to shut down at its next iteration
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

// ===================================================================
// System
// ===================================================================

/// Panel plus registered apps plus the launcher
pub struct System {
    gate: RenderGate,
    config: SystemConfig,
    apps: Vec<Box<dyn App>>,
    launcher: Option<Launcher>,
    state: RunState,
    tracker: EdgeTracker,
    /// Latest logical vector, used to seed the tracker on activation
    last_raw: ButtonVector,
    callbacks: KeyCallbacks,
    user_keys: AppKeys,
    system_keys: AppKeys,
    /// Cleared by [`StopHandle::stop`]; armed from construction so an early stop sticks
    running: Arc<AtomicBool>,
    closed: bool,
}

impl System {
    pub fn new(panel: impl PanelDriver + 'static, config: SystemConfig) -> Self {
        let gate = RenderGate::new(Box::new(panel), config.orientation);
        let last_raw = types::released(gate.key_count());
        Self {
            tracker: EdgeTracker::new(&last_raw),
            last_raw,
            user_keys: AppKeys::new(gate.clone()),
            system_keys: AppKeys::privileged(gate.clone()),
            gate,
            config,
            apps: Vec::new(),
            launcher: None,
            state: RunState::Stopped,
            callbacks: KeyCallbacks::new(),
            running: Arc::new(AtomicBool::new(true)),
            closed: false,
        }
    }

    /// Open the first attached panel found on USB
    #[cfg(feature = "hid")]
    pub fn connect(config: SystemConfig) -> Result<Self, Error> {
        use crate::panel::HidPanel;
        use crate::usb;

        let api = hidapi::HidApi::new().map_err(|e| Error::Hid {
            reason: e.to_string(),
        })?;
        let selected = usb::select(usb::discover_all(&api))?;
        let transport = usb::open(&api, &selected)?;
        let panel = HidPanel::new(selected.device, transport)
            .with_read_timeout(config.read_timeout_ms)
            .with_jpeg_quality(config.jpeg_quality);
        Ok(Self::new(panel, config))
    }

    /// Add an app to the launcher; returns its index
    pub fn register_app(&mut self, app: impl App + 'static) -> usize {
        info!("Registered app '{}'", app.name());
        self.apps.push(Box::new(app));
        self.apps.len() - 1
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn gate(&self) -> &RenderGate {
        &self.gate
    }

    /// Unprivileged key handle, as given to user apps
    pub fn keys(&self) -> AppKeys {
        self.user_keys.clone()
    }

    pub fn key_count(&self) -> usize {
        self.gate.key_count()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: self.running.clone(),
        }
    }

    /// Apply panel settings and show the launcher
    ///
    /// A stop requested earlier stays pending; `run` then shuts down at once.
    pub fn start(&mut self) {
        if self.state != RunState::Stopped || self.closed {
            return;
        }
        self.gate.set_standby(self.config.standby_timeout_secs);
        if let Some(brightness) = self.config.brightness {
            self.gate.set_brightness(brightness);
        }
        info!("Started StreamDeck system");
        self.enter_launcher();
    }

    /// Stop whatever is active and start registered app `index`
    pub fn launch(&mut self, index: usize) -> bool {
        if self.state == RunState::Stopped {
            warn!("Cannot launch app {} before start", index);
            return false;
        }
        if index >= self.apps.len() {
            warn!("No app with index {}", index);
            return false;
        }

        self.stop_active();
        self.gate.clear_all(true);
        self.tracker.reseed(&self.last_raw);
        self.state = RunState::RunningApp(index);

        let mut request = None;
        let app = &mut self.apps[index];
        let name = app.name().to_owned();
        info!("Starting app '{}'", name);
        let mut ctx = AppContext::new(&self.user_keys, &mut self.callbacks, &mut request);
        guarded(&name, "init", || app.init(&mut ctx));

        self.apply(request);
        true
    }

    /// Stop the running app and return to a freshly built launcher
    pub fn close_app(&mut self) {
        if self.state == RunState::Stopped {
            return;
        }
        self.enter_launcher();
    }

    /// Feed one logical button vector through the active app
    pub fn process(&mut self, raw: &ButtonVector) {
        self.last_raw = raw.clone();
        let frame = self.tracker.update(raw);

        let mut request = None;
        let state = self.state;
        match state {
            RunState::Stopped => return,
            RunState::RunningApp(_) if frame.released(BACK_KEY) => {
                debug!("Back key released");
                self.close_app();
                return;
            }
            RunState::RunningApp(index) => {
                let app = &mut self.apps[index];
                let name = app.name().to_owned();
                let mut ctx = AppContext::new(&self.user_keys, &mut self.callbacks, &mut request);
                guarded(&name, "update", || app.update(&mut ctx, &frame));
                self.callbacks.dispatch(&frame, &self.user_keys);
            }
            RunState::Launcher => {
                if let Some(launcher) = self.launcher.as_mut() {
                    let mut ctx =
                        AppContext::new(&self.system_keys, &mut self.callbacks, &mut request);
                    guarded("Launcher", "update", || launcher.update(&mut ctx, &frame));
                    self.callbacks.dispatch(&frame, &self.system_keys);
                }
            }
        }
        self.apply(request);
    }

    /// One poll; true if a report was processed
    pub fn poll_once(&mut self) -> Result<bool, Error> {
        match self.gate.poll()? {
            Some(raw) => {
                self.process(&raw);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Poll until stopped or the panel goes away, then shut down
    pub async fn run(&mut self) -> Result<(), Error> {
        self.start();
        info!("Poll loop running");

        while self.running.load(Ordering::Acquire) {
            match self.poll_once() {
                Ok(true) => yield_now().await,
                Ok(false) => self.idle().await,
                Err(e) => {
                    error!("Panel lost: {}", e);
                    self.shutdown();
                    return Err(e);
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    async fn idle(&self) {
        match self.config.poll_interval_ms {
            0 => yield_now().await,
            ms => Timer::after_millis(ms).await,
        }
    }

    /// Stop the active app, blank the panel and release it
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.stop_active();
        self.state = RunState::Stopped;
        self.running.store(false, Ordering::Release);

        self.gate.clear_all(false);
        self.gate.set_standby(SHUTDOWN_STANDBY_SECS);
        self.gate.close();
        self.closed = true;
        info!("StreamDeck system shutdown");
    }

    // ===================================================================
    // Activation
    // ===================================================================

    fn enter_launcher(&mut self) {
        self.stop_active();
        self.gate.clear_all(false);
        self.tracker.reseed(&self.last_raw);
        self.state = RunState::Launcher;

        let size = self.gate.icon_size();
        let entries = self
            .apps
            .iter()
            .map(|app| LauncherEntry {
                name: app.name().to_owned(),
                icon: panic::catch_unwind(AssertUnwindSafe(|| app.icon(size))).unwrap_or_else(
                    |payload| {
                        error!(
                            "App '{}' panicked drawing its icon: {}",
                            app.name(),
                            panic_message(&*payload)
                        );
                        sprites::clear(size)
                    },
                ),
            })
            .collect();

        let mut request = None;
        let launcher = self.launcher.insert(Launcher::new(entries));
        let mut ctx = AppContext::new(&self.system_keys, &mut self.callbacks, &mut request);
        guarded("Launcher", "init", || launcher.init(&mut ctx));
        self.apply(request);
    }

    /// Run the close hook of whatever is active and drop its callbacks
    fn stop_active(&mut self) {
        match self.state {
            RunState::RunningApp(index) => {
                let app = &mut self.apps[index];
                let name = app.name().to_owned();
                guarded(&name, "on_close", || {
                    app.on_close();
                    Ok(())
                });
                info!("Closed app '{}'", name);
            }
            RunState::Launcher => {
                if let Some(mut launcher) = self.launcher.take() {
                    launcher.on_close();
                }
            }
            RunState::Stopped => {}
        }
        self.launcher = None;
        self.callbacks.clear();
        self.state = RunState::Stopped;
    }

    fn apply(&mut self, request: Option<HostRequest>) {
        match request {
            Some(HostRequest::Close) => {
                if let RunState::RunningApp(_) = self.state {
                    self.close_app();
                }
            }
            Some(HostRequest::Launch(index)) => {
                self.launch(index);
            }
            None => {}
        }
    }
}

/// Run app code, logging returned errors and caught panics
fn guarded(app: &str, what: &str, f: impl FnOnce() -> AppResult) {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("App '{}' {} failed: {}", app, what, e),
        Err(payload) => error!(
            "App '{}' panicked in {}: {}",
            app,
            what,
            panic_message(&*payload)
        ),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

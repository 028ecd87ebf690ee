//! Runtime supervisor and monitoring
//!
//! Prints the startup banner and a periodic uptime heartbeat for as long as
//! the system it watches is running.

use embassy_time::{Duration, Instant, Timer};
use log::info;

use crate::config::DEFAULT_HEARTBEAT_SECS;
use crate::device::Device;
use crate::host::StopHandle;
use crate::orientation::Orientation;
use crate::types::APP_VERSION;

/// Supervisor for one [`crate::host::System`]
pub struct AppSupervisor {
    device: Device,
    orientation: Orientation,
    heartbeat: Duration,
    stop: StopHandle,
    started: Instant,
}

impl AppSupervisor {
    pub fn new(device: Device, orientation: Orientation, stop: StopHandle) -> Self {
        Self {
            device,
            orientation,
            heartbeat: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            stop,
            started: Instant::now(),
        }
    }

    /// Seconds between status lines; 0 keeps the default
    pub fn with_heartbeat_secs(mut self, secs: u64) -> Self {
        if secs > 0 {
            self.heartbeat = Duration::from_secs(secs);
        }
        self
    }

    /// Print startup banner with device information
    pub fn print_startup_banner(&self) {
        let device = self.device;
        let identity = device.identity();
        let layout = device.button_layout();
        let descriptor = device.descriptor();

        info!("========================================");
        info!("deck-controls v{}", APP_VERSION);
        info!("StreamDeck host and app launcher");
        info!("========================================");
        info!("Panel: {}", device.device_name());
        info!("USB: VID=0x{:04X} PID=0x{:04X}", identity.vendor_id, identity.product_id);
        info!(
            "Keys: {} ({}x{} layout)",
            layout.total_keys, layout.cols, layout.rows
        );
        info!(
            "Icons: {}x{} per key",
            descriptor.icon_pixel_size, descriptor.icon_pixel_size
        );
        info!("Orientation: {:?}", self.orientation);
        info!("========================================");
    }

    /// Heartbeat loop; returns once the system stops
    pub async fn run(&mut self) {
        info!("Application supervisor started");
        self.started = Instant::now();

        while self.stop.is_running() {
            Timer::after(self.heartbeat).await;
            if self.stop.is_running() {
                self.print_status();
            }
        }
        info!("Application supervisor stopped after {}", self.uptime_label());
    }

    fn print_status(&self) {
        info!("Status: Uptime {}", self.uptime_label());
    }

    fn uptime_label(&self) -> String {
        let minutes = self.uptime().as_secs() / 60;
        let hours = minutes / 60;
        if hours > 0 {
            format!("{}h{}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }

    /// Time since the heartbeat loop started
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

//! deck - run the launcher with a few demo apps
//!
//! Uses the first attached StreamDeck (when built with the `hid` feature) or
//! an in-memory virtual panel driven from stdin:
//!
//! ```text
//! 3      tap physical key 3
//! p 3    press key 3
//! r 3    release key 3
//! q      shut down
//! ```

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use deck_controls::config::SystemConfig;
use deck_controls::host::{App, AppContext, AppResult, StopHandle, System};
use deck_controls::image::KeyImage;
use deck_controls::orientation::Orientation;
use deck_controls::panel::{VirtualPanel, VirtualPanelHandle};
use deck_controls::render::AppKeys;
use deck_controls::sprites;
use deck_controls::supervisor::AppSupervisor;
use deck_controls::types::EdgeFrame;
use embassy_executor::Spawner;
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use log::{error, info, warn};
use portable_atomic::{AtomicBool, Ordering};

// ===================================================================
// Command Line
// ===================================================================

#[derive(Parser, Debug)]
#[command(name = "deck", version, about = "StreamDeck app launcher")]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use an in-memory panel driven from stdin instead of USB
    #[arg(long = "virtual")]
    virtual_panel: bool,

    /// Panel mounting, overrides the configuration file
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// Brightness in percent, overrides the configuration file
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    brightness: Option<u8>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OrientationArg {
    Default,
    #[value(name = "flipped_180")]
    Flipped180,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Default => Orientation::Default,
            OrientationArg::Flipped180 => Orientation::Flipped180,
        }
    }
}

// ===================================================================
// Demo Apps
// ===================================================================

/// Counts presses on any of its keys
struct Counter {
    count: u32,
}

impl Counter {
    fn draw(&self, ctx: &AppContext<'_>) {
        let base = sprites::solid(ctx.icon_size(), Rgb888::new(0, 64, 128));
        ctx.set_key(1, &sprites::labeled(&base, &self.count.to_string()));
    }
}

impl App for Counter {
    fn name(&self) -> &str {
        "Counter"
    }

    fn icon(&self, size: u32) -> KeyImage {
        sprites::labeled(&sprites::solid(size, Rgb888::new(0, 64, 128)), "Count")
    }

    fn init(&mut self, ctx: &mut AppContext<'_>) -> AppResult {
        self.count = 0;
        self.draw(ctx);
        Ok(())
    }

    fn update(&mut self, ctx: &mut AppContext<'_>, frame: &EdgeFrame) -> AppResult {
        let usable = self.usable_keys(ctx.key_count());
        let presses = frame.presses().filter(|key| usable.contains(key)).count();
        if presses > 0 {
            self.count += presses as u32;
            self.draw(ctx);
        }
        Ok(())
    }
}

/// Blinks every usable key from a background thread
struct Blinker {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Blinker {
    fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    fn blink(keys: AppKeys, stop: Arc<AtomicBool>) {
        let size = keys.icon_size();
        let on = sprites::solid(size, Rgb888::YELLOW);
        let mut lit = false;
        while !stop.load(Ordering::Acquire) {
            lit = !lit;
            for key in keys.usable_keys() {
                if lit {
                    keys.set_key(key, &on);
                } else {
                    keys.clear_key(key);
                }
            }
            thread::sleep(Duration::from_millis(500));
        }
    }
}

impl App for Blinker {
    fn name(&self) -> &str {
        "Blinker"
    }

    fn icon(&self, size: u32) -> KeyImage {
        sprites::labeled(&sprites::solid(size, Rgb888::new(96, 96, 0)), "Blink")
    }

    fn init(&mut self, ctx: &mut AppContext<'_>) -> AppResult {
        let keys = ctx.keys().clone();
        let stop = Arc::new(AtomicBool::new(false));
        self.stop = stop.clone();
        self.worker = Some(
            thread::Builder::new()
                .name("blinker".into())
                .spawn(move || Self::blink(keys, stop))?,
        );
        Ok(())
    }

    fn update(&mut self, _ctx: &mut AppContext<'_>, _frame: &EdgeFrame) -> AppResult {
        Ok(())
    }

    fn on_close(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Paints keys from per-key callbacks; the last key exits
struct Palette;

const PALETTE: [Rgb888; 4] = [Rgb888::RED, Rgb888::GREEN, Rgb888::BLUE, Rgb888::WHITE];

impl App for Palette {
    fn name(&self) -> &str {
        "Palette"
    }

    fn icon(&self, size: u32) -> KeyImage {
        sprites::labeled(&sprites::solid(size, Rgb888::new(128, 0, 96)), "Paint")
    }

    fn init(&mut self, ctx: &mut AppContext<'_>) -> AppResult {
        for (offset, color) in PALETTE.into_iter().enumerate() {
            let key = 1 + offset;
            ctx.set_key(key, &sprites::solid(ctx.icon_size(), color));
            ctx.on_press(key, move |keys: &AppKeys| {
                let swatch = sprites::solid(keys.icon_size(), color);
                for target in keys.usable_keys().skip(PALETTE.len()) {
                    keys.set_key(target, &swatch);
                }
            });
        }
        let exit = ctx.key_count() - 1;
        ctx.set_key(exit, &sprites::labeled(&sprites::clear(ctx.icon_size()), "Exit"));
        Ok(())
    }

    fn update(&mut self, ctx: &mut AppContext<'_>, frame: &EdgeFrame) -> AppResult {
        if frame.released(ctx.key_count() - 1) {
            ctx.close_app();
        }
        Ok(())
    }
}

// ===================================================================
// Input
// ===================================================================

/// Read virtual panel commands from stdin until EOF or `q`
fn spawn_console(panel: VirtualPanelHandle, stop: StopHandle) {
    let spawned = thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let mut words = line.split_whitespace();
                let (command, key) = match (words.next(), words.next()) {
                    (Some("q"), _) => break,
                    (Some(command @ ("p" | "r")), Some(key)) => (command, key),
                    (Some(key), None) => ("t", key),
                    _ => continue,
                };
                let Ok(key) = key.parse::<usize>() else {
                    warn!("Ignoring '{}'", line);
                    continue;
                };
                match command {
                    "p" => panel.press(key),
                    "r" => panel.release(key),
                    _ => panel.tap(key),
                }
            }
            stop.stop();
        });
    if let Err(e) = spawned {
        warn!("Console unavailable: {}", e);
    }
}

/// Turn SIGINT and SIGTERM into an orderly shutdown
fn install_signal_handler(stop: StopHandle) {
    let handler = ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping");
        stop.stop();
    });
    if let Err(e) = handler {
        warn!("Failed to register signal handler: {}", e);
    }
}

// ===================================================================
// Main Application Entry Point
// ===================================================================

#[embassy_executor::task]
async fn supervisor_task(mut supervisor: AppSupervisor) {
    supervisor.run().await;
}

fn load_config(cli: &Cli) -> deck_controls::Result<SystemConfig> {
    let mut config = match &cli.config {
        Some(path) => SystemConfig::load(path)?,
        None => SystemConfig::default(),
    };
    if let Some(orientation) = cli.orientation {
        config.orientation = orientation.into();
    }
    if let Some(brightness) = cli.brightness {
        config.brightness = Some(brightness);
    }
    Ok(config)
}

fn build_system(cli: &Cli, config: SystemConfig) -> deck_controls::Result<(System, Option<VirtualPanelHandle>)> {
    if cli.virtual_panel {
        let (panel, handle) = VirtualPanel::new();
        return Ok((System::new(panel, config), Some(handle)));
    }

    #[cfg(feature = "hid")]
    {
        Ok((System::connect(config)?, None))
    }
    #[cfg(not(feature = "hid"))]
    {
        let _ = config;
        Err(deck_controls::Error::Hid {
            reason: "built without the `hid` feature, run with --virtual".into(),
        })
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let setup = load_config(&cli).and_then(|config| build_system(&cli, config));
    let (mut system, virtual_handle) = match setup {
        Ok(setup) => setup,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    system.register_app(Counter { count: 0 });
    system.register_app(Blinker::new());
    system.register_app(Palette);

    let supervisor = AppSupervisor::new(
        system.gate().device(),
        system.config().orientation,
        system.stop_handle(),
    )
    .with_heartbeat_secs(system.config().heartbeat_secs);
    supervisor.print_startup_banner();

    system.start();
    if let Err(e) = spawner.spawn(supervisor_task(supervisor)) {
        warn!("Supervisor not started: {:?}", e);
    }
    install_signal_handler(system.stop_handle());
    if let Some(handle) = virtual_handle {
        spawn_console(handle, system.stop_handle());
        info!("Type a key number to tap it, q to quit");
    }

    let code = match system.run().await {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            1
        }
    };
    std::process::exit(code);
}

//! End-to-end launcher behaviour over a virtual panel

use std::sync::{Arc, Mutex};

use deck_controls::config::SystemConfig;
use deck_controls::error::{Error, PanelError};
use deck_controls::host::{App, AppContext, AppResult, RunState, StopHandle, System};
use deck_controls::image::KeyImage;
use deck_controls::orientation::Orientation;
use deck_controls::panel::{VirtualPanel, VirtualPanelHandle};
use deck_controls::render::AppKeys;
use deck_controls::sprites;
use deck_controls::types::{self, EdgeFrame};
use embedded_graphics::pixelcolor::Rgb888;

type Log = Arc<Mutex<Vec<String>>>;

/// Records every hook call as "<name>:<event>"
struct Recorder {
    name: &'static str,
    color: Rgb888,
    log: Log,
    fail_init: bool,
    panic_on_key: Option<usize>,
    close_on_key: Option<usize>,
    stop_on_key: Option<(usize, StopHandle)>,
    callback_key: Option<usize>,
}

impl Recorder {
    fn new(name: &'static str, color: Rgb888, log: &Log) -> Self {
        Self {
            name,
            color,
            log: log.clone(),
            fail_init: false,
            panic_on_key: None,
            close_on_key: None,
            stop_on_key: None,
            callback_key: None,
        }
    }

    fn record(&self, event: String) {
        self.log.lock().unwrap().push(format!("{}:{}", self.name, event));
    }
}

impl App for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn icon(&self, size: u32) -> KeyImage {
        sprites::solid(size, self.color)
    }

    fn init(&mut self, ctx: &mut AppContext<'_>) -> AppResult {
        self.record("init".into());
        if let Some(key) = self.callback_key {
            let log = self.log.clone();
            let name = self.name;
            ctx.on_press(key, move |_: &AppKeys| {
                log.lock().unwrap().push(format!("{}:callback", name));
            });
        }
        if self.fail_init {
            return Err("init refused".into());
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut AppContext<'_>, frame: &EdgeFrame) -> AppResult {
        for key in frame.presses() {
            self.record(format!("press {}", key));
            if self.panic_on_key == Some(key) {
                panic!("key {} is cursed", key);
            }
            if self.close_on_key == Some(key) {
                ctx.close_app();
            }
            if let Some((stop_key, stop)) = &self.stop_on_key {
                if *stop_key == key {
                    stop.stop();
                }
            }
        }
        for key in frame.releases() {
            self.record(format!("release {}", key));
        }
        Ok(())
    }

    fn on_close(&mut self) {
        self.record("close".into());
    }
}

fn setup(orientation: Orientation) -> (System, VirtualPanelHandle, Log) {
    let (panel, handle) = VirtualPanel::new();
    let config = SystemConfig {
        orientation,
        ..SystemConfig::default()
    };
    (System::new(panel, config), handle, Log::default())
}

fn drain(system: &mut System, handle: &VirtualPanelHandle) {
    while handle.pending() > 0 {
        system.poll_once().unwrap();
    }
}

fn events(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[test]
fn launch_and_back_returns_to_launcher() {
    let (mut system, handle, log) = setup(Orientation::Default);
    system.register_app(Recorder::new("A", Rgb888::new(255, 0, 0), &log));
    system.register_app(Recorder::new("B", Rgb888::new(0, 255, 0), &log));
    system.start();

    // Launcher blanks the panel, then paints A on key 1 and B on key 2
    let writes = handle.writes();
    assert_eq!(&writes[..15], (0..15).collect::<Vec<_>>().as_slice());
    assert_eq!(&writes[15..], &[1, 2]);

    handle.tap(1);
    drain(&mut system, &handle);
    assert_eq!(system.state(), RunState::RunningApp(0));
    assert_eq!(events(&log), ["A:init"]);

    handle.clear_writes();
    handle.tap(0);
    drain(&mut system, &handle);
    assert_eq!(system.state(), RunState::Launcher);
    // The back press reaches the app, the release does not
    assert_eq!(events(&log), ["A:init", "A:press 0", "A:close"]);
    let writes = handle.writes();
    assert!(writes.ends_with(&[1, 2]));
}

#[test]
fn back_press_and_hold_keep_the_app_running() {
    let (mut system, handle, log) = setup(Orientation::Default);
    system.register_app(Recorder::new("A", Rgb888::new(255, 0, 0), &log));
    system.start();
    assert!(system.launch(0));

    handle.press(0);
    for _ in 0..3 {
        handle.queue(types::with_pressed(15, &[0]));
    }
    drain(&mut system, &handle);
    assert_eq!(system.state(), RunState::RunningApp(0));

    handle.release(0);
    drain(&mut system, &handle);
    assert_eq!(system.state(), RunState::Launcher);
}

#[test]
fn back_release_in_launcher_does_nothing() {
    let (mut system, handle, log) = setup(Orientation::Default);
    system.register_app(Recorder::new("A", Rgb888::new(255, 0, 0), &log));
    system.start();

    handle.tap(0);
    handle.tap(5);
    drain(&mut system, &handle);
    assert_eq!(system.state(), RunState::Launcher);
    assert!(events(&log).is_empty());
}

#[test]
fn relaunch_closes_previous_app_exactly_once() {
    let (mut system, _handle, log) = setup(Orientation::Default);
    system.register_app(Recorder::new("A", Rgb888::new(255, 0, 0), &log));
    system.register_app(Recorder::new("B", Rgb888::new(0, 255, 0), &log));
    system.start();

    assert!(system.launch(0));
    assert!(system.launch(1));
    assert_eq!(system.state(), RunState::RunningApp(1));
    assert_eq!(events(&log), ["A:init", "A:close", "B:init"]);
}

#[test]
fn key_held_through_launch_is_masked_until_released() {
    let (mut system, handle, log) = setup(Orientation::Default);
    system.register_app(Recorder::new("A", Rgb888::new(255, 0, 0), &log));
    system.start();

    // Hold key 4, tap key 1 to launch A while 4 stays down
    handle.press(4);
    handle.tap(1);
    drain(&mut system, &handle);
    assert_eq!(system.state(), RunState::RunningApp(0));

    handle.release(4);
    handle.press(4);
    drain(&mut system, &handle);
    assert_eq!(events(&log), ["A:init", "A:press 4"]);
}

#[test]
fn failing_apps_stay_active() {
    let (mut system, handle, log) = setup(Orientation::Default);
    let mut app = Recorder::new("A", Rgb888::new(255, 0, 0), &log);
    app.fail_init = true;
    app.panic_on_key = Some(3);
    system.register_app(app);
    system.start();

    assert!(system.launch(0));
    assert_eq!(system.state(), RunState::RunningApp(0));

    handle.tap(3);
    handle.tap(4);
    drain(&mut system, &handle);
    assert_eq!(system.state(), RunState::RunningApp(0));
    assert_eq!(
        events(&log),
        ["A:init", "A:press 3", "A:release 3", "A:press 4", "A:release 4"]
    );
}

#[test]
fn app_can_close_itself() {
    let (mut system, handle, log) = setup(Orientation::Default);
    let mut app = Recorder::new("A", Rgb888::new(255, 0, 0), &log);
    app.close_on_key = Some(6);
    system.register_app(app);
    system.start();
    system.launch(0);

    handle.press(6);
    drain(&mut system, &handle);
    assert_eq!(system.state(), RunState::Launcher);
    assert_eq!(events(&log), ["A:init", "A:press 6", "A:close"]);
}

#[test]
fn key_callbacks_end_with_the_session() {
    let (mut system, handle, log) = setup(Orientation::Default);
    let mut app = Recorder::new("A", Rgb888::new(255, 0, 0), &log);
    app.callback_key = Some(2);
    system.register_app(app);
    system.start();
    system.launch(0);

    handle.tap(2);
    drain(&mut system, &handle);
    system.close_app();
    system.launch(0);
    handle.tap(2);
    drain(&mut system, &handle);

    let callbacks = events(&log)
        .iter()
        .filter(|e| e.as_str() == "A:callback")
        .count();
    assert_eq!(callbacks, 2);
}

#[test]
fn launcher_shows_at_most_key_count_minus_one_apps() {
    let (mut system, handle, log) = setup(Orientation::Default);
    for _ in 0..20 {
        system.register_app(Recorder::new("X", Rgb888::new(1, 2, 3), &log));
    }
    system.start();
    let icons = &handle.writes()[15..];
    assert_eq!(icons, (1..15).collect::<Vec<_>>().as_slice());
}

#[test]
fn flipped_panel_uses_mirrored_keys() {
    let (mut system, handle, log) = setup(Orientation::Flipped180);
    system.register_app(Recorder::new("A", Rgb888::new(255, 0, 0), &log));
    system.start();

    // Logical key 1 lives on physical key 13
    assert_eq!(handle.writes().last(), Some(&13));
    assert_eq!(
        handle.image(13),
        Some(sprites::solid(72, Rgb888::new(255, 0, 0)).rotated_180())
    );

    handle.tap(13);
    drain(&mut system, &handle);
    assert_eq!(system.state(), RunState::RunningApp(0));

    handle.tap(14);
    drain(&mut system, &handle);
    assert_eq!(system.state(), RunState::Launcher);
}

#[test]
fn run_ends_with_error_when_panel_disappears() {
    let (mut system, handle, log) = setup(Orientation::Default);
    system.register_app(Recorder::new("A", Rgb888::new(255, 0, 0), &log));
    handle.tap(1);
    handle.disconnect();

    let result = embassy_futures::block_on(system.run());
    assert!(matches!(
        result,
        Err(Error::Panel(PanelError::Disconnected(_)))
    ));
    assert_eq!(system.state(), RunState::Stopped);
    assert!(handle.is_closed());
    assert_eq!(handle.standby(), Some(1));
}

#[test]
fn stop_handle_shuts_down_cleanly() {
    let (mut system, handle, log) = setup(Orientation::Default);
    let mut app = Recorder::new("A", Rgb888::new(255, 0, 0), &log);
    app.stop_on_key = Some((3, system.stop_handle()));
    system.register_app(app);

    handle.tap(1);
    handle.tap(3);
    let result = embassy_futures::block_on(system.run());
    assert!(result.is_ok());
    // The loop stops before the queued release is read
    assert_eq!(events(&log), ["A:init", "A:press 3", "A:close"]);
    assert_eq!(handle.pending(), 1);
    assert!(handle.is_closed());
    assert_eq!(handle.standby(), Some(1));
}

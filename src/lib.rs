//! deck-controls - StreamDeck host driver and app launcher
//!
//! Drives a StreamDeck panel over USB HID and hosts a set of apps that take
//! turns owning its keys. A built-in launcher shows one key per registered
//! app; key 0 becomes a back button while an app runs.
//!
//! ## Supported Devices
//! - Stream Deck MK.2 (15 keys, 72x72px, JPEG)
//! - Stream Deck Original V2 (15 keys, 72x72px, JPEG)
//! - Stream Deck XL (32 keys, 96x96px, JPEG)
//!
//! ## Architecture
//! - **Protocol**: pure V2 report codec, no I/O
//! - **Panels**: hidapi-backed panel (feature `hid`) or in-memory virtual panel
//! - **Host**: single async poll loop on Embassy primitives, edge-tracked input
//! - **Rendering**: all writes serialized through one render gate

pub mod buttons;
pub mod config;
pub mod device;
pub mod error;
pub mod host;
pub mod image;
pub mod orientation;
pub mod panel;
pub mod protocol;
pub mod render;
pub mod sprites;
pub mod supervisor;
pub mod transport;
pub mod types;
pub mod usb;

pub use config::SystemConfig;
pub use device::Device;
pub use error::{Error, Result};
pub use host::{App, AppContext, AppResult, RunState, StopHandle, System};
pub use image::KeyImage;
pub use orientation::Orientation;
pub use panel::{PanelDriver, VirtualPanel, VirtualPanelHandle};
pub use render::AppKeys;
pub use types::{ButtonVector, EdgeFrame};

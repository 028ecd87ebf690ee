//! Protocol constants and runtime configuration for the deck host
//!
//! Constants describe the StreamDeck V2 wire protocol as seen from the host.
//! [`SystemConfig`] carries the knobs a deployment may change and can be
//! loaded from TOML.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::orientation::Orientation;

// ===================================================================
// USB Identity
// ===================================================================

pub const USB_VID: u16 = 0x0fd9; // Elgato Systems VID
pub const USB_MANUFACTURER: &str = "Elgato Systems";

// ===================================================================
// Panel Limits
// ===================================================================

/// Largest key count of any supported panel (XL has 32)
pub const MAX_KEYS: usize = 32;

/// Logical key reserved for the back glyph while a user app runs
pub const BACK_KEY: usize = 0;

/// Logical key the Launcher assigns to the first registered app
pub const LAUNCHER_FIRST_KEY: usize = 1;

// ===================================================================
// USB HID Report Sizes
// ===================================================================

pub const HID_REPORT_SIZE_FEATURE: usize = 32; // Feature report size
pub const HID_REPORT_SIZE_OUTPUT: usize = 1024; // Image chunk frame size
pub const HID_READ_BUFFER_SIZE: usize = 512; // Input report read buffer

// ===================================================================
// USB HID Report IDs and Commands
// ===================================================================

// Report types
pub const OUTPUT_REPORT_IMAGE: u8 = 0x02;
pub const IMAGE_COMMAND_V2: u8 = 0x07;
pub const IMAGE_HEADER_LENGTH_V2: usize = 8;
pub const IMAGE_MAX_PAYLOAD_V2: usize = HID_REPORT_SIZE_OUTPUT - IMAGE_HEADER_LENGTH_V2;

// Feature report ids
pub const FEATURE_REPORT_V2_COMMANDS: u8 = 0x03; // V2 command container

// V2 sub-commands (used with FEATURE_REPORT_V2_COMMANDS)
pub const V2_COMMAND_BRIGHTNESS: u8 = 0x08;
pub const V2_COMMAND_STANDBY: u8 = 0x0D;

// Input reports carry a 4 byte header before the key states
pub const KEY_DATA_OFFSET_V2: usize = 4;

// ===================================================================
// Host Timing Defaults
// ===================================================================

pub const DEFAULT_READ_TIMEOUT_MS: i32 = 1;
/// Upper bound for a blocking read; the panel lock is held for its duration
pub const MAX_READ_TIMEOUT_MS: i32 = 1000;
pub const DEFAULT_JPEG_QUALITY: u8 = 90;
pub const DEFAULT_HEARTBEAT_SECS: u64 = 60;

/// Standby timeout written on shutdown so the panel dims right away
pub const SHUTDOWN_STANDBY_SECS: u16 = 1;

// ===================================================================
// Runtime Configuration
// ===================================================================

/// Deployment settings for a [`crate::host::System`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemConfig {
    /// Physical mounting of the panel
    pub orientation: Orientation,
    /// Idle seconds before the panel sleeps (0 = never)
    pub standby_timeout_secs: u16,
    /// Brightness applied at start, if any (0-100%)
    pub brightness: Option<u8>,
    /// Pause between empty polls; 0 only yields to other tasks
    pub poll_interval_ms: u64,
    /// HID read timeout per poll
    pub read_timeout_ms: i32,
    /// JPEG quality used when encoding key images
    pub jpeg_quality: u8,
    /// Seconds between supervisor status lines
    pub heartbeat_secs: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::Default,
            standby_timeout_secs: 0,
            brightness: None,
            poll_interval_ms: 0,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            heartbeat_secs: DEFAULT_HEARTBEAT_SECS,
        }
    }
}

impl SystemConfig {
    /// Parse a configuration from TOML text; missing fields keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(brightness) = self.brightness {
            if brightness > 100 {
                return Err(ConfigError::OutOfRange {
                    field: "brightness",
                    value: i64::from(brightness),
                });
            }
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::OutOfRange {
                field: "jpeg_quality",
                value: i64::from(self.jpeg_quality),
            });
        }
        if !(0..=MAX_READ_TIMEOUT_MS).contains(&self.read_timeout_ms) {
            return Err(ConfigError::OutOfRange {
                field: "read_timeout_ms",
                value: i64::from(self.read_timeout_ms),
            });
        }
        Ok(())
    }
}

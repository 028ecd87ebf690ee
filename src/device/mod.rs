//! Device table for supported StreamDeck panels
//!
//! Every panel here speaks the V2 protocol (JPEG images, 1024 byte output
//! reports), so variants differ only in their identity and descriptor.

use crate::config::{
    IMAGE_HEADER_LENGTH_V2, IMAGE_MAX_PAYLOAD_V2, KEY_DATA_OFFSET_V2, USB_MANUFACTURER, USB_VID,
};
use crate::protocol::PanelDescriptor;

/// USB identity used to pick panels during discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl PanelIdentity {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }
}

impl core::fmt::Display for PanelIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04X}:{:04X}", self.vendor_id, self.product_id)
    }
}

/// Button layout configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonLayout {
    /// Number of button columns
    pub cols: usize,
    /// Number of button rows
    pub rows: usize,
    /// Total number of buttons (cols * rows)
    pub total_keys: usize,
}

impl ButtonLayout {
    pub const fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            total_keys: cols * rows,
        }
    }
}

/// Supported panel models
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Device {
    /// Stream Deck MK.2, the reference panel
    Mk2,
    OriginalV2,
    Xl,
}

impl Device {
    pub const ALL: [Device; 3] = [Device::Mk2, Device::OriginalV2, Device::Xl];

    /// Get device by USB PID
    pub fn from_pid(pid: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.pid() == pid)
    }

    /// Get all supported device PIDs
    pub fn supported_pids() -> [u16; 3] {
        Self::ALL.map(|d| d.pid())
    }

    /// Get PID for this device
    pub const fn pid(&self) -> u16 {
        match self {
            Device::Mk2 => 0x0080,
            Device::OriginalV2 => 0x006d,
            Device::Xl => 0x006c,
        }
    }

    pub const fn identity(&self) -> PanelIdentity {
        PanelIdentity::new(USB_VID, self.pid())
    }

    pub const fn device_name(&self) -> &'static str {
        match self {
            Device::Mk2 => "Stream Deck MK.2",
            Device::OriginalV2 => "Stream Deck Original V2",
            Device::Xl => "Stream Deck XL",
        }
    }

    pub const fn manufacturer(&self) -> &'static str {
        USB_MANUFACTURER
    }

    pub const fn button_layout(&self) -> ButtonLayout {
        match self {
            Device::Mk2 | Device::OriginalV2 => ButtonLayout::new(5, 3),
            Device::Xl => ButtonLayout::new(8, 4),
        }
    }

    /// Protocol parameters for this model
    pub const fn descriptor(&self) -> PanelDescriptor {
        let icon_pixel_size = match self {
            Device::Mk2 | Device::OriginalV2 => 72,
            Device::Xl => 96,
        };
        PanelDescriptor {
            key_count: self.button_layout().total_keys,
            icon_pixel_size,
            key_data_offset: KEY_DATA_OFFSET_V2,
            image_chunk_header_length: IMAGE_HEADER_LENGTH_V2,
            image_chunk_max_payload: IMAGE_MAX_PAYLOAD_V2,
        }
    }

    pub const fn key_count(&self) -> usize {
        self.button_layout().total_keys
    }
}

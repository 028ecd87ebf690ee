//! Panel drivers
//!
//! A [`PanelDriver`] is the only owner of a device connection. The host polls
//! it for button vectors and pushes whole key images through it; chunking and
//! feature reports stay inside the driver.

pub mod virtual_deck;

use log::{debug, info, warn};

use crate::config::{DEFAULT_JPEG_QUALITY, DEFAULT_READ_TIMEOUT_MS, HID_READ_BUFFER_SIZE};
use crate::device::Device;
use crate::error::PanelError;
use crate::image::KeyImage;
use crate::protocol::v2::V2Codec;
use crate::protocol::{PanelDescriptor, ProtocolCodec};
use crate::transport::Transport;
use crate::types::ButtonVector;

pub use virtual_deck::{VirtualPanel, VirtualPanelHandle};

/// Connected panel, physical key numbering
pub trait PanelDriver: Send {
    /// Model this driver talks to
    fn device(&self) -> Device;

    fn descriptor(&self) -> PanelDescriptor {
        self.device().descriptor()
    }

    fn key_count(&self) -> usize {
        self.descriptor().key_count
    }

    /// Read the current button state
    ///
    /// `Ok(None)` means nothing new arrived. An error means the panel is gone.
    fn poll(&mut self) -> Result<Option<ButtonVector>, PanelError>;

    /// Show `image` on physical key `key`; false if any part failed
    fn write_key_image(&mut self, key: usize, image: &KeyImage) -> bool;

    /// Set backlight brightness in percent
    fn set_brightness(&mut self, percent: u8) -> bool;

    /// Set the idle timeout before the panel sleeps (0 = never)
    fn set_standby(&mut self, seconds: u16) -> bool;

    /// Release the connection
    fn close(&mut self);
}

// ===================================================================
// HID panel
// ===================================================================

/// Panel on a real HID connection, speaking the V2 protocol
pub struct HidPanel<T: Transport> {
    device: Device,
    codec: V2Codec,
    transport: T,
    read_buf: Vec<u8>,
    read_timeout_ms: i32,
    jpeg_quality: u8,
}

impl<T: Transport> HidPanel<T> {
    pub fn new(device: Device, transport: T) -> Self {
        Self {
            device,
            codec: V2Codec::for_device(device),
            transport,
            read_buf: vec![0u8; HID_READ_BUFFER_SIZE],
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_read_timeout(mut self, timeout_ms: i32) -> Self {
        self.read_timeout_ms = timeout_ms;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    fn encode(&self, key: usize, image: &KeyImage) -> Result<Vec<Vec<u8>>, PanelError> {
        let size = self.codec.descriptor().icon_pixel_size;
        let jpeg = if image.width() == size && image.height() == size {
            image.to_jpeg(self.jpeg_quality)?
        } else {
            image.resized(size).to_jpeg(self.jpeg_quality)?
        };
        let frames = self
            .codec
            .image_chunks(key, &jpeg)?
            .map(|frame| frame.bytes)
            .collect::<Vec<_>>();
        debug!(
            "Key {}: {} byte JPEG in {} chunk(s)",
            key,
            jpeg.len(),
            frames.len()
        );
        Ok(frames)
    }

    fn send_feature(&mut self, report: &[u8], what: &str) -> bool {
        match self.transport.send_feature_report(report) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send {} report: {}", what, e);
                false
            }
        }
    }
}

impl<T: Transport> PanelDriver for HidPanel<T> {
    fn device(&self) -> Device {
        self.device
    }

    fn poll(&mut self) -> Result<Option<ButtonVector>, PanelError> {
        let len = self
            .transport
            .read(&mut self.read_buf, self.read_timeout_ms)?;
        Ok(self.codec.decode_buttons(&self.read_buf[..len]))
    }

    fn write_key_image(&mut self, key: usize, image: &KeyImage) -> bool {
        // Everything is encoded up front so a bad request never reaches the wire
        let frames = match self.encode(key, image) {
            Ok(frames) => frames,
            Err(e) => {
                warn!("Key {} image rejected: {}", key, e);
                return false;
            }
        };

        for (sequence, frame) in frames.iter().enumerate() {
            if let Err(e) = self.transport.write(frame) {
                warn!("Key {} chunk {} write failed: {}", key, sequence, e);
                return false;
            }
        }
        true
    }

    fn set_brightness(&mut self, percent: u8) -> bool {
        let report = self.codec.brightness_report(percent);
        debug!("Brightness {}%", report[2]);
        self.send_feature(&report, "brightness")
    }

    fn set_standby(&mut self, seconds: u16) -> bool {
        let report = self.codec.standby_report(seconds);
        debug!("Standby timeout {}s", seconds);
        self.send_feature(&report, "standby")
    }

    fn close(&mut self) {
        info!("Closing {}", self.device.device_name());
        self.transport.close();
    }
}

//! USB HID transport backed by hidapi
//!
//! Discovery works on an explicit `HidApi` handle handed in by the caller,
//! so no global device registry is kept between calls. Everything touching
//! hidapi needs the `hid` feature.

use std::ffi::CString;

#[cfg(feature = "hid")]
use hidapi::{HidApi, HidDevice};
use log::info;
#[cfg(feature = "hid")]
use log::{debug, warn};

use crate::device::Device;
#[cfg(feature = "hid")]
use crate::device::PanelIdentity;
use crate::error::Error;
#[cfg(feature = "hid")]
use crate::error::TransportError;
#[cfg(feature = "hid")]
use crate::transport::Transport;

// ===================================================================
// Discovery
// ===================================================================

/// A matching HID device found during enumeration
#[derive(Debug, Clone)]
pub struct DiscoveredPanel {
    pub device: Device,
    pub path: CString,
    pub product: String,
    pub manufacturer: String,
}

impl core::fmt::Display for DiscoveredPanel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.product, self.manufacturer)
    }
}

/// Pick the panel to drive: the first candidate, in discovery order
pub fn select(panels: Vec<DiscoveredPanel>) -> Result<DiscoveredPanel, Error> {
    let selected = panels.into_iter().next().ok_or(Error::NoDeviceFound)?;
    info!("Selected {}", selected);
    Ok(selected)
}

/// Enumerate all attached HID devices matching `identity`
#[cfg(feature = "hid")]
pub fn discover(api: &HidApi, identity: PanelIdentity) -> Vec<DiscoveredPanel> {
    let Some(device) = Device::from_pid(identity.product_id) else {
        warn!("No device table entry for {}", identity);
        return Vec::new();
    };

    api.device_list()
        .filter(|info| {
            info.vendor_id() == identity.vendor_id && info.product_id() == identity.product_id
        })
        .map(|info| DiscoveredPanel {
            device,
            path: info.path().to_owned(),
            product: info
                .product_string()
                .unwrap_or(device.device_name())
                .to_owned(),
            manufacturer: info
                .manufacturer_string()
                .unwrap_or(device.manufacturer())
                .to_owned(),
        })
        .collect()
}

/// Enumerate every supported panel model, in device table order
#[cfg(feature = "hid")]
pub fn discover_all(api: &HidApi) -> Vec<DiscoveredPanel> {
    let panels: Vec<_> = Device::ALL
        .into_iter()
        .flat_map(|device| discover(api, device.identity()))
        .collect();
    debug!("Discovery found {} panel(s)", panels.len());
    panels
}

/// Open a discovered panel
#[cfg(feature = "hid")]
pub fn open(api: &HidApi, panel: &DiscoveredPanel) -> Result<HidTransport, Error> {
    let device = api.open_path(&panel.path).map_err(|e| Error::Hid {
        reason: e.to_string(),
    })?;
    info!("Opened {} at {:?}", panel, panel.path);
    Ok(HidTransport::new(device))
}

// ===================================================================
// Transport
// ===================================================================

/// Open hidapi device handle; dropped on [`Transport::close`]
#[cfg(feature = "hid")]
pub struct HidTransport {
    device: Option<HidDevice>,
}

#[cfg(feature = "hid")]
impl HidTransport {
    pub fn new(device: HidDevice) -> Self {
        Self {
            device: Some(device),
        }
    }

    fn device(&self) -> Result<&HidDevice, TransportError> {
        self.device.as_ref().ok_or(TransportError::Closed)
    }
}

#[cfg(feature = "hid")]
fn io_error(e: hidapi::HidError) -> TransportError {
    TransportError::Io {
        reason: e.to_string(),
    }
}

#[cfg(feature = "hid")]
impl Transport for HidTransport {
    fn read(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError> {
        self.device()?.read_timeout(buf, timeout_ms).map_err(io_error)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.device()?.write(data).map_err(io_error)
    }

    fn send_feature_report(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.device()?.send_feature_report(data).map_err(io_error)
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            info!("Closed HID device");
        }
    }
}

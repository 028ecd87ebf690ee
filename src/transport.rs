//! Byte-level connection to a panel
//!
//! The panel driver only sees this trait, so the protocol path can be driven
//! by hidapi in production and by scripted in-memory transports in tests.

use crate::error::TransportError;

/// An open, exclusively owned device connection
pub trait Transport: Send {
    /// Read one input report into `buf`, waiting at most `timeout_ms`
    ///
    /// Returns the number of bytes read; 0 means nothing arrived in time.
    fn read(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError>;

    /// Write one output report
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Send a feature report (report id in the first byte)
    fn send_feature_report(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Release the device; later calls fail with [`TransportError::Closed`]
    fn close(&mut self);
}

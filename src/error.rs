//! Error types for the deck host
//!
//! Encoding problems are rejected before any I/O, transport failures are
//! reported per call, and only discovery/disconnect failures end a run.

use derive_more::{Display, Error};

/// A write request that cannot be expressed in the wire protocol
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ProtocolError {
    #[display("key {key} outside panel range 0..{key_count}")]
    KeyOutOfRange { key: usize, key_count: usize },
    #[display("payload of {len} bytes needs {chunks} chunks, beyond the 16-bit sequence field")]
    TooManyChunks { len: usize, chunks: usize },
}

/// Low-level failure of the device connection
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum TransportError {
    #[display("HID I/O failed: {reason}")]
    Io { reason: String },
    #[display("transport closed")]
    Closed,
}

/// Key image conversion failure
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ImageError {
    #[display("JPEG encoding failed: {reason}")]
    Encode { reason: String },
    #[display("image {width}x{height} exceeds the encoder limit")]
    TooLarge { width: u32, height: u32 },
}

/// Failure reported by a panel driver
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum PanelError {
    #[display("panel disconnected: {_0}")]
    Disconnected(#[error(source)] TransportError),
    #[display("protocol violation: {_0}")]
    Protocol(#[error(source)] ProtocolError),
    #[display("image error: {_0}")]
    Image(#[error(source)] ImageError),
}

impl From<TransportError> for PanelError {
    fn from(e: TransportError) -> Self {
        PanelError::Disconnected(e)
    }
}

impl From<ProtocolError> for PanelError {
    fn from(e: ProtocolError) -> Self {
        PanelError::Protocol(e)
    }
}

impl From<ImageError> for PanelError {
    fn from(e: ImageError) -> Self {
        PanelError::Image(e)
    }
}

/// Configuration loading failure
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ConfigError {
    #[display("cannot read config '{path}': {reason}")]
    Read { path: String, reason: String },
    #[display("invalid config: {reason}")]
    Parse { reason: String },
    #[display("config field '{field}' out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },
}

/// Top-level error surfaced to callers of the deck host
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum Error {
    #[display("no StreamDeck found")]
    NoDeviceFound,
    #[display("HID backend unavailable: {reason}")]
    Hid { reason: String },
    #[display("{_0}")]
    Panel(#[error(source)] PanelError),
    #[display("{_0}")]
    Config(#[error(source)] ConfigError),
}

impl From<PanelError> for Error {
    fn from(e: PanelError) -> Self {
        Error::Panel(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

//! StreamDeck V2 protocol codec
//!
//! Covers Original V2, MK.2 and XL panels: JPEG key images in 1024 byte
//! output reports and 32 byte feature reports under id 0x03.

use super::{ChunkHeader, FeatureReport, PanelDescriptor, ProtocolCodec};
use crate::config::{
    FEATURE_REPORT_V2_COMMANDS, HID_REPORT_SIZE_FEATURE, IMAGE_COMMAND_V2, IMAGE_HEADER_LENGTH_V2,
    OUTPUT_REPORT_IMAGE, V2_COMMAND_BRIGHTNESS, V2_COMMAND_STANDBY,
};
use crate::device::Device;

/// V2 codec for JPEG-based StreamDeck devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V2Codec {
    descriptor: PanelDescriptor,
}

impl V2Codec {
    pub const fn new(descriptor: PanelDescriptor) -> Self {
        Self { descriptor }
    }

    pub const fn for_device(device: Device) -> Self {
        Self::new(device.descriptor())
    }

    fn command(sub_command: u8, args: &[u8]) -> FeatureReport {
        let mut report = [0u8; HID_REPORT_SIZE_FEATURE];
        report[0] = FEATURE_REPORT_V2_COMMANDS;
        report[1] = sub_command;
        report[2..2 + args.len()].copy_from_slice(args);
        report
    }
}

impl ProtocolCodec for V2Codec {
    fn descriptor(&self) -> &PanelDescriptor {
        &self.descriptor
    }

    // [0x02, 0x07, key_id, is_last, len_lo, len_hi, seq_lo, seq_hi]
    fn encode_image_header(&self, header: &ChunkHeader, out: &mut [u8]) {
        let [len_lo, len_hi] = header.payload_len.to_le_bytes();
        let [seq_lo, seq_hi] = header.sequence.to_le_bytes();
        out[..IMAGE_HEADER_LENGTH_V2].copy_from_slice(&[
            OUTPUT_REPORT_IMAGE,
            IMAGE_COMMAND_V2,
            header.key,
            header.is_last as u8,
            len_lo,
            len_hi,
            seq_lo,
            seq_hi,
        ]);
    }

    fn brightness_report(&self, percent: u8) -> FeatureReport {
        Self::command(V2_COMMAND_BRIGHTNESS, &[percent.min(100)])
    }

    fn standby_report(&self, seconds: u16) -> FeatureReport {
        Self::command(V2_COMMAND_STANDBY, &seconds.to_le_bytes())
    }
}

/// Parse the header of an encoded image chunk
///
/// Some HID stacks strip the report id before handing data over, so both
/// the 8 byte form and the 7 byte form without the leading 0x02 are accepted.
pub fn decode_image_header(frame: &[u8]) -> Option<ChunkHeader> {
    let fields = match frame {
        [OUTPUT_REPORT_IMAGE, IMAGE_COMMAND_V2, rest @ ..] => rest,
        [IMAGE_COMMAND_V2, rest @ ..] => rest,
        _ => return None,
    };
    match fields {
        [key, is_last, len_lo, len_hi, seq_lo, seq_hi, ..] => Some(ChunkHeader {
            key: *key,
            is_last: *is_last != 0,
            payload_len: u16::from_le_bytes([*len_lo, *len_hi]),
            sequence: u16::from_le_bytes([*seq_lo, *seq_hi]),
        }),
        _ => None,
    }
}

//! StreamDeck wire protocol, host side
//!
//! Pure encode/decode of the three message families a panel understands:
//! input reports (button state), chunked image writes, and feature reports.
//! Nothing in here performs I/O.

pub mod v2;

use crate::config::HID_REPORT_SIZE_FEATURE;
use crate::error::ProtocolError;
use crate::types::ButtonVector;

/// Protocol parameters that vary per hardware model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelDescriptor {
    pub key_count: usize,
    /// Edge length of the square key bitmap in pixels
    pub icon_pixel_size: u32,
    /// Offset of the first key state byte in an input report
    pub key_data_offset: usize,
    pub image_chunk_header_length: usize,
    pub image_chunk_max_payload: usize,
}

impl PanelDescriptor {
    /// Size of every image chunk frame on the wire
    pub const fn image_frame_length(&self) -> usize {
        self.image_chunk_header_length + self.image_chunk_max_payload
    }

    /// Number of chunks needed for a payload; an empty payload still takes one
    pub const fn chunk_count(&self, payload_len: usize) -> usize {
        if payload_len == 0 {
            1
        } else {
            payload_len.div_ceil(self.image_chunk_max_payload)
        }
    }
}

/// Fixed-size feature report buffer
pub type FeatureReport = [u8; HID_REPORT_SIZE_FEATURE];

/// Fields carried by every image chunk header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub key: u8,
    pub is_last: bool,
    pub payload_len: u16,
    pub sequence: u16,
}

/// Header encoding and feature commands of one protocol family
pub trait ProtocolCodec {
    /// Get the descriptor this codec was built for
    fn descriptor(&self) -> &PanelDescriptor;

    /// Write a chunk header into `out` (exactly `image_chunk_header_length` bytes)
    fn encode_image_header(&self, header: &ChunkHeader, out: &mut [u8]);

    /// Build the brightness feature report
    fn brightness_report(&self, percent: u8) -> FeatureReport;

    /// Build the standby-timeout feature report (0 = never)
    fn standby_report(&self, seconds: u16) -> FeatureReport;

    /// Decode an input report into button states
    fn decode_buttons(&self, data: &[u8]) -> Option<ButtonVector> {
        decode_button_report(self.descriptor(), data)
    }

    /// Split an encoded bitmap into image chunk frames for `key`
    fn image_chunks<'a>(
        &'a self,
        key: usize,
        payload: &'a [u8],
    ) -> Result<ImageChunks<'a, Self>, ProtocolError>
    where
        Self: Sized,
    {
        ImageChunks::new(self, key, payload)
    }
}

/// Decode a raw input report
///
/// An empty read means "no new data". A report too short to hold every key
/// is treated the same way rather than as an error.
pub fn decode_button_report(descriptor: &PanelDescriptor, data: &[u8]) -> Option<ButtonVector> {
    if data.is_empty() {
        return None;
    }
    let start = descriptor.key_data_offset;
    let keys = data.get(start..start + descriptor.key_count)?;
    Some(keys.iter().map(|&b| b != 0).collect())
}

/// One encoded image chunk, padded to the full frame length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFrame {
    pub header: ChunkHeader,
    pub bytes: Vec<u8>,
}

impl ImageFrame {
    /// The payload portion of the frame without header or padding
    pub fn payload(&self, header_len: usize) -> &[u8] {
        &self.bytes[header_len..header_len + self.header.payload_len as usize]
    }
}

/// Iterator over the chunk frames of one image write
#[derive(Debug)]
pub struct ImageChunks<'a, C: ProtocolCodec> {
    codec: &'a C,
    key: u8,
    payload: &'a [u8],
    next_index: usize,
    total: usize,
}

impl<'a, C: ProtocolCodec> ImageChunks<'a, C> {
    fn new(codec: &'a C, key: usize, payload: &'a [u8]) -> Result<Self, ProtocolError> {
        let descriptor = codec.descriptor();
        if key >= descriptor.key_count {
            return Err(ProtocolError::KeyOutOfRange {
                key,
                key_count: descriptor.key_count,
            });
        }

        let total = descriptor.chunk_count(payload.len());
        if total > u16::MAX as usize + 1 {
            return Err(ProtocolError::TooManyChunks {
                len: payload.len(),
                chunks: total,
            });
        }

        Ok(Self {
            codec,
            key: key as u8,
            payload,
            next_index: 0,
            total,
        })
    }

    /// Total number of frames this write produces
    pub fn total(&self) -> usize {
        self.total
    }
}

impl<C: ProtocolCodec> Iterator for ImageChunks<'_, C> {
    type Item = ImageFrame;

    fn next(&mut self) -> Option<ImageFrame> {
        if self.next_index >= self.total {
            return None;
        }

        let descriptor = self.codec.descriptor();
        let max_payload = descriptor.image_chunk_max_payload;
        let header_len = descriptor.image_chunk_header_length;

        let start = self.next_index * max_payload;
        let end = (start + max_payload).min(self.payload.len());
        let chunk = &self.payload[start.min(end)..end];

        let header = ChunkHeader {
            key: self.key,
            is_last: self.next_index + 1 == self.total,
            payload_len: chunk.len() as u16,
            sequence: self.next_index as u16,
        };

        // Short chunks are zero padded to the full frame
        let mut bytes = vec![0u8; descriptor.image_frame_length()];
        self.codec
            .encode_image_header(&header, &mut bytes[..header_len]);
        bytes[header_len..header_len + chunk.len()].copy_from_slice(chunk);

        self.next_index += 1;
        Some(ImageFrame { header, bytes })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next_index;
        (remaining, Some(remaining))
    }
}

impl<C: ProtocolCodec> ExactSizeIterator for ImageChunks<'_, C> {}

#[cfg(test)]
mod tests {
    use super::v2::V2Codec;
    use super::*;
    use crate::device::Device;

    fn codec() -> V2Codec {
        V2Codec::new(Device::Mk2.descriptor())
    }

    #[test]
    fn empty_read_is_no_data() {
        assert_eq!(codec().decode_buttons(&[]), None);
    }

    #[test]
    fn short_report_is_no_data() {
        assert_eq!(codec().decode_buttons(&[0x01, 0x00, 0x0f, 0x00, 1, 0]), None);
    }

    #[test]
    fn report_keys_start_after_header() {
        let mut report = [0u8; 512];
        report[0] = 0x01;
        report[4] = 1; // key 0
        report[4 + 14] = 0xff; // key 14
        report[4 + 15] = 1; // beyond the panel, ignored
        let keys = codec().decode_buttons(&report).unwrap();
        assert_eq!(keys.len(), 15);
        assert!(keys[0] && keys[14]);
        assert_eq!(keys.iter().filter(|&&k| k).count(), 2);
    }

    #[test]
    fn image_of_2500_bytes_takes_three_chunks() {
        let codec = codec();
        let payload: Vec<u8> = (0..2500).map(|i| (i % 251) as u8).collect();
        let frames: Vec<ImageFrame> = codec.image_chunks(3, &payload).unwrap().collect();

        let lens: Vec<u16> = frames.iter().map(|f| f.header.payload_len).collect();
        let last: Vec<bool> = frames.iter().map(|f| f.header.is_last).collect();
        let seq: Vec<u16> = frames.iter().map(|f| f.header.sequence).collect();
        assert_eq!(lens, [1016, 1016, 468]);
        assert_eq!(last, [false, false, true]);
        assert_eq!(seq, [0, 1, 2]);
        assert!(frames.iter().all(|f| f.bytes.len() == 1024));

        let last_frame = &frames[2];
        assert_eq!(
            &last_frame.bytes[..8],
            &[0x02, 0x07, 3, 1, 0xd4, 0x01, 0x02, 0x00]
        );
        assert!(last_frame.bytes[8 + 468..].iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_payload_is_one_final_chunk() {
        let codec = codec();
        let frames: Vec<ImageFrame> = codec.image_chunks(0, &[]).unwrap().collect();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].header.is_last);
        assert_eq!(frames[0].header.payload_len, 0);
    }

    #[test]
    fn key_out_of_range_is_rejected() {
        let codec = codec();
        let err = codec.image_chunks(15, &[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::KeyOutOfRange {
                key: 15,
                key_count: 15
            }
        );
    }

    #[test]
    fn sequence_overflow_is_rejected() {
        let descriptor = PanelDescriptor {
            image_chunk_max_payload: 1,
            ..Device::Mk2.descriptor()
        };
        let codec = V2Codec::new(descriptor);
        let payload = vec![0u8; u16::MAX as usize + 2];
        assert!(matches!(
            codec.image_chunks(1, &payload),
            Err(ProtocolError::TooManyChunks { .. })
        ));

        let payload = vec![0u8; u16::MAX as usize + 1];
        assert_eq!(codec.image_chunks(1, &payload).unwrap().total(), 65536);
    }
}

//! HidPanel over a scripted in-memory transport

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use deck_controls::device::Device;
use deck_controls::error::{PanelError, TransportError};
use deck_controls::image::KeyImage;
use deck_controls::panel::{HidPanel, PanelDriver};
use deck_controls::protocol::v2::decode_image_header;
use deck_controls::transport::Transport;
use deck_controls::types;

#[derive(Default)]
struct Script {
    reads: VecDeque<Result<Vec<u8>, TransportError>>,
    writes: Vec<Vec<u8>>,
    features: Vec<Vec<u8>>,
    fail_write_at: Option<usize>,
    closed: bool,
}

#[derive(Clone, Default)]
struct ScriptedTransport(Arc<Mutex<Script>>);

impl ScriptedTransport {
    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.0.lock().unwrap()
    }
}

impl Transport for ScriptedTransport {
    fn read(&mut self, buf: &mut [u8], _timeout_ms: i32) -> Result<usize, TransportError> {
        match self.script().reads.pop_front() {
            Some(Ok(report)) => {
                let len = report.len().min(buf.len());
                buf[..len].copy_from_slice(&report[..len]);
                Ok(len)
            }
            Some(Err(e)) => Err(e),
            None => Ok(0),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let mut script = self.script();
        if script.fail_write_at == Some(script.writes.len()) {
            return Err(TransportError::Io {
                reason: "pipe stalled".into(),
            });
        }
        script.writes.push(data.to_vec());
        Ok(data.len())
    }

    fn send_feature_report(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.script().features.push(data.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.script().closed = true;
    }
}

fn panel() -> (HidPanel<ScriptedTransport>, ScriptedTransport) {
    let transport = ScriptedTransport::default();
    (HidPanel::new(Device::Mk2, transport.clone()), transport)
}

/// Pseudo-random pixels, which JPEG cannot squeeze into one chunk
fn noisy_image(size: u32) -> KeyImage {
    let mut seed = 0x1234_5678u32;
    let rgb: Vec<u8> = (0..size * size * 3)
        .map(|_| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (seed >> 24) as u8
        })
        .collect();
    KeyImage::from_rgb888(size, size, &rgb).unwrap()
}

#[test]
fn input_report_decodes_key_states() {
    let (mut panel, transport) = panel();
    let mut report = vec![0u8; 512];
    report[0] = 0x01;
    report[4 + 7] = 1;
    transport.script().reads.push_back(Ok(report));

    assert_eq!(panel.poll().unwrap(), Some(types::with_pressed(15, &[7])));
    assert_eq!(panel.poll().unwrap(), None);
}

#[test]
fn read_failure_is_a_disconnect() {
    let (mut panel, transport) = panel();
    transport.script().reads.push_back(Err(TransportError::Io {
        reason: "device gone".into(),
    }));
    assert!(matches!(panel.poll(), Err(PanelError::Disconnected(_))));
}

#[test]
fn image_is_sent_as_ordered_padded_chunks() {
    let (mut panel, transport) = panel();
    let image = noisy_image(72);
    let jpeg = image.to_jpeg(90).unwrap();

    assert!(panel.write_key_image(9, &image));

    let script = transport.script();
    let expected_chunks = jpeg.len().div_ceil(1016);
    assert!(expected_chunks >= 2);
    assert_eq!(script.writes.len(), expected_chunks);

    let mut payload = Vec::new();
    for (index, frame) in script.writes.iter().enumerate() {
        assert_eq!(frame.len(), 1024);
        let header = decode_image_header(frame).unwrap();
        assert_eq!(header.key, 9);
        assert_eq!(header.sequence as usize, index);
        assert_eq!(header.is_last, index + 1 == expected_chunks);
        payload.extend_from_slice(&frame[8..8 + header.payload_len as usize]);
    }
    assert_eq!(payload, jpeg);
}

#[test]
fn off_size_images_are_scaled_to_the_icon() {
    let (mut panel, transport) = panel();
    let image = KeyImage::new(70);
    let scaled = image.resized(72).to_jpeg(90).unwrap();

    assert!(panel.write_key_image(0, &image));
    let script = transport.script();
    let frame = &script.writes[0];
    let header = decode_image_header(frame).unwrap();
    assert_eq!(&frame[8..8 + header.payload_len as usize], scaled.as_slice());
}

#[test]
fn out_of_range_key_never_reaches_the_wire() {
    let (mut panel, transport) = panel();
    assert!(!panel.write_key_image(15, &KeyImage::new(72)));
    assert!(transport.script().writes.is_empty());
}

#[test]
fn failed_chunk_aborts_the_write() {
    let (mut panel, transport) = panel();
    transport.script().fail_write_at = Some(1);

    assert!(!panel.write_key_image(2, &noisy_image(72)));
    assert_eq!(transport.script().writes.len(), 1);
}

#[test]
fn feature_reports_match_the_wire_format() {
    let (mut panel, transport) = panel();
    assert!(panel.set_brightness(55));
    assert!(panel.set_standby(600));

    let script = transport.script();
    let mut brightness = vec![0u8; 32];
    brightness[..3].copy_from_slice(&[0x03, 0x08, 55]);
    let mut standby = vec![0u8; 32];
    standby[..4].copy_from_slice(&[0x03, 0x0D, 0x58, 0x02]);
    assert_eq!(script.features, [brightness, standby]);
}

#[test]
fn close_releases_the_transport() {
    let (mut panel, transport) = panel();
    panel.close();
    assert!(transport.script().closed);
}

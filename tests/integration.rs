//! Integration tests for proxmark-client.
//!
//! These drive the public client against the scripted mock bus.

use proxmark_client::catalog::OperationOutcome;
use proxmark_client::protocol::{opcodes, CommandFrame, PAYLOAD_SIZE};
use proxmark_client::transport::{MockBus, MockTransport};
use proxmark_client::{DrainEnd, ProxError, Proxmark, ProxmarkBuilder, TransportError};

/// Emulates the firmware's replies for tune, LF read and sample chunks.
fn fake_firmware(transport: &MockTransport) {
    transport.set_responder(|req| match req.opcode {
        opcodes::TUNE => Some(
            CommandFrame::new(opcodes::TUNE_RESULT)
                .with_ext1(0x0014_0032)
                .with_ext2(300)
                .with_ext3(0x0010_0005),
        ),
        opcodes::LF_READ | opcodes::HF_READ_ISO14443A => Some(CommandFrame::new(0x0100)),
        opcodes::DOWNLOAD_SAMPLES => {
            // Encode the chunk offset into the first byte so ordering is visible.
            let mut payload = vec![0x80u8; PAYLOAD_SIZE];
            payload[0] = 0x80u8.wrapping_add((req.ext1 / 12) as u8);
            let chunk = CommandFrame::new(opcodes::SAMPLES_CHUNK).with_payload(payload);
            Some(chunk)
        }
        _ => None,
    });
}

fn open() -> (MockBus, MockTransport, Proxmark<MockTransport>) {
    let bus = MockBus::with_proxmark();
    let transport = bus.transport();
    fake_firmware(&transport);
    let pm = ProxmarkBuilder::new().open(&bus).unwrap();
    (bus, transport, pm)
}

#[test]
fn test_tune_reference_values() {
    let (_bus, _transport, mut pm) = open();
    let readings = pm.tune().unwrap();

    let text: Vec<String> = readings.iter().map(|r| r.to_string()).collect();
    assert_eq!(
        text,
        vec![
            "125kHz v=50mV z=5 ohms",
            "134kHz v=20mV z=5 ohms",
            "13.56MHz v=300mV z=16 ohms",
        ]
    );
}

#[test]
fn test_tune_unexpected_opcode() {
    let bus = MockBus::with_proxmark();
    bus.transport().push_response(&CommandFrame::new(0x999));
    let mut pm = ProxmarkBuilder::new().open(&bus).unwrap();

    let err = pm.tune().unwrap_err();
    assert!(matches!(
        err,
        ProxError::Protocol {
            expected_opcode: 0x401,
            actual_opcode: 0x999
        }
    ));
}

#[test]
fn test_lf_read_125khz_downloads_samples() {
    let (_bus, transport, mut pm) = open();
    let samples = pm.lf_read_125khz().unwrap();

    assert_eq!(samples.len(), 11 * 48);
    // First byte of chunk k is 0x80 + k, i.e. sample k.
    for k in 0..11 {
        assert_eq!(samples.as_slice()[k * 48], k as i8);
    }

    let frames = transport.written_frames();
    assert_eq!(frames[0].opcode, opcodes::LF_READ);
    assert_eq!(frames[0].ext1, 0);
    assert!(frames[1..].iter().all(|f| f.opcode == 0x204));
}

#[test]
fn test_lf_read_134khz_sets_high_mode() {
    let (_bus, transport, mut pm) = open();
    pm.lf_read_134khz().unwrap();
    assert_eq!(transport.written_frames()[0].ext1, 1);
}

#[test]
fn test_hf_read_iso14443a_downloads_1000() {
    let (_bus, transport, mut pm) = open();
    let samples = pm.hf_read_iso14443a(Some(2)).unwrap();

    assert_eq!(samples.len(), 84 * 48);
    assert_eq!(transport.written_frames()[0].ext1, 2);
}

#[test]
fn test_samples_clamped_request_count() {
    let (_bus, transport, mut pm) = open();
    let samples = pm.samples(20_000).unwrap();

    let offsets: Vec<u32> = transport.written_frames().iter().map(|f| f.ext1).collect();
    assert_eq!(offsets.len(), 1334);
    assert_eq!(&offsets[..3], &[0, 12, 24]);
    assert_eq!(*offsets.last().unwrap(), 15_996);
    assert_eq!(samples.len(), 1334 * 48);
}

#[test]
fn test_streaming_operations_send_and_return() {
    let (_bus, transport, mut pm) = open();
    pm.lf_hid_fsk_demod().unwrap();
    pm.hf_snoop_iso14443a().unwrap();

    let sent: Vec<u32> = transport
        .written_frames()
        .iter()
        .map(|f| f.opcode)
        .collect();
    assert_eq!(sent, vec![0x208, 0x383]);
    assert_eq!(transport.pending_replies(), 0);
}

#[test]
fn test_run_by_name() {
    let (_bus, _transport, mut pm) = open();
    assert!(matches!(
        pm.run("tune", None).unwrap(),
        OperationOutcome::Response(ref f) if f.opcode == opcodes::TUNE_RESULT
    ));
    assert!(matches!(
        pm.run("hf_read_iso7816", None),
        Err(ProxError::UnknownOperation(_))
    ));
}

#[test]
fn test_read_msgs_drains_until_quiet() {
    let (_bus, transport, mut pm) = open();
    transport.push_response(&CommandFrame::new(0x0100));
    transport.push_response(&CommandFrame::new(0x0101));

    let drained = pm.read_msgs();
    assert!(drained.is_quiet());
    assert_eq!(drained.frames.len(), 2);
}

#[test]
fn test_read_msgs_reports_fault() {
    let (_bus, transport, mut pm) = open();
    transport.push_read_error(TransportError::Transfer {
        endpoint: 0x82,
        reason: "stall".to_string(),
    });

    let drained = pm.read_msgs();
    assert!(drained.frames.is_empty());
    assert!(matches!(drained.end, DrainEnd::Fault(ProxError::Transport(_))));
}

#[test]
fn test_device_not_found_leaves_nothing_open() {
    let bus = MockBus::empty();
    let result = ProxmarkBuilder::new().open(&bus);

    assert!(matches!(result, Err(ProxError::DeviceNotFound { .. })));
    assert_eq!(bus.open_count(), 0);
    assert_eq!(bus.transport().release_count(), 0);
}

#[test]
fn test_release_on_error_path() {
    let bus = MockBus::with_proxmark();
    let transport = bus.transport();

    let result = (|| -> Result<(), ProxError> {
        let mut pm = ProxmarkBuilder::new().open(&bus)?;
        pm.tune()?; // nothing queued: times out
        pm.close()
    })();

    assert!(matches!(result, Err(ProxError::Transport(ref e)) if e.is_timeout()));
    assert_eq!(transport.release_count(), 1);
}

#[test]
fn test_explicit_close_releases_exactly_once() {
    let (bus, transport, pm) = open();
    pm.close().unwrap();
    assert_eq!(transport.release_count(), 1);
    assert_eq!(bus.claimed_interface(), None);
}

//! Chunked sample download.
//!
//! The device's sample buffer is fetched one request at a time: opcode
//! `0x204` with the chunk offset in `ext1`, answered by `0x205` whose payload
//! holds unsigned 8-bit samples. Offsets advance by [`CHUNK_STRIDE`] while
//! every reply contributes its whole payload (48 bytes on the wire), so a
//! request for `n` samples yields `ceil(n / 12) * 48` values. That ratio is
//! the firmware's addressing and is kept as observed.

use crate::dispatch::CommandDispatcher;
use crate::error::Result;
use crate::protocol::{opcodes, CommandFrame};
use crate::transport::Transport;

/// Default number of samples requested.
pub const DEFAULT_SAMPLE_COUNT: usize = 128;

/// Largest sample count a download may request.
pub const MAX_SAMPLE_COUNT: usize = 16_000;

/// Offset step between consecutive chunk requests.
pub const CHUNK_STRIDE: usize = 12;

/// Map an unsigned wire byte to a signed sample (`byte - 128`).
#[inline]
pub fn byte_to_sample(byte: u8) -> i8 {
    (byte ^ 0x80) as i8
}

/// Chunk offsets requested for `n` samples, after clamping.
pub fn chunk_offsets(n: usize) -> impl Iterator<Item = usize> {
    (0..n.min(MAX_SAMPLE_COUNT)).step_by(CHUNK_STRIDE)
}

/// Append-only sequence of signed 8-bit samples.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleBuffer {
    samples: Vec<i8>,
}

impl SampleBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` samples.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Append one wire byte as a sample.
    #[inline]
    pub fn push_byte(&mut self, byte: u8) {
        self.samples.push(byte_to_sample(byte));
    }

    /// Append every byte of a chunk payload.
    pub fn extend_from_payload(&mut self, payload: &[u8]) {
        let samples = payload.iter().copied().map(byte_to_sample);
        self.samples.extend(samples);
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Borrow the samples.
    #[inline]
    pub fn as_slice(&self) -> &[i8] {
        &self.samples
    }

    /// Take ownership of the samples.
    pub fn into_vec(self) -> Vec<i8> {
        self.samples
    }
}

impl AsRef<[i8]> for SampleBuffer {
    fn as_ref(&self) -> &[i8] {
        &self.samples
    }
}

/// Download `n` samples (clamped to [`MAX_SAMPLE_COUNT`]).
///
/// # Errors
///
/// Fails on the first transport error or on a reply other than `0x205`.
pub fn download_samples<T: Transport>(
    dispatcher: &mut CommandDispatcher<T>,
    n: usize,
) -> Result<SampleBuffer> {
    if n > MAX_SAMPLE_COUNT {
        tracing::debug!("Sample count {} clamped to {}", n, MAX_SAMPLE_COUNT);
    }

    let mut buffer = SampleBuffer::new();
    for offset in chunk_offsets(n) {
        let request = CommandFrame::new(opcodes::DOWNLOAD_SAMPLES).with_ext1(offset as u32);
        let reply = dispatcher.exchange(&request, opcodes::SAMPLES_CHUNK)?;
        tracing::trace!(
            "Chunk at offset {}: {} bytes",
            offset,
            reply.payload().len()
        );
        buffer.extend_from_payload(reply.payload());
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::error::ProxError;
    use crate::protocol::PAYLOAD_SIZE;
    use crate::session::DeviceSession;
    use crate::transport::MockTransport;

    fn chunk_server() -> (MockTransport, CommandDispatcher<MockTransport>) {
        let transport = MockTransport::new();
        let chunk =
            CommandFrame::new(opcodes::SAMPLES_CHUNK).with_payload(vec![0x80u8; PAYLOAD_SIZE]);
        transport.set_responder(move |req| match req.opcode {
            opcodes::DOWNLOAD_SAMPLES => Some(chunk.clone()),
            _ => None,
        });
        let dispatcher = CommandDispatcher::new(DeviceSession::from_transport(
            transport.clone(),
            SessionConfig::default(),
        ));
        (transport, dispatcher)
    }

    #[test]
    fn test_byte_to_sample() {
        assert_eq!(byte_to_sample(128), 0);
        assert_eq!(byte_to_sample(0), -128);
        assert_eq!(byte_to_sample(255), 127);
        assert_eq!(byte_to_sample(129), 1);
        assert_eq!(byte_to_sample(127), -1);
    }

    #[test]
    fn test_chunk_offsets() {
        assert_eq!(chunk_offsets(0).count(), 0);
        assert_eq!(chunk_offsets(12).collect::<Vec<_>>(), vec![0]);
        assert_eq!(chunk_offsets(13).collect::<Vec<_>>(), vec![0, 12]);
        assert_eq!(chunk_offsets(128).count(), 11);
    }

    #[test]
    fn test_chunk_offsets_clamp() {
        let offsets: Vec<_> = chunk_offsets(20_000).collect();
        assert_eq!(offsets.len(), 1334);
        assert_eq!(offsets[1], 12);
        assert_eq!(*offsets.last().unwrap(), 15_996);
    }

    #[test]
    fn test_download_default_count() {
        let (transport, mut dispatcher) = chunk_server();
        let samples = download_samples(&mut dispatcher, DEFAULT_SAMPLE_COUNT).unwrap();

        // ceil(128 / 12) = 11 requests, 48 samples each.
        assert_eq!(samples.len(), 11 * 48);
        assert!(samples.as_slice().iter().all(|&s| s == 0));

        let offsets: Vec<u32> = transport.written_frames().iter().map(|f| f.ext1).collect();
        assert_eq!(offsets, (0..128).step_by(12).collect::<Vec<u32>>());
    }

    #[test]
    fn test_download_clamps_to_max() {
        let (transport, mut dispatcher) = chunk_server();
        let samples = download_samples(&mut dispatcher, 20_000).unwrap();

        let frames = transport.written_frames();
        assert_eq!(frames.len(), 1334);
        assert!(frames.iter().all(|f| f.opcode == 0x204));
        assert_eq!(frames.last().unwrap().ext1, 15_996);
        assert_eq!(samples.len(), 1334 * 48);
    }

    #[test]
    fn test_download_maps_payload_bytes() {
        let transport = MockTransport::new();
        let mut payload = vec![0x80u8; PAYLOAD_SIZE];
        payload[0] = 0;
        payload[1] = 255;
        let chunk = CommandFrame::new(opcodes::SAMPLES_CHUNK).with_payload(payload);
        transport.push_response(&chunk);
        let mut dispatcher = CommandDispatcher::new(DeviceSession::from_transport(
            transport,
            SessionConfig::default(),
        ));

        let samples = download_samples(&mut dispatcher, 1).unwrap();
        assert_eq!(&samples.as_slice()[..3], &[-128, 127, 0]);
    }

    #[test]
    fn test_download_wrong_opcode() {
        let transport = MockTransport::new();
        transport.push_response(&CommandFrame::new(opcodes::SAMPLES_CHUNK));
        transport.push_response(&CommandFrame::new(0x999));
        let mut dispatcher = CommandDispatcher::new(DeviceSession::from_transport(
            transport,
            SessionConfig::default(),
        ));

        let err = download_samples(&mut dispatcher, 24).unwrap_err();
        assert_eq!(err.actual_opcode(), Some(0x999));
        assert!(matches!(err, ProxError::Protocol { expected_opcode: 0x205, .. }));
    }

    #[test]
    fn test_sample_buffer_append_only() {
        let mut buffer = SampleBuffer::with_capacity(4);
        assert!(buffer.is_empty());
        buffer.push_byte(200);
        buffer.extend_from_payload(&[0, 128]);
        assert_eq!(buffer.as_ref(), &[72, -128, 0]);
        assert_eq!(buffer.into_vec(), vec![72, -128, 0]);
    }
}

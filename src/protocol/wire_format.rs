//! Wire format encoding and decoding.
//!
//! Every command and response is a fixed 64-byte frame:
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────┬──────────────┐
//! │ Opcode   │ Ext1     │ Ext2     │ Ext3     │ Payload      │
//! │ uint32 LE│ uint32 LE│ uint32 LE│ uint32 LE│ 48 bytes     │
//! └──────────┴──────────┴──────────┴──────────┴──────────────┘
//! ```
//!
//! Header words use the device's native order, which is little endian.

/// Header size in bytes (four u32 words).
pub const HEADER_SIZE: usize = 16;

/// Payload size in bytes.
pub const PAYLOAD_SIZE: usize = 48;

/// Total frame size in bytes (fixed, exactly 64).
pub const FRAME_SIZE: usize = HEADER_SIZE + PAYLOAD_SIZE;

/// Opcodes understood by the device firmware.
pub mod opcodes {
    /// ISO15693 read.
    pub const HF_READ_ISO15693: u32 = 0x300;
    /// ISO14443A read (one debug response, then samples).
    pub const HF_READ_ISO14443A: u32 = 0x301;
    /// ISO15693 reader mode.
    pub const HF_ISO15693_READER: u32 = 0x310;
    /// ISO15693 tag simulation.
    pub const HF_SIM_ISO15693: u32 = 0x311;
    /// ISO14443A snoop (runs until the device button is pressed).
    pub const HF_SNOOP_ISO14443A: u32 = 0x383;
    /// ISO14443A reader emulation.
    pub const HF_ISO14443A_READER: u32 = 0x385;

    /// LF acquisition (ext1 = 1 selects 134 kHz).
    pub const LF_READ: u32 = 0x203;
    /// Request one chunk of the sample buffer (ext1 = offset).
    pub const DOWNLOAD_SAMPLES: u32 = 0x204;
    /// Reply carrying one chunk of the sample buffer.
    pub const SAMPLES_CHUNK: u32 = 0x205;
    /// Transmit the current sample buffer.
    pub const LF_XMIT: u32 = 0x207;
    /// HID FSK demodulation (runs until the device button is pressed).
    pub const LF_HID_FSK_DEMOD: u32 = 0x208;

    /// Antenna tuning measurement.
    pub const TUNE: u32 = 0x400;
    /// Reply carrying the tuning measurements.
    pub const TUNE_RESULT: u32 = 0x401;
}

/// Decoded header words of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    /// Command or response identifier.
    pub opcode: u32,
    /// First extension word.
    pub ext1: u32,
    /// Second extension word.
    pub ext2: u32,
    /// Third extension word.
    pub ext3: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(opcode: u32, ext1: u32, ext2: u32, ext3: u32) -> Self {
        Self {
            opcode,
            ext1,
            ext2,
            ext3,
        }
    }

    /// Encode header to bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use proxmark_client::protocol::Header;
    ///
    /// let bytes = Header::new(0x400, 0, 0, 0).encode();
    /// assert_eq!(bytes.len(), 16);
    /// assert_eq!(&bytes[..4], &[0x00, 0x04, 0x00, 0x00]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (16 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..4].copy_from_slice(&self.opcode.to_le_bytes());
        buf[4..8].copy_from_slice(&self.ext1.to_le_bytes());
        buf[8..12].copy_from_slice(&self.ext2.to_le_bytes());
        buf[12..16].copy_from_slice(&self.ext3.to_le_bytes());
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            opcode: read_u32(buf, 0),
            ext1: read_u32(buf, 4),
            ext2: read_u32(buf, 8),
            ext3: read_u32(buf, 12),
        })
    }
}

#[inline]
fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

/// Encode a header to bytes (standalone function).
#[inline]
pub fn encode_header(header: &Header) -> [u8; HEADER_SIZE] {
    header.encode()
}

/// Decode a header from bytes (standalone function).
#[inline]
pub fn decode_header(buf: &[u8]) -> Option<Header> {
    Header::decode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encode_decode_roundtrip() {
        let original = Header::new(0x205, 12, 0xDEAD_BEEF, u32::MAX);
        let decoded = Header::decode(&original.encode()).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_header_little_endian_byte_order() {
        let header = Header::new(0x0403_0201, 0x0807_0605, 0x0C0B_0A09, 0x100F_0E0D);
        let bytes = header.encode();
        let expected: Vec<u8> = (1..=16).collect();
        assert_eq!(&bytes[..], &expected[..]);
    }

    #[test]
    fn test_frame_size_is_exactly_64() {
        assert_eq!(HEADER_SIZE, 16);
        assert_eq!(PAYLOAD_SIZE, 48);
        assert_eq!(FRAME_SIZE, 64);
    }

    #[test]
    fn test_decode_too_short_buffer() {
        let buf = [0u8; 15];
        assert!(Header::decode(&buf).is_none());
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut buf = [0xFFu8; FRAME_SIZE];
        Header::new(0x401, 1, 2, 3).encode_into(&mut buf);
        assert_eq!(Header::decode(&buf), Some(Header::new(0x401, 1, 2, 3)));
    }

    #[test]
    fn test_standalone_functions() {
        let header = Header::new(opcodes::TUNE, 0, 0, 0);
        let encoded = encode_header(&header);
        assert_eq!(decode_header(&encoded), Some(header));
    }
}

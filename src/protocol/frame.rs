//! Command frame with typed accessors.
//!
//! A [`CommandFrame`] is a plain value: four header words plus the payload.
//! Encoding always yields exactly [`FRAME_SIZE`] bytes; payloads shorter than
//! 48 bytes are zero-padded and longer ones truncated. Decoding keeps every
//! byte past the header verbatim, so a decoded frame carries the padded form.
//!
//! # Example
//!
//! ```
//! use proxmark_client::protocol::{CommandFrame, FRAME_SIZE, PAYLOAD_SIZE};
//!
//! let frame = CommandFrame::new(0x301).with_ext1(7).with_payload(&b"abc"[..]);
//! let bytes = frame.encode();
//! assert_eq!(bytes.len(), FRAME_SIZE);
//!
//! let decoded = CommandFrame::decode(&bytes).unwrap();
//! assert_eq!(decoded.header(), frame.header());
//! assert_eq!(decoded.payload().len(), PAYLOAD_SIZE);
//! assert_eq!(&decoded.payload()[..3], b"abc");
//! ```

use bytes::Bytes;

use super::wire_format::{Header, FRAME_SIZE, HEADER_SIZE, PAYLOAD_SIZE};
use crate::error::{ProxError, Result};

/// One 64-byte command or response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    /// Command or response identifier.
    pub opcode: u32,
    /// First extension word.
    pub ext1: u32,
    /// Second extension word.
    pub ext2: u32,
    /// Third extension word.
    pub ext3: u32,
    /// Payload bytes (48 on the wire).
    pub payload: Bytes,
}

impl CommandFrame {
    /// Create a frame with zero extension words and a zeroed payload.
    pub fn new(opcode: u32) -> Self {
        Self {
            opcode,
            ext1: 0,
            ext2: 0,
            ext3: 0,
            payload: Bytes::from(vec![0u8; PAYLOAD_SIZE]),
        }
    }

    /// Create a frame from header words and payload bytes (copies data).
    pub fn from_parts(header: Header, payload: &[u8]) -> Self {
        Self {
            opcode: header.opcode,
            ext1: header.ext1,
            ext2: header.ext2,
            ext3: header.ext3,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Set the first extension word.
    pub fn with_ext1(mut self, ext1: u32) -> Self {
        self.ext1 = ext1;
        self
    }

    /// Set the second extension word.
    pub fn with_ext2(mut self, ext2: u32) -> Self {
        self.ext2 = ext2;
        self
    }

    /// Set the third extension word.
    pub fn with_ext3(mut self, ext3: u32) -> Self {
        self.ext3 = ext3;
        self
    }

    /// Replace the payload.
    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Header words of this frame.
    #[inline]
    pub fn header(&self) -> Header {
        Header::new(self.opcode, self.ext1, self.ext2, self.ext3)
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Encode into a fresh 64-byte buffer.
    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        let mut buf = [0u8; FRAME_SIZE];
        self.header().encode_into(&mut buf[..HEADER_SIZE]);
        let n = self.payload.len().min(PAYLOAD_SIZE);
        buf[HEADER_SIZE..HEADER_SIZE + n].copy_from_slice(&self.payload[..n]);
        buf
    }

    /// Decode a frame received from the device.
    ///
    /// # Errors
    ///
    /// Returns [`ProxError::FrameTooShort`] if fewer than 16 bytes are given.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let header = Header::decode(buf).ok_or(ProxError::FrameTooShort { len: buf.len() })?;
        Ok(Self::from_parts(header, &buf[HEADER_SIZE..]))
    }
}

/// Encode a frame from its parts (standalone function).
pub fn encode_frame(
    opcode: u32,
    ext1: u32,
    ext2: u32,
    ext3: u32,
    payload: &[u8],
) -> [u8; FRAME_SIZE] {
    CommandFrame::from_parts(Header::new(opcode, ext1, ext2, ext3), payload).encode()
}

/// Decode a frame from bytes (standalone function).
#[inline]
pub fn decode_frame(buf: &[u8]) -> Result<CommandFrame> {
    CommandFrame::decode(buf)
}

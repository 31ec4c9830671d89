//! Protocol module - wire format and frame types.
//!
//! This module implements the fixed-size frame protocol:
//! - 16-byte header encoding/decoding
//! - Frame struct with payload padding on encode
//! - Opcode table

mod frame;
mod wire_format;

pub use frame::{decode_frame, encode_frame, CommandFrame};
pub use wire_format::{
    decode_header, encode_header, opcodes, Header, FRAME_SIZE, HEADER_SIZE, PAYLOAD_SIZE,
};

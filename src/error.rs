//! Error types for proxmark-client.

use thiserror::Error;

/// Main error type for all Proxmark operations.
#[derive(Debug, Error)]
pub enum ProxError {
    /// No attached device matched the configured vendor/product pair.
    #[error("Proxmark not found (vendor 0x{vendor_id:04x}, product 0x{product_id:04x})")]
    DeviceNotFound {
        /// Vendor ID that was searched for.
        vendor_id: u16,
        /// Product ID that was searched for.
        product_id: u16,
    },

    /// I/O failure or timeout while opening, claiming, writing or reading.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The device answered with an opcode the operation did not expect.
    #[error("Unexpected response opcode 0x{actual_opcode:x} (expected 0x{expected_opcode:x})")]
    Protocol {
        /// Opcode the operation was waiting for.
        expected_opcode: u32,
        /// Opcode actually received.
        actual_opcode: u32,
    },

    /// Frame bytes too short to hold the four header words.
    #[error("Frame too short: {len} bytes, need at least 16")]
    FrameTooShort {
        /// Number of bytes supplied.
        len: usize,
    },

    /// Operation name not present in the catalog.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Malformed session configuration document.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl ProxError {
    /// Returns the unexpected opcode carried by a protocol error.
    pub fn actual_opcode(&self) -> Option<u32> {
        match self {
            ProxError::Protocol { actual_opcode, .. } => Some(*actual_opcode),
            _ => None,
        }
    }
}

/// Errors raised by a USB transport backend.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying OS / USB stack error.
    #[error("USB I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A bulk transfer completed with an error status.
    #[error("Transfer on endpoint 0x{endpoint:02x} failed: {reason}")]
    Transfer {
        /// Endpoint address.
        endpoint: u8,
        /// Backend-provided reason.
        reason: String,
    },

    /// A bulk transfer did not complete within its timeout.
    #[error("Transfer on endpoint 0x{endpoint:02x} timed out after {timeout_ms}ms")]
    Timeout {
        /// Endpoint address.
        endpoint: u8,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// The device accepted fewer bytes than the frame holds.
    #[error("Short write on endpoint 0x{endpoint:02x}: {written} of {expected} bytes")]
    ShortWrite {
        /// Endpoint address.
        endpoint: u8,
        /// Bytes actually written.
        written: usize,
        /// Bytes that should have been written.
        expected: usize,
    },

    /// The interface was already released.
    #[error("Device disconnected")]
    Disconnected,
}

impl TransportError {
    /// Check if this error is a transfer timeout.
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

/// Result type alias using ProxError.
pub type Result<T> = std::result::Result<T, ProxError>;

//! Synchronous command dispatch.
//!
//! The device protocol is strictly half-duplex: one command is written, then
//! its response (if any) is read before the next command goes out. There are
//! no sequence numbers; the response opcode is the only acknowledgment.

use crate::error::{ProxError, Result};
use crate::protocol::{CommandFrame, FRAME_SIZE};
use crate::session::DeviceSession;
use crate::transport::Transport;

/// Sends frames and reads responses over a [`DeviceSession`].
pub struct CommandDispatcher<T: Transport> {
    session: DeviceSession<T>,
}

impl<T: Transport> CommandDispatcher<T> {
    /// Create a dispatcher over an open session.
    pub fn new(session: DeviceSession<T>) -> Self {
        Self { session }
    }

    /// Get a reference to the underlying session.
    pub fn session(&self) -> &DeviceSession<T> {
        &self.session
    }

    /// Consume the dispatcher, returning the session.
    pub fn into_session(self) -> DeviceSession<T> {
        self.session
    }

    /// Encode and write one frame.
    pub fn send_command(&mut self, frame: &CommandFrame) -> Result<()> {
        tracing::debug!(
            "-> opcode 0x{:x} ext=({}, {}, {})",
            frame.opcode,
            frame.ext1,
            frame.ext2,
            frame.ext3
        );
        self.session.write(&frame.encode())
    }

    /// Write a frame carrying only `opcode`.
    pub fn send(&mut self, opcode: u32) -> Result<()> {
        self.send_command(&CommandFrame::new(opcode))
    }

    /// Read and decode one 64-byte response.
    pub fn recv_response(&mut self) -> Result<CommandFrame> {
        let bytes = self.session.read(FRAME_SIZE)?;
        let frame = CommandFrame::decode(&bytes)?;
        tracing::debug!(
            "<- opcode 0x{:x} ext=({}, {}, {}) payload={}B",
            frame.opcode,
            frame.ext1,
            frame.ext2,
            frame.ext3,
            frame.payload().len()
        );
        Ok(frame)
    }

    /// Send `request` and read its response, which must carry `expected_opcode`.
    ///
    /// # Errors
    ///
    /// Returns [`ProxError::Protocol`] with the received opcode on mismatch.
    pub fn exchange(
        &mut self,
        request: &CommandFrame,
        expected_opcode: u32,
    ) -> Result<CommandFrame> {
        self.send_command(request)?;
        let response = self.recv_response()?;
        if response.opcode != expected_opcode {
            return Err(ProxError::Protocol {
                expected_opcode,
                actual_opcode: response.opcode,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::error::TransportError;
    use crate::protocol::opcodes;
    use crate::transport::MockTransport;

    fn dispatcher(transport: &MockTransport) -> CommandDispatcher<MockTransport> {
        CommandDispatcher::new(DeviceSession::from_transport(
            transport.clone(),
            SessionConfig::default(),
        ))
    }

    #[test]
    fn test_send_writes_64_bytes_to_out_endpoint() {
        let transport = MockTransport::new();
        dispatcher(&transport).send(opcodes::TUNE).unwrap();

        let writes = transport.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, 0x01);
        assert_eq!(writes[0].1.len(), 64);
        assert_eq!(transport.written_frames()[0].opcode, 0x400);
    }

    #[test]
    fn test_exchange_returns_matching_response() {
        let transport = MockTransport::new();
        let reply = CommandFrame::new(opcodes::TUNE_RESULT).with_ext2(300);
        transport.push_response(&reply);

        let response = dispatcher(&transport)
            .exchange(&CommandFrame::new(opcodes::TUNE), opcodes::TUNE_RESULT)
            .unwrap();
        assert_eq!(response.ext2, 300);
    }

    #[test]
    fn test_exchange_opcode_mismatch() {
        let transport = MockTransport::new();
        transport.push_response(&CommandFrame::new(0x999));

        let err = dispatcher(&transport)
            .exchange(&CommandFrame::new(opcodes::TUNE), opcodes::TUNE_RESULT)
            .unwrap_err();
        assert!(matches!(
            err,
            ProxError::Protocol {
                expected_opcode: 0x401,
                actual_opcode: 0x999
            }
        ));
    }

    #[test]
    fn test_recv_short_frame() {
        let transport = MockTransport::new();
        transport.push_raw(vec![0u8; 8]);
        let err = dispatcher(&transport).recv_response().unwrap_err();
        assert!(matches!(err, ProxError::FrameTooShort { len: 8 }));
    }

    #[test]
    fn test_recv_timeout_is_transport_error() {
        let transport = MockTransport::new();
        let err = dispatcher(&transport).recv_response().unwrap_err();
        assert!(matches!(err, ProxError::Transport(ref e) if e.is_timeout()));
    }

    #[test]
    fn test_send_failure_skips_read() {
        let transport = MockTransport::new();
        transport.push_write_error(TransportError::Disconnected);
        transport.push_response(&CommandFrame::new(opcodes::TUNE_RESULT));

        let result = dispatcher(&transport)
            .exchange(&CommandFrame::new(opcodes::TUNE), opcodes::TUNE_RESULT);
        assert!(matches!(
            result,
            Err(ProxError::Transport(TransportError::Disconnected))
        ));
        assert_eq!(transport.pending_replies(), 1);
    }
}

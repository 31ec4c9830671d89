//! Draining trailing responses.
//!
//! After some operations the device keeps emitting frames for a while. A
//! drain reads until the IN endpoint goes quiet. A read timeout is taken as
//! the end of the stream; any other transport failure also stops the drain
//! but is reported as [`DrainEnd::Fault`] so the caller can tell them apart.

use crate::dispatch::CommandDispatcher;
use crate::error::ProxError;
use crate::protocol::CommandFrame;
use crate::transport::Transport;

/// Why a drain stopped.
#[derive(Debug)]
pub enum DrainEnd {
    /// A read timed out: no more data.
    Quiet,
    /// A read failed for another reason.
    Fault(ProxError),
}

/// Frames collected by a drain and how it ended.
#[derive(Debug)]
pub struct Drained {
    /// Frames read, in arrival order.
    pub frames: Vec<CommandFrame>,
    /// Termination status.
    pub end: DrainEnd,
}

impl Drained {
    /// Check if the drain ended on a timeout.
    pub fn is_quiet(&self) -> bool {
        matches!(self.end, DrainEnd::Quiet)
    }
}

/// Read responses until the endpoint goes quiet or a read fails.
pub fn drain_all<T: Transport>(dispatcher: &mut CommandDispatcher<T>) -> Drained {
    let mut frames = Vec::new();
    loop {
        match dispatcher.recv_response() {
            Ok(frame) => frames.push(frame),
            Err(ProxError::Transport(e)) if e.is_timeout() => {
                tracing::debug!("Drain ended quietly after {} frames", frames.len());
                return Drained {
                    frames,
                    end: DrainEnd::Quiet,
                };
            }
            Err(e) => {
                tracing::warn!("Drain stopped after {} frames: {}", frames.len(), e);
                return Drained {
                    frames,
                    end: DrainEnd::Fault(e),
                };
            }
        }
    }
}

//! Scripted in-memory USB backend.
//!
//! All handles created from one [`MockBus`] share a single state, so a test
//! can keep a [`MockTransport`] clone for scripting and inspection while the
//! session owns another.
//!
//! Reads pop queued replies in order. An empty queue reads as a timeout,
//! which is what a quiet device looks like on the wire.
//!
//! # Example
//!
//! ```
//! use proxmark_client::protocol::CommandFrame;
//! use proxmark_client::transport::{MockBus, Transport};
//! use std::time::Duration;
//!
//! let bus = MockBus::with_proxmark();
//! let mut transport = bus.transport();
//! transport.push_response(&CommandFrame::new(0x401));
//!
//! let bytes = transport.bulk_read(0x82, 64, Duration::from_millis(10)).unwrap();
//! assert_eq!(bytes.len(), 64);
//! assert!(transport.bulk_read(0x82, 64, Duration::from_millis(10)).is_err());
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{InterfaceSelection, Transport, TransportResult, UsbBus, UsbDevice, UsbDeviceInfo};
use crate::config::{PRODUCT_ID, VENDOR_ID};
use crate::error::TransportError;
use crate::protocol::CommandFrame;

type Responder = Box<dyn FnMut(&CommandFrame) -> Option<CommandFrame> + Send>;

#[derive(Default)]
struct MockState {
    replies: VecDeque<TransportResult<Vec<u8>>>,
    write_errors: VecDeque<TransportError>,
    release_error: Option<TransportError>,
    responder: Option<Responder>,
    writes: Vec<(u8, Vec<u8>)>,
    opened: usize,
    detach_attempts: usize,
    fail_detach: bool,
    fail_claim: bool,
    configuration: Option<u8>,
    claimed: Option<u8>,
    releases: usize,
}

#[derive(Clone, Default)]
struct Shared(Arc<Mutex<MockState>>);

impl Shared {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Mock bus listing a fixed set of devices.
#[derive(Clone)]
pub struct MockBus {
    devices: Vec<UsbDeviceInfo>,
    shared: Shared,
}

impl MockBus {
    /// Create a bus with the given devices attached.
    pub fn new(devices: Vec<UsbDeviceInfo>) -> Self {
        Self {
            devices,
            shared: Shared::default(),
        }
    }

    /// Create a bus with one unrelated device and one Proxmark attached.
    pub fn with_proxmark() -> Self {
        Self::new(vec![
            UsbDeviceInfo {
                vendor_id: 0x046d,
                product_id: 0xc52b,
                bus_number: 1,
                address: 2,
            },
            UsbDeviceInfo {
                vendor_id: VENDOR_ID,
                product_id: PRODUCT_ID,
                bus_number: 1,
                address: 7,
            },
        ])
    }

    /// Create a bus with nothing attached.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Handle to the transport that claiming will produce.
    pub fn transport(&self) -> MockTransport {
        MockTransport {
            shared: self.shared.clone(),
        }
    }

    /// Make kernel-driver detach fail.
    pub fn fail_detach(&self) {
        self.shared.lock().fail_detach = true;
    }

    /// Make interface claiming fail.
    pub fn fail_claim(&self) {
        self.shared.lock().fail_claim = true;
    }

    /// Number of devices opened so far.
    pub fn open_count(&self) -> usize {
        self.shared.lock().opened
    }

    /// Number of kernel-driver detach attempts.
    pub fn detach_attempts(&self) -> usize {
        self.shared.lock().detach_attempts
    }

    /// Configuration value set on the device, if any.
    pub fn configuration(&self) -> Option<u8> {
        self.shared.lock().configuration
    }

    /// Interface currently claimed, if any.
    pub fn claimed_interface(&self) -> Option<u8> {
        self.shared.lock().claimed
    }
}

impl UsbBus for MockBus {
    type Device = MockDevice;

    fn devices(&self) -> TransportResult<Vec<UsbDeviceInfo>> {
        Ok(self.devices.clone())
    }

    fn open(&self, _info: &UsbDeviceInfo) -> TransportResult<MockDevice> {
        self.shared.lock().opened += 1;
        Ok(MockDevice {
            shared: self.shared.clone(),
        })
    }
}

/// Opened mock device.
pub struct MockDevice {
    shared: Shared,
}

impl UsbDevice for MockDevice {
    type Transport = MockTransport;

    fn first_interface(&self) -> TransportResult<InterfaceSelection> {
        Ok(InterfaceSelection {
            configuration: 1,
            interface: 0,
        })
    }

    fn detach_kernel_driver(&mut self, _interface: u8) -> TransportResult<()> {
        let mut state = self.shared.lock();
        state.detach_attempts += 1;
        if state.fail_detach {
            return Err(TransportError::Transfer {
                endpoint: 0,
                reason: "no kernel driver attached".to_string(),
            });
        }
        Ok(())
    }

    fn set_configuration(&mut self, configuration: u8) -> TransportResult<()> {
        self.shared.lock().configuration = Some(configuration);
        Ok(())
    }

    fn claim_interface(self, interface: u8) -> TransportResult<MockTransport> {
        let mut state = self.shared.lock();
        if state.fail_claim {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "interface busy",
            )));
        }
        state.claimed = Some(interface);
        drop(state);
        Ok(MockTransport {
            shared: self.shared,
        })
    }
}

/// Mock transport with a reply queue and a write log.
#[derive(Clone, Default)]
pub struct MockTransport {
    shared: Shared,
}

impl MockTransport {
    /// Create a standalone transport (not attached to a bus).
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response frame.
    pub fn push_response(&self, frame: &CommandFrame) {
        self.push_raw(frame.encode().to_vec());
    }

    /// Queue raw reply bytes.
    pub fn push_raw(&self, bytes: Vec<u8>) {
        self.shared.lock().replies.push_back(Ok(bytes));
    }

    /// Queue a read failure.
    pub fn push_read_error(&self, err: TransportError) {
        self.shared.lock().replies.push_back(Err(err));
    }

    /// Make the next write fail.
    pub fn push_write_error(&self, err: TransportError) {
        self.shared.lock().write_errors.push_back(err);
    }

    /// Make the next release fail. The attempt is still counted.
    pub fn fail_release(&self, err: TransportError) {
        self.shared.lock().release_error = Some(err);
    }

    /// Answer every written frame through `responder`.
    ///
    /// Replies returned by the closure are queued after any already pending.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: FnMut(&CommandFrame) -> Option<CommandFrame> + Send + 'static,
    {
        self.shared.lock().responder = Some(Box::new(responder));
    }

    /// Raw bytes written so far, with their endpoints.
    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.shared.lock().writes.clone()
    }

    /// Frames written so far, decoded.
    pub fn written_frames(&self) -> Vec<CommandFrame> {
        self.shared
            .lock()
            .writes
            .iter()
            .filter_map(|(_, bytes)| CommandFrame::decode(bytes).ok())
            .collect()
    }

    /// Replies still queued.
    pub fn pending_replies(&self) -> usize {
        self.shared.lock().replies.len()
    }

    /// Number of times the interface was released.
    pub fn release_count(&self) -> usize {
        self.shared.lock().releases
    }
}

impl Transport for MockTransport {
    fn bulk_write(
        &mut self,
        endpoint: u8,
        data: &[u8],
        _timeout: Duration,
    ) -> TransportResult<usize> {
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        if state.releases > 0 {
            return Err(TransportError::Disconnected);
        }
        if let Some(err) = state.write_errors.pop_front() {
            return Err(err);
        }
        state.writes.push((endpoint, data.to_vec()));

        let frame = CommandFrame::decode(data).ok();
        if let (Some(responder), Some(frame)) = (state.responder.as_mut(), frame) {
            if let Some(reply) = responder(&frame) {
                state.replies.push_back(Ok(reply.encode().to_vec()));
            }
        }
        Ok(data.len())
    }

    fn bulk_read(
        &mut self,
        endpoint: u8,
        len: usize,
        timeout: Duration,
    ) -> TransportResult<Vec<u8>> {
        let mut state = self.shared.lock();
        if state.releases > 0 {
            return Err(TransportError::Disconnected);
        }
        match state.replies.pop_front() {
            Some(Ok(mut bytes)) => {
                bytes.truncate(len);
                Ok(bytes)
            }
            Some(Err(err)) => Err(err),
            None => Err(TransportError::Timeout {
                endpoint,
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    fn release(&mut self) -> TransportResult<()> {
        let mut state = self.shared.lock();
        state.releases += 1;
        if let Some(err) = state.release_error.take() {
            return Err(err);
        }
        state.claimed = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(5);

    #[test]
    fn test_bus_lists_devices_without_opening() {
        let bus = MockBus::with_proxmark();
        assert_eq!(bus.devices().unwrap().len(), 2);
        assert_eq!(bus.open_count(), 0);
    }

    #[test]
    fn test_claim_records_interface() {
        let bus = MockBus::with_proxmark();
        let info = bus.devices().unwrap()[1];
        let device = bus.open(&info).unwrap();
        let _transport = device.claim_interface(0).unwrap();
        assert_eq!(bus.claimed_interface(), Some(0));
        assert_eq!(bus.open_count(), 1);
    }

    #[test]
    fn test_empty_queue_reads_as_timeout() {
        let mut transport = MockTransport::new();
        let err = transport.bulk_read(0x82, 64, T).unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_replies_pop_in_order() {
        let mut transport = MockTransport::new();
        transport.push_response(&CommandFrame::new(1));
        transport.push_response(&CommandFrame::new(2));

        let first = CommandFrame::decode(&transport.bulk_read(0x82, 64, T).unwrap()).unwrap();
        let second = CommandFrame::decode(&transport.bulk_read(0x82, 64, T).unwrap()).unwrap();
        assert_eq!(first.opcode, 1);
        assert_eq!(second.opcode, 2);
    }

    #[test]
    fn test_read_truncates_to_requested_len() {
        let mut transport = MockTransport::new();
        transport.push_raw(vec![1; 100]);
        assert_eq!(transport.bulk_read(0x82, 64, T).unwrap().len(), 64);
    }

    #[test]
    fn test_responder_answers_writes() {
        let mut transport = MockTransport::new();
        transport.set_responder(|req| Some(CommandFrame::new(req.opcode + 1)));

        let request = CommandFrame::new(0x400).encode();
        transport.bulk_write(0x01, &request, T).unwrap();
        let reply = CommandFrame::decode(&transport.bulk_read(0x82, 64, T).unwrap()).unwrap();
        assert_eq!(reply.opcode, 0x401);
        assert_eq!(transport.written_frames()[0].opcode, 0x400);
    }

    #[test]
    fn test_io_after_release_fails() {
        let mut transport = MockTransport::new();
        transport.release().unwrap();
        assert_eq!(transport.release_count(), 1);
        assert!(matches!(
            transport.bulk_write(0x01, &[0; 64], T),
            Err(TransportError::Disconnected)
        ));
    }

    #[test]
    fn test_release_error_is_consumed_once() {
        let mut transport = MockTransport::new();
        transport.fail_release(TransportError::Disconnected);
        assert!(transport.release().is_err());
        assert!(transport.release().is_ok());
        assert_eq!(transport.release_count(), 2);
    }

    #[test]
    fn test_write_error_is_consumed_once() {
        let mut transport = MockTransport::new();
        transport.push_write_error(TransportError::Disconnected);
        assert!(transport.bulk_write(0x01, &[0; 64], T).is_err());
        assert_eq!(transport.bulk_write(0x01, &[0; 64], T).unwrap(), 64);
        assert_eq!(transport.writes().len(), 1);
    }
}

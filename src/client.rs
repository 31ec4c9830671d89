//! Client builder and high-level device operations.
//!
//! The [`ProxmarkBuilder`] provides a fluent API over [`SessionConfig`]. The
//! resulting [`Proxmark`] owns the session for its whole life; the interface
//! is released by [`Proxmark::close`] or when the client is dropped.
//!
//! # Example
//!
//! ```no_run
//! use proxmark_client::ProxmarkBuilder;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), proxmark_client::ProxError> {
//!     let mut pm = ProxmarkBuilder::new()
//!         .timeout(Duration::from_millis(500))
//!         .open_usb()?;
//!     for antenna in pm.tune()? {
//!         println!("{antenna}");
//!     }
//!     pm.close()
//! }
//! ```

use std::time::Duration;

use crate::catalog::{require, run_operation, OperationOutcome, ResponsePattern};
use crate::config::SessionConfig;
use crate::dispatch::CommandDispatcher;
use crate::drain::{drain_all, Drained};
use crate::error::{ProxError, Result};
use crate::protocol::{opcodes, CommandFrame};
use crate::samples::{download_samples, SampleBuffer};
use crate::session::DeviceSession;
use crate::transport::{Transport, UsbBus, UsbDevice};
use crate::tuning::{decode_tuning, AntennaReading};

#[cfg(feature = "usb")]
use crate::transport::{NusbBus, NusbTransport};

/// Builder for configuring and opening a Proxmark session.
#[derive(Debug, Clone, Default)]
pub struct ProxmarkBuilder {
    config: SessionConfig,
}

impl ProxmarkBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the vendor ID to match.
    ///
    /// Default: 0x9ac4
    pub fn vendor_id(mut self, vendor_id: u16) -> Self {
        self.config.vendor_id = vendor_id;
        self
    }

    /// Set the product ID to match.
    ///
    /// Default: 0x4b8f
    pub fn product_id(mut self, product_id: u16) -> Self {
        self.config.product_id = product_id;
        self
    }

    /// Set the OUT and IN endpoint addresses.
    ///
    /// Default: 0x01 / 0x82
    pub fn endpoints(mut self, endpoint_out: u8, endpoint_in: u8) -> Self {
        self.config.endpoint_out = endpoint_out;
        self.config.endpoint_in = endpoint_in;
        self
    }

    /// Set the per-transfer timeout.
    ///
    /// Default: 1 second
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Find and claim the device on `bus`.
    pub fn open<B>(self, bus: &B) -> Result<Proxmark<<B::Device as UsbDevice>::Transport>>
    where
        B: UsbBus,
    {
        let session = DeviceSession::open(bus, self.config)?;
        Ok(Proxmark::from_session(session))
    }

    /// Find and claim the device on the host's USB buses.
    #[cfg(feature = "usb")]
    pub fn open_usb(self) -> Result<Proxmark<NusbTransport>> {
        self.open(&NusbBus::new())
    }
}

/// An open Proxmark.
pub struct Proxmark<T: Transport> {
    dispatcher: CommandDispatcher<T>,
}

#[cfg(feature = "usb")]
impl Proxmark<NusbTransport> {
    /// Open the first attached Proxmark with default settings.
    pub fn open_usb() -> Result<Self> {
        ProxmarkBuilder::new().open_usb()
    }
}

impl<T: Transport> Proxmark<T> {
    /// Wrap an open session.
    pub fn from_session(session: DeviceSession<T>) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(session),
        }
    }

    /// Get a mutable reference to the dispatcher for raw commands.
    pub fn dispatcher(&mut self) -> &mut CommandDispatcher<T> {
        &mut self.dispatcher
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        self.dispatcher.session().config()
    }

    /// Release the interface.
    pub fn close(self) -> Result<()> {
        self.dispatcher.into_session().close()
    }

    /// Measure voltage and impedance on each antenna.
    ///
    /// Returns readings in the order 125 kHz, 134 kHz, 13.56 MHz.
    pub fn tune(&mut self) -> Result<[AntennaReading; 3]> {
        let reply = self
            .dispatcher
            .exchange(&CommandFrame::new(opcodes::TUNE), opcodes::TUNE_RESULT)?;
        Ok(decode_tuning(&reply))
    }

    /// Download `n` samples (clamped to 16000).
    pub fn samples(&mut self, n: usize) -> Result<SampleBuffer> {
        download_samples(&mut self.dispatcher, n)
    }

    /// Read frames until the device goes quiet.
    pub fn read_msgs(&mut self) -> Drained {
        drain_all(&mut self.dispatcher)
    }

    /// Run a catalog operation by name.
    pub fn run(&mut self, name: &str, param: Option<u32>) -> Result<OperationOutcome> {
        let op = require(name)?;
        run_operation(&mut self.dispatcher, op, param)
    }

    // LOW FREQUENCY

    /// Start an LF acquisition and return the device's debug response.
    ///
    /// `high_mode` selects 134 kHz instead of 125 kHz.
    pub fn lf_read(&mut self, high_mode: bool) -> Result<CommandFrame> {
        let request = CommandFrame::new(opcodes::LF_READ).with_ext1(u32::from(high_mode));
        self.dispatcher.send_command(&request)?;
        self.dispatcher.recv_response()
    }

    /// Energize a 125 kHz tag, then download samples.
    pub fn lf_read_125khz(&mut self) -> Result<SampleBuffer> {
        self.run_for_samples("lf_read_125khz", None)
    }

    /// Energize a 134 kHz tag, then download samples.
    pub fn lf_read_134khz(&mut self) -> Result<SampleBuffer> {
        self.run_for_samples("lf_read_134khz", None)
    }

    /// Transmit the current contents of the device sample buffer.
    pub fn lf_xmit(&mut self) -> Result<()> {
        self.run_and_forget("lf_xmit", None)
    }

    /// Turn the device into a HID tag reader. Press the device button to stop.
    pub fn lf_hid_fsk_demod(&mut self) -> Result<()> {
        self.run_and_forget("lf_hid_fsk_demod", None)
    }

    // HIGH FREQUENCY

    /// Read an ISO14443A tag, then download 1000 samples.
    pub fn hf_read_iso14443a(&mut self, param: Option<u32>) -> Result<SampleBuffer> {
        self.run_for_samples("hf_read_iso14443a", param)
    }

    /// Snoop ISO14443A traffic. Press the device button to stop.
    pub fn hf_snoop_iso14443a(&mut self) -> Result<()> {
        self.run_and_forget("hf_snoop_iso14443a", None)
    }

    /// Act as an ISO14443A reader.
    pub fn hf_iso14443a_reader(&mut self, param: Option<u32>) -> Result<()> {
        self.run_and_forget("hf_iso14443a_reader", param)
    }

    /// Read an ISO15693 tag.
    pub fn hf_read_iso15693(&mut self) -> Result<()> {
        self.run_and_forget("hf_read_iso15693", None)
    }

    /// Act as an ISO15693 reader.
    pub fn hf_iso15693_reader(&mut self) -> Result<()> {
        self.run_and_forget("hf_iso15693_reader", None)
    }

    /// Simulate an ISO15693 tag.
    pub fn hf_sim_iso15693(&mut self, param: Option<u32>) -> Result<()> {
        self.run_and_forget("hf_sim_iso15693", param)
    }

    fn run_for_samples(&mut self, name: &str, param: Option<u32>) -> Result<SampleBuffer> {
        let op = require(name)?;
        if !matches!(op.response, ResponsePattern::SingleThenSamples(_)) {
            return Err(ProxError::UnknownOperation(name.to_string()));
        }
        match run_operation(&mut self.dispatcher, op, param)? {
            OperationOutcome::Samples { samples, .. } => Ok(samples),
            _ => Err(ProxError::UnknownOperation(name.to_string())),
        }
    }

    fn run_and_forget(&mut self, name: &str, param: Option<u32>) -> Result<()> {
        self.run(name, param).map(|_| ())
    }
}

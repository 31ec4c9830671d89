//! Transport module - USB backends behind a small trait seam.
//!
//! Provides:
//! - [`UsbBus`] / [`UsbDevice`] - enumeration and interface claiming
//! - [`Transport`] - bulk I/O on a claimed interface
//! - [`NusbBus`] - real backend over `nusb` (feature `usb`)
//! - [`MockBus`] - scripted in-memory backend for tests

use std::time::Duration;

use crate::error::TransportError;

mod mock;
#[cfg(feature = "usb")]
mod usb;

pub use mock::{MockBus, MockDevice, MockTransport};
#[cfg(feature = "usb")]
pub use usb::{NusbBus, NusbDevice, NusbTransport};

/// Result type for backend operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Identity of an attached USB device, as seen during enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbDeviceInfo {
    /// USB vendor ID.
    pub vendor_id: u16,
    /// USB product ID.
    pub product_id: u16,
    /// Bus number.
    pub bus_number: u8,
    /// Device address on the bus.
    pub address: u8,
}

/// Configuration value and interface number picked for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceSelection {
    /// `bConfigurationValue` of the first configuration.
    pub configuration: u8,
    /// `bInterfaceNumber` of its first interface.
    pub interface: u8,
}

/// A USB bus that can list and open devices.
pub trait UsbBus {
    /// Opened-but-unclaimed device handle.
    type Device: UsbDevice;

    /// List attached devices.
    fn devices(&self) -> TransportResult<Vec<UsbDeviceInfo>>;

    /// Open one of the listed devices.
    fn open(&self, info: &UsbDeviceInfo) -> TransportResult<Self::Device>;
}

/// An opened device whose interface has not been claimed yet.
pub trait UsbDevice {
    /// Transport produced by claiming an interface.
    type Transport: Transport;

    /// First configuration and its first interface.
    fn first_interface(&self) -> TransportResult<InterfaceSelection>;

    /// Detach a kernel driver bound to the interface.
    fn detach_kernel_driver(&mut self, interface: u8) -> TransportResult<()>;

    /// Select the active configuration.
    fn set_configuration(&mut self, configuration: u8) -> TransportResult<()>;

    /// Claim the interface, handing ownership to the returned transport.
    fn claim_interface(self, interface: u8) -> TransportResult<Self::Transport>;
}

/// Bulk I/O on a claimed interface.
pub trait Transport {
    /// Write `data` to `endpoint`. Returns the number of bytes accepted.
    fn bulk_write(
        &mut self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> TransportResult<usize>;

    /// Read up to `len` bytes from `endpoint`.
    fn bulk_read(
        &mut self,
        endpoint: u8,
        len: usize,
        timeout: Duration,
    ) -> TransportResult<Vec<u8>>;

    /// Release the claimed interface.
    fn release(&mut self) -> TransportResult<()>;
}

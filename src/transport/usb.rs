//! USB backend over `nusb`.
//!
//! `nusb` transfers are futures with no timeout of their own. Each transfer
//! is driven to completion on a private current-thread `tokio` runtime under
//! `tokio::time::timeout`; dropping the future on timeout cancels the
//! transfer, so the calling thread never blocks past the deadline.

use std::time::Duration;

use nusb::transfer::RequestBuffer;
use tokio::runtime::{Builder, Runtime};

use super::{InterfaceSelection, Transport, TransportResult, UsbBus, UsbDevice, UsbDeviceInfo};
use crate::error::TransportError;

/// The host's USB buses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NusbBus;

impl NusbBus {
    /// Create a handle to the host's USB buses.
    pub fn new() -> Self {
        Self
    }
}

impl UsbBus for NusbBus {
    type Device = NusbDevice;

    fn devices(&self) -> TransportResult<Vec<UsbDeviceInfo>> {
        Ok(nusb::list_devices()?
            .map(|d| UsbDeviceInfo {
                vendor_id: d.vendor_id(),
                product_id: d.product_id(),
                bus_number: d.bus_number(),
                address: d.device_address(),
            })
            .collect())
    }

    fn open(&self, info: &UsbDeviceInfo) -> TransportResult<NusbDevice> {
        let found = nusb::list_devices()?
            .find(|d| d.bus_number() == info.bus_number && d.device_address() == info.address)
            .ok_or(TransportError::Disconnected)?;
        Ok(NusbDevice {
            device: found.open()?,
        })
    }
}

/// An opened `nusb` device.
pub struct NusbDevice {
    device: nusb::Device,
}

impl UsbDevice for NusbDevice {
    type Transport = NusbTransport;

    fn first_interface(&self) -> TransportResult<InterfaceSelection> {
        let config = self
            .device
            .configurations()
            .next()
            .ok_or_else(|| missing("configuration"))?;
        let interface = config
            .interfaces()
            .next()
            .ok_or_else(|| missing("interface"))?;
        Ok(InterfaceSelection {
            configuration: config.configuration_value(),
            interface: interface.interface_number(),
        })
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn detach_kernel_driver(&mut self, interface: u8) -> TransportResult<()> {
        self.device.detach_kernel_driver(interface)?;
        Ok(())
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn detach_kernel_driver(&mut self, _interface: u8) -> TransportResult<()> {
        Ok(())
    }

    fn set_configuration(&mut self, configuration: u8) -> TransportResult<()> {
        self.device.set_configuration(configuration)?;
        Ok(())
    }

    fn claim_interface(self, interface: u8) -> TransportResult<NusbTransport> {
        let interface = self.device.claim_interface(interface)?;
        let runtime = Builder::new_current_thread().enable_time().build()?;
        Ok(NusbTransport {
            interface: Some(interface),
            runtime,
        })
    }
}

fn missing(what: &str) -> TransportError {
    TransportError::Transfer {
        endpoint: 0,
        reason: format!("device reports no {what}"),
    }
}

/// Claimed `nusb` interface.
pub struct NusbTransport {
    interface: Option<nusb::Interface>,
    runtime: Runtime,
}

impl Transport for NusbTransport {
    fn bulk_write(
        &mut self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> TransportResult<usize> {
        let interface = self
            .interface
            .as_ref()
            .ok_or(TransportError::Disconnected)?;
        let transfer = interface.bulk_out(endpoint, data.to_vec());

        let completion = self
            .runtime
            .block_on(async { tokio::time::timeout(timeout, transfer).await })
            .map_err(|_| timed_out(endpoint, timeout))?;

        let sent = completion.into_result().map_err(|e| TransportError::Transfer {
            endpoint,
            reason: e.to_string(),
        })?;
        Ok(sent.actual_length())
    }

    fn bulk_read(
        &mut self,
        endpoint: u8,
        len: usize,
        timeout: Duration,
    ) -> TransportResult<Vec<u8>> {
        let interface = self
            .interface
            .as_ref()
            .ok_or(TransportError::Disconnected)?;
        let transfer = interface.bulk_in(endpoint, RequestBuffer::new(len));

        let completion = self
            .runtime
            .block_on(async { tokio::time::timeout(timeout, transfer).await })
            .map_err(|_| timed_out(endpoint, timeout))?;

        completion.into_result().map_err(|e| TransportError::Transfer {
            endpoint,
            reason: e.to_string(),
        })
    }

    fn release(&mut self) -> TransportResult<()> {
        // Dropping the interface releases it.
        self.interface.take();
        Ok(())
    }
}

fn timed_out(endpoint: u8, timeout: Duration) -> TransportError {
    TransportError::Timeout {
        endpoint,
        timeout_ms: timeout.as_millis() as u64,
    }
}

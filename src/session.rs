//! Device session - owns the claimed USB interface.
//!
//! A [`DeviceSession`] exists only once the device has been found, opened
//! and its interface claimed. The interface is released exactly once:
//! either by [`DeviceSession::close`] or, on every other exit path, when the
//! session is dropped.

use crate::config::SessionConfig;
use crate::error::{ProxError, Result, TransportError};
use crate::transport::{Transport, UsbBus, UsbDevice, UsbDeviceInfo};

/// Exclusive owner of one claimed device interface.
pub struct DeviceSession<T: Transport> {
    transport: T,
    config: SessionConfig,
    device: Option<UsbDeviceInfo>,
    released: bool,
}

impl<T: Transport> DeviceSession<T> {
    /// Find, open and claim the first device matching `config`.
    ///
    /// Kernel-driver detach is best effort: its failure is logged and ignored.
    ///
    /// # Errors
    ///
    /// - [`ProxError::DeviceNotFound`] if no attached device matches; nothing
    ///   is opened in that case.
    /// - [`ProxError::Transport`] if opening, configuring or claiming fails.
    pub fn open<B>(bus: &B, config: SessionConfig) -> Result<Self>
    where
        B: UsbBus,
        B::Device: UsbDevice<Transport = T>,
    {
        let info = bus
            .devices()?
            .into_iter()
            .find(|d| config.matches(d.vendor_id, d.product_id))
            .ok_or(ProxError::DeviceNotFound {
                vendor_id: config.vendor_id,
                product_id: config.product_id,
            })?;

        tracing::info!(
            "Found Proxmark on bus {} addr {}",
            info.bus_number,
            info.address
        );

        let mut device = bus.open(&info)?;
        let selection = device.first_interface()?;

        if let Err(e) = device.detach_kernel_driver(selection.interface) {
            tracing::warn!(
                "Kernel driver detach on interface {} failed, continuing: {}",
                selection.interface,
                e
            );
        }

        device.set_configuration(selection.configuration)?;
        let transport = device.claim_interface(selection.interface)?;
        tracing::info!("Interface {} claimed", selection.interface);

        Ok(Self {
            transport,
            config,
            device: Some(info),
            released: false,
        })
    }

    /// Wrap an already-claimed transport.
    pub fn from_transport(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            device: None,
            released: false,
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Enumeration record of the opened device, if opened through a bus.
    pub fn device(&self) -> Option<&UsbDeviceInfo> {
        self.device.as_ref()
    }

    /// Write one encoded frame to the OUT endpoint.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let endpoint = self.config.endpoint_out;
        let written = self
            .transport
            .bulk_write(endpoint, bytes, self.config.timeout)?;
        if written != bytes.len() {
            return Err(TransportError::ShortWrite {
                endpoint,
                written,
                expected: bytes.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Read up to `len` bytes from the IN endpoint.
    pub fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self
            .transport
            .bulk_read(self.config.endpoint_in, len, self.config.timeout)?)
    }

    /// Release the interface and end the session.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.transport.release()?;
        tracing::debug!("Interface released");
        Ok(())
    }
}

impl<T: Transport> Drop for DeviceSession<T> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::error!("Failed to release interface: {}", e);
        }
    }
}

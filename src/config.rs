//! Session configuration.
//!
//! Defaults match the stock device firmware. A JSON document may override
//! any subset of fields:
//!
//! ```
//! use proxmark_client::SessionConfig;
//!
//! let config = SessionConfig::from_json(r#"{ "timeout_ms": 250 }"#).unwrap();
//! assert_eq!(config.timeout.as_millis(), 250);
//! assert_eq!(config.vendor_id, 0x9ac4);
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;

/// USB vendor ID of the device.
pub const VENDOR_ID: u16 = 0x9ac4;

/// USB product ID of the device.
pub const PRODUCT_ID: u16 = 0x4b8f;

/// Bulk OUT endpoint (host to device).
pub const ENDPOINT_OUT: u8 = 0x01;

/// Bulk IN endpoint (device to host).
pub const ENDPOINT_IN: u8 = 0x82;

/// Default timeout applied to every bulk transfer.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Parameters used to locate the device and drive its endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Vendor ID to match during enumeration.
    pub vendor_id: u16,
    /// Product ID to match during enumeration.
    pub product_id: u16,
    /// Endpoint commands are written to.
    pub endpoint_out: u8,
    /// Endpoint responses are read from.
    pub endpoint_in: u8,
    /// Timeout for each bulk transfer.
    #[serde(
        rename = "timeout_ms",
        serialize_with = "serialize_millis",
        deserialize_with = "deserialize_millis"
    )]
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            endpoint_out: ENDPOINT_OUT,
            endpoint_in: ENDPOINT_IN,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SessionConfig {
    /// Parse a JSON override document. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check whether a USB vendor/product pair identifies the device.
    #[inline]
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }

    /// Timeout in whole milliseconds, as reported in errors.
    #[inline]
    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

fn serialize_millis<S: Serializer>(
    value: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

fn deserialize_millis<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Duration, D::Error> {
    Ok(Duration::from_millis(u64::deserialize(deserializer)?))
}

//! # proxmark-client
//!
//! Host-side driver for the Proxmark RFID analysis device over USB bulk
//! transfers.
//!
//! ## Architecture
//!
//! - **Protocol**: fixed 64-byte command/response frames
//! - **Transport**: USB backends behind a trait seam (`nusb`, mock)
//! - **Session**: device discovery and interface ownership
//! - **Dispatch**: half-duplex send/receive with opcode checks
//! - **Operations**: tuning, sample download, the operation catalog, drains
//!
//! ## Example
//!
//! ```no_run
//! use proxmark_client::ProxmarkBuilder;
//!
//! fn main() -> Result<(), proxmark_client::ProxError> {
//!     let mut pm = ProxmarkBuilder::new().open_usb()?;
//!
//!     let [lf125, lf134, hf] = pm.tune()?;
//!     println!("{lf125}\n{lf134}\n{hf}");
//!
//!     let samples = pm.lf_read_125khz()?;
//!     println!("{} samples", samples.len());
//!
//!     pm.close()
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod drain;
pub mod error;
pub mod protocol;
pub mod samples;
pub mod session;
pub mod transport;
pub mod tuning;

mod client;

pub use client::{Proxmark, ProxmarkBuilder};
pub use config::SessionConfig;
pub use drain::{DrainEnd, Drained};
pub use error::{ProxError, TransportError};
pub use samples::SampleBuffer;
pub use tuning::AntennaReading;

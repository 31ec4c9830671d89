//! Antenna tuning telemetry.
//!
//! The tune reply packs six 16/32-bit readings into its extension words:
//!
//! ```text
//! ext1 = [ 134 kHz mV (hi 16) | 125 kHz mV (lo 16) ]
//! ext2 = [ 13.56 MHz mV (32)                        ]
//! ext3 = [ 13.56 MHz ohms (hi 16) | LF ohms (lo 16) ]
//! ```
//!
//! Both LF antennas report the same impedance word.

use std::fmt;

use serde::Serialize;

use crate::protocol::CommandFrame;

/// Label of the 125 kHz antenna.
pub const LF_125KHZ: &str = "125kHz";
/// Label of the 134 kHz antenna.
pub const LF_134KHZ: &str = "134kHz";
/// Label of the 13.56 MHz antenna.
pub const HF_13_56MHZ: &str = "13.56MHz";

/// One antenna's tuning measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AntennaReading {
    label: &'static str,
    voltage_mv: u32,
    impedance_ohms: u32,
}

impl AntennaReading {
    fn new(label: &'static str, voltage_mv: u32, impedance_ohms: u32) -> Self {
        Self {
            label,
            voltage_mv,
            impedance_ohms,
        }
    }

    /// Antenna label.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Oscillation voltage in millivolts.
    pub fn voltage_mv(&self) -> u32 {
        self.voltage_mv
    }

    /// Impedance in ohms.
    pub fn impedance_ohms(&self) -> u32 {
        self.impedance_ohms
    }
}

impl fmt::Display for AntennaReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} v={}mV z={} ohms",
            self.label, self.voltage_mv, self.impedance_ohms
        )
    }
}

/// Split a tune reply into (125 kHz, 134 kHz, 13.56 MHz) readings.
///
/// The opcode is not inspected; callers obtain the frame from an exchange
/// that already required `0x401`.
pub fn decode_tuning(frame: &CommandFrame) -> [AntennaReading; 3] {
    let lf_impedance = frame.ext3 & 0xFFFF;
    [
        AntennaReading::new(LF_125KHZ, frame.ext1 & 0xFFFF, lf_impedance),
        AntennaReading::new(LF_134KHZ, frame.ext1 >> 16, lf_impedance),
        AntennaReading::new(HF_13_56MHZ, frame.ext2, frame.ext3 >> 16),
    ]
}

//! Operation catalog.
//!
//! Each named device operation is one static row: the opcode to send, what
//! goes into `ext1`, and how the device answers. [`run_operation`] executes
//! any row over a dispatcher.
//!
//! # Example
//!
//! ```
//! use proxmark_client::catalog::{lookup, ResponsePattern};
//!
//! let op = lookup("hf_read_iso14443a").unwrap();
//! assert_eq!(op.opcode, 0x301);
//! assert_eq!(op.response, ResponsePattern::SingleThenSamples(1000));
//! ```

use serde::Serialize;

use crate::dispatch::CommandDispatcher;
use crate::error::{ProxError, Result};
use crate::protocol::{opcodes, CommandFrame};
use crate::samples::{download_samples, SampleBuffer, DEFAULT_SAMPLE_COUNT};
use crate::transport::Transport;

/// Samples fetched after an ISO14443A read.
pub const ISO14443A_SAMPLE_COUNT: usize = 1000;

/// How the device answers an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePattern {
    /// Fire-and-forget, nothing is read.
    None,
    /// One response frame.
    Single,
    /// One response frame, then a sample download of the given count.
    SingleThenSamples(usize),
    /// The device keeps running until its button is pressed.
    Stream,
}

/// Source of the `ext1` word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ext1 {
    /// Always zero.
    Unused,
    /// Fixed value.
    Fixed(u32),
    /// Caller-supplied, zero when absent.
    Param,
}

/// One catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Operation {
    /// Operation name.
    pub name: &'static str,
    /// Opcode sent.
    pub opcode: u32,
    /// How `ext1` is filled.
    pub ext1: Ext1,
    /// Reply opcode the first response must carry, if checked.
    pub reply: Option<u32>,
    /// Response pattern.
    pub response: ResponsePattern,
    /// Human-readable summary.
    pub description: &'static str,
}

impl Operation {
    /// Build the request frame for this operation.
    pub fn request(&self, param: Option<u32>) -> CommandFrame {
        let ext1 = match self.ext1 {
            Ext1::Unused => 0,
            Ext1::Fixed(v) => v,
            Ext1::Param => param.unwrap_or(0),
        };
        if param.is_some() && self.ext1 != Ext1::Param {
            tracing::warn!("{} takes no parameter, ignoring it", self.name);
        }
        CommandFrame::new(self.opcode).with_ext1(ext1)
    }
}

/// Every operation the driver knows.
pub static CATALOG: &[Operation] = &[
    Operation {
        name: "tune",
        opcode: opcodes::TUNE,
        ext1: Ext1::Unused,
        reply: Some(opcodes::TUNE_RESULT),
        response: ResponsePattern::Single,
        description: "Measure antenna voltage and impedance",
    },
    Operation {
        name: "lf_read_125khz",
        opcode: opcodes::LF_READ,
        ext1: Ext1::Fixed(0),
        reply: None,
        response: ResponsePattern::SingleThenSamples(DEFAULT_SAMPLE_COUNT),
        description: "Energize a 125kHz tag and download samples",
    },
    Operation {
        name: "lf_read_134khz",
        opcode: opcodes::LF_READ,
        ext1: Ext1::Fixed(1),
        reply: None,
        response: ResponsePattern::SingleThenSamples(DEFAULT_SAMPLE_COUNT),
        description: "Energize a 134kHz tag and download samples",
    },
    Operation {
        name: "lf_xmit",
        opcode: opcodes::LF_XMIT,
        ext1: Ext1::Unused,
        reply: None,
        response: ResponsePattern::None,
        description: "Transmit the current sample buffer",
    },
    Operation {
        name: "lf_hid_fsk_demod",
        opcode: opcodes::LF_HID_FSK_DEMOD,
        ext1: Ext1::Unused,
        reply: None,
        response: ResponsePattern::Stream,
        description: "Act as a HID tag reader until the button is pressed",
    },
    Operation {
        name: "hf_read_iso14443a",
        opcode: opcodes::HF_READ_ISO14443A,
        ext1: Ext1::Param,
        reply: None,
        response: ResponsePattern::SingleThenSamples(ISO14443A_SAMPLE_COUNT),
        description: "Read an ISO14443A tag and download samples",
    },
    Operation {
        name: "hf_snoop_iso14443a",
        opcode: opcodes::HF_SNOOP_ISO14443A,
        ext1: Ext1::Unused,
        reply: None,
        response: ResponsePattern::Stream,
        description: "Snoop ISO14443A traffic until the button is pressed",
    },
    Operation {
        name: "hf_iso14443a_reader",
        opcode: opcodes::HF_ISO14443A_READER,
        ext1: Ext1::Param,
        reply: None,
        response: ResponsePattern::None,
        description: "Act as an ISO14443A reader",
    },
    Operation {
        name: "hf_read_iso15693",
        opcode: opcodes::HF_READ_ISO15693,
        ext1: Ext1::Unused,
        reply: None,
        response: ResponsePattern::None,
        description: "Read an ISO15693 tag",
    },
    Operation {
        name: "hf_iso15693_reader",
        opcode: opcodes::HF_ISO15693_READER,
        ext1: Ext1::Unused,
        reply: None,
        response: ResponsePattern::None,
        description: "Act as an ISO15693 reader",
    },
    Operation {
        name: "hf_sim_iso15693",
        opcode: opcodes::HF_SIM_ISO15693,
        ext1: Ext1::Param,
        reply: None,
        response: ResponsePattern::None,
        description: "Simulate an ISO15693 tag",
    },
];

/// Find an operation by name.
pub fn lookup(name: &str) -> Option<&'static Operation> {
    CATALOG.iter().find(|op| op.name == name)
}

/// Find an operation by name, failing with [`ProxError::UnknownOperation`].
pub fn require(name: &str) -> Result<&'static Operation> {
    lookup(name).ok_or_else(|| ProxError::UnknownOperation(name.to_string()))
}

/// What running an operation produced.
#[derive(Debug)]
pub enum OperationOutcome {
    /// The command was sent and nothing was read.
    Sent,
    /// The single response frame.
    Response(CommandFrame),
    /// The response frame and the samples downloaded after it.
    Samples {
        /// First response frame.
        response: CommandFrame,
        /// Downloaded samples.
        samples: SampleBuffer,
    },
    /// The device is streaming; only its button ends the operation.
    Streaming,
}

/// Execute one catalog row.
pub fn run_operation<T: Transport>(
    dispatcher: &mut CommandDispatcher<T>,
    op: &Operation,
    param: Option<u32>,
) -> Result<OperationOutcome> {
    let request = op.request(param);

    let read_response = |dispatcher: &mut CommandDispatcher<T>| match op.reply {
        Some(expected) => dispatcher.exchange(&request, expected),
        None => {
            dispatcher.send_command(&request)?;
            dispatcher.recv_response()
        }
    };

    match op.response {
        ResponsePattern::None => {
            dispatcher.send_command(&request)?;
            Ok(OperationOutcome::Sent)
        }
        ResponsePattern::Single => Ok(OperationOutcome::Response(read_response(dispatcher)?)),
        ResponsePattern::SingleThenSamples(count) => {
            let response = read_response(dispatcher)?;
            let samples = download_samples(dispatcher, count)?;
            Ok(OperationOutcome::Samples { response, samples })
        }
        ResponsePattern::Stream => {
            dispatcher.send_command(&request)?;
            tracing::info!("{} running, press the device button to stop", op.name);
            Ok(OperationOutcome::Streaming)
        }
    }
}

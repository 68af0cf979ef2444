//! # Stagedrive Adapter Layer
//!
//! The boundary between the control core and a physical device. A
//! transport (USB, serial, or the in-process simulator) implements
//! [`StageAdapter`]: send one command, receive one raw response. The
//! adapter performs no validation and keeps no protocol state; both live
//! in the core above it.

use stagedrive_protocol::{Command, Response};
use thiserror::Error;

pub mod sim;

pub use sim::{SimConfig, SimStage, ThetaProfile};

/// Transport-level error type.
///
/// These are faults of the physical round trip, not of the caller; the
/// core maps them onto its own error taxonomy.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("device did not answer in time")]
    Timeout,

    #[error("device not attached")]
    NotAttached,

    /// The device answered with a fault indication.
    #[error("device fault: {0}")]
    Fault(String),

    /// The command is outside this device's repertoire (for example a
    /// waveform command sent to a micro-stepping stage).
    #[error("command not supported by this device: {0}")]
    Unsupported(&'static str),
}

/// A physical device behind a serial transport.
///
/// Implementations execute exactly one command per call and block until
/// the round trip completes; the transport is inherently serial, so the
/// core serializes access per handle.
pub trait StageAdapter: Send {
    fn transact(&mut self, command: Command) -> Result<Response, AdapterError>;
}

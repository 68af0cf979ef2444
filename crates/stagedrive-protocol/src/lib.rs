//! # Stagedrive Protocol
//!
//! Wire-level types for multi-axis precision positioning stages
//! (no hardware dependencies).
//!
//! ## Modules
//!
//! - `codes`: numeric return-code taxonomy
//! - `info`: packed `ProductInformation` record and product identities
//! - `axis`: axis indices and axis bitmaps
//! - `motion`: rounding modes, status words, motor profile data
//! - `clock`: logical timing sources and polarity modes
//! - `command`: the command/response vocabulary spoken to a device adapter
//!
//! ## Byte order
//!
//! The packed telemetry record uses little-endian field order. Its 11-byte
//! layout is a wire-compatibility contract shared with files, sockets and
//! shared memory; see [`ProductInformation`].

pub mod axis;
pub mod clock;
pub mod codes;
pub mod command;
pub mod info;
pub mod motion;

pub use axis::{Axis, AxisBitmap};
pub use clock::{Clock, ClockBinding, ClockFrequency, ClockPolarity};
pub use codes::ReturnCode;
pub use command::{Command, Response, StepLeg};
pub use info::{DeviceFamily, FirmwareVersion, ProductInformation, products};
pub use motion::{MotorInfo, Range, Rounding, StatusWord, StepDirection};

use thiserror::Error;

/// Maximum number of data points a device-side waveform buffer can hold,
/// per axis.
pub const MAX_WAVEFORM_POINTS: u32 = 6666;

/// Protocol decode error type
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("invalid record length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: i64 },
}

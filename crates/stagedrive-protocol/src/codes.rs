//! Numeric return-code taxonomy
//!
//! Every operation in the control core reports exactly one outcome from
//! this table. Zero signals success; all failures are negative. The values
//! are part of the external contract and must not be renumbered.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Outcome code reported across the external boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum ReturnCode {
    /// Operation completed.
    Success = 0,
    /// Failure that fits no more specific category.
    GeneralError = -1,
    /// The device itself reported a fault.
    DeviceError = -2,
    /// No device is attached, or it stopped responding.
    DeviceNotAttached = -3,
    /// Wrong call sequence, e.g. trigger without a matching setup.
    UsageError = -4,
    /// Device exists but cannot be granted, e.g. already grabbed.
    DeviceNotReady = -5,
    /// A parameter is out of range.
    ArgumentError = -6,
    /// The axis is not present on this device.
    InvalidAxis = -7,
    /// The handle is not currently held by the registry.
    InvalidHandle = -8,
}

impl ReturnCode {
    /// Whether this code signals success.
    pub fn is_success(self) -> bool {
        self == ReturnCode::Success
    }
}

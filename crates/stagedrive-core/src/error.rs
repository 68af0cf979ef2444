//! Core error type and its mapping onto the numeric taxonomy

use crate::registry::Handle;
use stagedrive_adapter::AdapterError;
use stagedrive_protocol::{Axis, ReturnCode};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StageError>;

/// Error type of every core operation.
///
/// Each variant maps to exactly one [`ReturnCode`] via [`StageError::code`];
/// validation variants are produced before any hardware interaction.
#[derive(Error, Debug)]
pub enum StageError {
    /// Failure that fits no more specific category.
    #[error("general failure: {0}")]
    General(String),

    /// The device reported a fault during the physical round trip.
    #[error("device fault: {0}")]
    Device(String),

    #[error("device not attached")]
    NotAttached,

    /// Wrong call sequence, e.g. trigger without a matching setup.
    #[error("usage error: {0}")]
    Usage(&'static str),

    /// The device exists but cannot be granted right now.
    #[error("device not ready: {0}")]
    NotReady(&'static str),

    /// A parameter is out of range.
    #[error("argument error: {0}")]
    Argument(&'static str),

    /// The axis is not present on this device (or lacks the requested
    /// capability, e.g. an encoder).
    #[error("axis {0} is not present on this device")]
    InvalidAxis(Axis),

    /// The handle is not currently held by the registry.
    #[error("handle {} is not currently held", .0.raw())]
    InvalidHandle(Handle),

    /// A bounded wait expired before the device went idle.
    #[error("timed out waiting for the device")]
    Timeout,

    /// The device answered with a response of the wrong shape.
    #[error("unexpected response from device")]
    UnexpectedResponse,
}

impl StageError {
    /// The numeric code reported across the external boundary.
    pub fn code(&self) -> ReturnCode {
        match self {
            StageError::General(_) => ReturnCode::GeneralError,
            StageError::Device(_) => ReturnCode::DeviceError,
            StageError::NotAttached => ReturnCode::DeviceNotAttached,
            StageError::Usage(_) => ReturnCode::UsageError,
            StageError::NotReady(_) => ReturnCode::DeviceNotReady,
            StageError::Argument(_) => ReturnCode::ArgumentError,
            StageError::InvalidAxis(_) => ReturnCode::InvalidAxis,
            StageError::InvalidHandle(_) => ReturnCode::InvalidHandle,
            // the original taxonomy has no dedicated timeout code
            StageError::Timeout => ReturnCode::GeneralError,
            StageError::UnexpectedResponse => ReturnCode::DeviceError,
        }
    }
}

impl From<AdapterError> for StageError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Io(e) => StageError::General(e.to_string()),
            // a transport that stops answering is indistinguishable from
            // a detached device
            AdapterError::Timeout | AdapterError::NotAttached => StageError::NotAttached,
            AdapterError::Fault(message) => StageError::Device(message),
            AdapterError::Unsupported(what) => StageError::Usage(what),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_taxonomy() {
        assert_eq!(StageError::General("x".into()).code(), ReturnCode::GeneralError);
        assert_eq!(StageError::Device("x".into()).code(), ReturnCode::DeviceError);
        assert_eq!(StageError::NotAttached.code(), ReturnCode::DeviceNotAttached);
        assert_eq!(StageError::Usage("x").code(), ReturnCode::UsageError);
        assert_eq!(StageError::NotReady("x").code(), ReturnCode::DeviceNotReady);
        assert_eq!(StageError::Argument("x").code(), ReturnCode::ArgumentError);
        assert_eq!(StageError::InvalidAxis(Axis::Z).code(), ReturnCode::InvalidAxis);
        assert_eq!(
            StageError::InvalidHandle(Handle::from_raw(7)).code(),
            ReturnCode::InvalidHandle
        );
        assert_eq!(StageError::Timeout.code(), ReturnCode::GeneralError);
    }

    #[test]
    fn adapter_errors_map_onto_taxonomy() {
        let err: StageError = AdapterError::Timeout.into();
        assert_eq!(err.code(), ReturnCode::DeviceNotAttached);
        let err: StageError = AdapterError::Fault("bad checksum".into()).into();
        assert_eq!(err.code(), ReturnCode::DeviceError);
        let err: StageError = AdapterError::Unsupported("theta on stepper").into();
        assert_eq!(err.code(), ReturnCode::UsageError);
    }
}

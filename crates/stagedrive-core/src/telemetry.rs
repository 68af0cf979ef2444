//! Telemetry & calibration: read-only device queries
//!
//! Everything here requires a valid handle but never mutates device
//! state. The heartbeat probe is the one call that degrades gracefully:
//! a device that does not answer in time reads as "not attached" rather
//! than as an error.

use crate::device::{
    expect_firmware, expect_position, expect_product_info, expect_range, expect_triple,
};
use crate::error::{Result, StageError};
use crate::registry::Stage;
use stagedrive_adapter::AdapterError;
use stagedrive_protocol::{
    Axis, Command, FirmwareVersion, MotorInfo, ProductInformation, Range, Response,
};
use std::time::Duration;

impl Stage<'_> {
    /// Query the fixed-layout product identity record.
    pub fn product_info(&self) -> Result<ProductInformation> {
        self.with_device(|dev| expect_product_info(dev.transact(Command::GetProductInfo)?))
    }

    /// Firmware version/profile pair.
    pub fn firmware_version(&self) -> Result<FirmwareVersion> {
        self.with_device(|dev| expect_firmware(dev.transact(Command::GetFirmwareVersion)?))
    }

    /// Serial number of the granted device.
    pub fn serial_number(&self) -> Result<u32> {
        self.with_device(|dev| Ok(dev.record.serial))
    }

    /// Motor characteristics of a micro-stepping stage, captured at
    /// grant time.
    pub fn motor_info(&self) -> Result<MotorInfo> {
        self.with_device(|dev| Ok(dev.stepper()?.motor))
    }

    /// Calibrated travel range of a piezo axis.
    pub fn calibration(&self, axis: Axis) -> Result<Range> {
        self.with_device(|dev| {
            dev.require_axis(axis)?;
            dev.piezo()?;
            expect_range(dev.transact(Command::GetCalibration { axis })?)
        })
    }

    /// Angular range of a tip/tilt axis, in milliradians.
    pub fn theta_range(&self, axis: Axis) -> Result<Range> {
        if !matches!(axis, Axis::X | Axis::Y) {
            return Err(StageError::InvalidAxis(axis));
        }
        self.with_device(|dev| {
            if !dev.piezo()?.tip_tilt {
                return Err(StageError::Usage("stage has no tip/tilt support"));
            }
            expect_range(dev.transact(Command::GetThetaRange { axis })?)
        })
    }

    /// Center position of the tip/tilt mechanism.
    pub fn tip_tilt_center(&self) -> Result<f64> {
        self.with_device(|dev| {
            if !dev.piezo()?.tip_tilt {
                return Err(StageError::Usage("stage has no tip/tilt support"));
            }
            expect_position(dev.transact(Command::GetTipTiltCenter)?)
        })
    }

    /// Last commanded X/Y/Z positions.
    pub fn commanded_position(&self) -> Result<[f64; 3]> {
        self.with_device(|dev| {
            dev.piezo()?;
            expect_triple(dev.transact(Command::GetCommandedPosition)?)
        })
    }

    /// Heartbeat probe: is the physical device still answering?
    ///
    /// Never fails on a silent or faulted device; only an invalid handle
    /// is an error.
    pub fn device_attached(&self, timeout: Duration) -> Result<bool> {
        let timeout_ms = timeout.as_millis().min(u32::MAX as u128) as u32;
        self.with_device(|dev| {
            match dev.adapter.transact(Command::Probe { timeout_ms }) {
                Ok(Response::Attached(answer)) => Ok(answer),
                Ok(_) => Ok(false),
                Err(AdapterError::Io(_)) => Ok(false),
                Err(AdapterError::Timeout | AdapterError::NotAttached) => Ok(false),
                Err(AdapterError::Fault(_) | AdapterError::Unsupported(_)) => Ok(false),
            }
        })
    }
}

//! Per-handle device state: records, family payloads, validation helpers
//!
//! A [`DeviceRecord`] is created when a handle is granted and destroyed
//! when it is released; armed waveform state and clock bindings live here,
//! so releasing a handle invalidates them by construction.

use crate::error::{Result, StageError};
use stagedrive_adapter::StageAdapter;
use stagedrive_protocol::{
    Axis, AxisBitmap, ClockBinding, ClockFrequency, Command, DeviceFamily, FirmwareVersion,
    MotorInfo, ProductInformation, Range, Response, StatusWord,
};

/// Continuous-actuation capability data.
#[derive(Debug, Clone)]
pub struct PiezoProfile {
    /// Per-axis travel range; `None` for absent axes.
    pub calibration: [Option<Range>; 4],
    /// Whether the product supports angular (tip/tilt) positioning.
    pub tip_tilt: bool,
}

/// Discrete-actuation capability data.
#[derive(Debug, Clone)]
pub struct StepperProfile {
    pub motor: MotorInfo,
    /// Axes carrying an encoder.
    pub encoders: AxisBitmap,
}

/// Actuation family of a granted device, with the family-specific payload.
#[derive(Debug, Clone)]
pub enum Family {
    Piezo(PiezoProfile),
    Stepper(StepperProfile),
}

/// Which way an armed single-axis waveform will run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaveformDirection {
    Read,
    Load,
}

/// Armed single-axis waveform setup, keyed by axis in the record.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ArmedWaveform {
    pub direction: WaveformDirection,
    pub points: u32,
}

/// Armed three-axis synchronized acquisition.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WfmaState {
    pub points: u32,
    pub triggered: bool,
}

/// Everything the registry tracks about one granted device.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    pub serial: u32,
    pub info: ProductInformation,
    pub family: Family,
    pub(crate) clock_bindings: [Option<ClockBinding>; 4],
    pub(crate) armed: [Option<ArmedWaveform>; 4],
    pub(crate) wfma: Option<WfmaState>,
}

impl DeviceRecord {
    pub fn axes(&self) -> AxisBitmap {
        self.info.axes()
    }
}

/// A granted device: its record plus the transport it owns while granted.
///
/// Lives behind a per-handle mutex; holding the lock for the duration of
/// an operation is what serializes access to the serial transport.
pub(crate) struct DeviceState {
    pub adapter: Box<dyn StageAdapter>,
    pub record: DeviceRecord,
}

impl DeviceState {
    pub fn transact(&mut self, command: Command) -> Result<Response> {
        Ok(self.adapter.transact(command)?)
    }

    pub fn require_axis(&self, axis: Axis) -> Result<()> {
        if self.record.axes().contains(axis) {
            Ok(())
        } else {
            Err(StageError::InvalidAxis(axis))
        }
    }

    pub fn piezo(&self) -> Result<&PiezoProfile> {
        match &self.record.family {
            Family::Piezo(profile) => Ok(profile),
            Family::Stepper(_) => Err(StageError::Usage(
                "operation requires a piezo (continuous) stage",
            )),
        }
    }

    pub fn stepper(&self) -> Result<&StepperProfile> {
        match &self.record.family {
            Family::Stepper(profile) => Ok(profile),
            Family::Piezo(_) => Err(StageError::Usage(
                "operation requires a micro-stepping stage",
            )),
        }
    }

    /// Axis must exist *and* carry an encoder.
    pub fn require_encoder(&self, axis: Axis) -> Result<()> {
        self.require_axis(axis)?;
        if self.stepper()?.encoders.contains(axis) {
            Ok(())
        } else {
            Err(StageError::InvalidAxis(axis))
        }
    }
}

/// Query a freshly grabbed transport and build its record.
///
/// Family classification comes from the product id; everything the motion
/// and waveform paths validate against is captured here once.
pub(crate) fn identify(adapter: &mut dyn StageAdapter) -> Result<DeviceRecord> {
    let info = match adapter.transact(Command::GetProductInfo)? {
        Response::ProductInfo(info) => info,
        _ => return Err(StageError::UnexpectedResponse),
    };
    let serial = match adapter.transact(Command::GetSerialNumber)? {
        Response::Serial(serial) => serial,
        _ => return Err(StageError::UnexpectedResponse),
    };

    let family = match info.family() {
        Some(DeviceFamily::Piezo) => {
            let mut calibration = [None; 4];
            for axis in info.axes().iter() {
                match adapter.transact(Command::GetCalibration { axis })? {
                    Response::Range(range) => calibration[axis.index()] = Some(range),
                    _ => return Err(StageError::UnexpectedResponse),
                }
            }
            Family::Piezo(PiezoProfile {
                calibration,
                tip_tilt: DeviceFamily::is_tip_tilt(info.product_id),
            })
        }
        Some(DeviceFamily::Stepper) => {
            let motor = match adapter.transact(Command::GetMotorInfo)? {
                Response::MotorInfo(motor) => motor,
                _ => return Err(StageError::UnexpectedResponse),
            };
            let encoders = match adapter.transact(Command::GetEncoderBitmap)? {
                Response::Bitmap(bitmap) => AxisBitmap(bitmap),
                _ => return Err(StageError::UnexpectedResponse),
            };
            Family::Stepper(StepperProfile { motor, encoders })
        }
        None => {
            return Err(StageError::General(format!(
                "unknown product id 0x{:04x}",
                info.product_id
            )));
        }
    };

    Ok(DeviceRecord {
        serial,
        info,
        family,
        clock_bindings: [None; 4],
        armed: [None; 4],
        wfma: None,
    })
}

// ---- response shape helpers -------------------------------------------------
//
// The adapter answers with a tagged Response; these collapse the "wrong
// shape" arm once instead of at every call site.

pub(crate) fn expect_ack(response: Response) -> Result<()> {
    match response {
        Response::Ack => Ok(()),
        _ => Err(StageError::UnexpectedResponse),
    }
}

pub(crate) fn expect_position(response: Response) -> Result<f64> {
    match response {
        Response::Position(value) => Ok(value),
        _ => Err(StageError::UnexpectedResponse),
    }
}

pub(crate) fn expect_range(response: Response) -> Result<Range> {
    match response {
        Response::Range(range) => Ok(range),
        _ => Err(StageError::UnexpectedResponse),
    }
}

pub(crate) fn expect_triple(response: Response) -> Result<[f64; 3]> {
    match response {
        Response::Triple(values) => Ok(values),
        _ => Err(StageError::UnexpectedResponse),
    }
}

pub(crate) fn expect_status(response: Response) -> Result<StatusWord> {
    match response {
        Response::Status(word) => Ok(word),
        _ => Err(StageError::UnexpectedResponse),
    }
}

pub(crate) fn expect_moving(response: Response) -> Result<bool> {
    match response {
        Response::Moving(moving) => Ok(moving),
        _ => Err(StageError::UnexpectedResponse),
    }
}

pub(crate) fn expect_encoders(response: Response) -> Result<[f64; 4]> {
    match response {
        Response::Encoders(values) => Ok(values),
        _ => Err(StageError::UnexpectedResponse),
    }
}

pub(crate) fn expect_microsteps(response: Response) -> Result<i32> {
    match response {
        Response::Microsteps(steps) => Ok(steps),
        _ => Err(StageError::UnexpectedResponse),
    }
}

pub(crate) fn expect_samples(response: Response) -> Result<Vec<f64>> {
    match response {
        Response::Samples(samples) => Ok(samples),
        _ => Err(StageError::UnexpectedResponse),
    }
}

pub(crate) fn expect_triple_samples(response: Response) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    match response {
        Response::TripleSamples { x, y, z } => Ok((x, y, z)),
        _ => Err(StageError::UnexpectedResponse),
    }
}

pub(crate) fn expect_frequency(response: Response) -> Result<ClockFrequency> {
    match response {
        Response::Frequency(frequency) => Ok(frequency),
        _ => Err(StageError::UnexpectedResponse),
    }
}

pub(crate) fn expect_product_info(response: Response) -> Result<ProductInformation> {
    match response {
        Response::ProductInfo(info) => Ok(info),
        _ => Err(StageError::UnexpectedResponse),
    }
}

pub(crate) fn expect_firmware(response: Response) -> Result<FirmwareVersion> {
    match response {
        Response::Firmware(firmware) => Ok(firmware),
        _ => Err(StageError::UnexpectedResponse),
    }
}

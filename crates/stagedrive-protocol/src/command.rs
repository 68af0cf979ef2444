//! Command/response vocabulary for the physical device adapter
//!
//! The control core talks to a device through exactly one primitive: send
//! a [`Command`], receive a raw [`Response`]. All sequencing, validation
//! and state tracking happen above this boundary; a device (or simulator)
//! behind it executes commands verbatim.

use crate::axis::Axis;
use crate::clock::{Clock, ClockPolarity};
use crate::motion::StepDirection;

/// One leg of a multi-axis microstep move.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepLeg {
    pub axis: Axis,
    /// Commanded velocity, mm/s (always positive; direction comes from
    /// the microstep sign).
    pub velocity: f64,
    /// Signed microstep count.
    pub microsteps: i32,
}

/// A single raw command sent to the device.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    // identity / health
    GetProductInfo,
    GetFirmwareVersion,
    GetSerialNumber,
    /// Heartbeat probe; the device answers within `timeout_ms` or not at
    /// all.
    Probe { timeout_ms: u32 },

    // continuous (piezo) actuation
    ReadPosition { axis: Axis },
    WritePosition { axis: Axis, position: f64 },
    WriteTheta { axis: Axis, milliradians: f64 },
    GetCalibration { axis: Axis },
    GetThetaRange { axis: Axis },
    GetTipTiltCenter,
    GetCommandedPosition,

    // discrete (stepper) actuation
    MoveSteps { leg: StepLeg },
    MoveThreeSteps { legs: [StepLeg; 3] },
    SingleStep { axis: Axis, direction: StepDirection },
    ReadStatus,
    ReadMoveStatus,
    Stop,
    ReadEncoders,
    ResetEncoder { axis: Axis },
    ReadMicrosteps { axis: Axis },
    GetMotorInfo,
    GetEncoderBitmap,

    // waveform pipeline
    WaveformArmRead { axis: Axis, points: u32, interval_ms: f64 },
    WaveformTriggerRead { axis: Axis },
    WaveformArmLoad { axis: Axis, interval_ms: f64, samples: Vec<f64> },
    WaveformTriggerLoad { axis: Axis },
    WfmaArm {
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<f64>,
        interval_ms: f64,
        /// Zero means repeat until stopped.
        iterations: u16,
    },
    WfmaTrigger,
    WfmaRead,
    WfmaStop,

    // clock & trigger binder
    BindClock { clock: Clock, axis: Axis, polarity: ClockPolarity },
    SetClockPolarity { clock: Clock, polarity: ClockPolarity },
    ResetClockDefaults,
    PulseClock { clock: Clock },
    GetClockFrequency,
}

/// Raw response to a [`Command`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Response {
    /// Command executed; nothing to report.
    Ack,
    ProductInfo(crate::info::ProductInformation),
    Firmware(crate::info::FirmwareVersion),
    Serial(u32),
    Attached(bool),
    Range(crate::motion::Range),
    /// A single position or angle value (piezo reads and clamped-write
    /// actuals).
    Position(f64),
    Triple([f64; 3]),
    Status(crate::motion::StatusWord),
    Moving(bool),
    Encoders([f64; 4]),
    Microsteps(i32),
    MotorInfo(crate::motion::MotorInfo),
    Bitmap(u8),
    Samples(Vec<f64>),
    TripleSamples {
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<f64>,
    },
    Frequency(crate::clock::ClockFrequency),
}

//! Waveform pipeline: decoupled setup, trigger and data transfer
//!
//! The split protocol exists so that buffer preparation, which may be
//! slow, never affects the timing accuracy of the hardware-timed
//! acquisition itself: `setup` arms an axis, a later `trigger` executes
//! at hardware-timed intervals, and the data transfer rides on the
//! trigger (read) or precedes it (load). One-call variants bundle the
//! sequence for callers that do not need the split.
//!
//! Armed state lives in the device record; a trigger must match the armed
//! axis, direction and data-point count exactly, and releasing the handle
//! discards everything armed.

use crate::device::{
    ArmedWaveform, WaveformDirection, WfmaState, expect_ack, expect_samples, expect_triple_samples,
};
use crate::error::{Result, StageError};
use crate::registry::Stage;
use stagedrive_protocol::{Axis, Command, MAX_WAVEFORM_POINTS};
use tracing::debug;

/// Result of a three-axis synchronized acquisition.
#[derive(Debug, Clone, PartialEq)]
pub struct WfmaCapture {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

fn validate_points(points: u32) -> Result<()> {
    if points == 0 || points > MAX_WAVEFORM_POINTS {
        return Err(StageError::Argument(
            "data-point count must be 1..=MAX_WAVEFORM_POINTS",
        ));
    }
    Ok(())
}

fn validate_interval(interval_ms: f64) -> Result<()> {
    if !interval_ms.is_finite() || interval_ms <= 0.0 {
        return Err(StageError::Argument("sample interval must be positive"));
    }
    Ok(())
}

impl Stage<'_> {
    // ---- single-axis split protocol ----------------------------------------

    /// Arm a read acquisition: fix the data-point count and sample
    /// interval for a later trigger.
    pub fn setup_read_waveform(&self, axis: Axis, points: u32, interval_ms: f64) -> Result<()> {
        validate_points(points)?;
        validate_interval(interval_ms)?;
        self.with_device(|dev| {
            dev.require_axis(axis)?;
            dev.piezo()?;
            expect_ack(dev.transact(Command::WaveformArmRead { axis, points, interval_ms })?)?;
            dev.record.armed[axis.index()] = Some(ArmedWaveform {
                direction: WaveformDirection::Read,
                points,
            });
            debug!(axis = %axis, points, interval_ms, "read waveform armed");
            Ok(())
        })
    }

    /// Execute a previously armed read acquisition and return its
    /// samples. The count must equal the armed count; counts never change
    /// implicitly.
    pub fn trigger_read_waveform(&self, axis: Axis, points: u32) -> Result<Vec<f64>> {
        validate_points(points)?;
        self.with_device(|dev| {
            dev.require_axis(axis)?;
            dev.piezo()?;
            match dev.record.armed[axis.index()] {
                Some(armed)
                    if armed.direction == WaveformDirection::Read && armed.points == points => {}
                _ => {
                    return Err(StageError::Usage(
                        "trigger does not match an armed read setup",
                    ));
                }
            }
            let samples = expect_samples(dev.transact(Command::WaveformTriggerRead { axis })?)?;
            dev.record.armed[axis.index()] = None;
            Ok(samples)
        })
    }

    /// One-call read: setup, trigger and transfer in a single blocking
    /// operation. Use the split calls when trigger timing matters.
    pub fn read_waveform(&self, axis: Axis, points: u32, interval_ms: f64) -> Result<Vec<f64>> {
        self.setup_read_waveform(axis, points, interval_ms)?;
        self.trigger_read_waveform(axis, points)
    }

    /// Arm a playback waveform: transfer the samples and fix the
    /// interval for a later trigger.
    pub fn setup_load_waveform(&self, axis: Axis, interval_ms: f64, samples: &[f64]) -> Result<()> {
        validate_points(samples.len() as u32)?;
        validate_interval(interval_ms)?;
        self.with_device(|dev| {
            dev.require_axis(axis)?;
            dev.piezo()?;
            expect_ack(dev.transact(Command::WaveformArmLoad {
                axis,
                interval_ms,
                samples: samples.to_vec(),
            })?)?;
            dev.record.armed[axis.index()] = Some(ArmedWaveform {
                direction: WaveformDirection::Load,
                points: samples.len() as u32,
            });
            debug!(axis = %axis, points = samples.len(), interval_ms, "load waveform armed");
            Ok(())
        })
    }

    /// Execute a previously armed playback at hardware-timed intervals.
    pub fn trigger_load_waveform(&self, axis: Axis) -> Result<()> {
        self.with_device(|dev| {
            dev.require_axis(axis)?;
            dev.piezo()?;
            match dev.record.armed[axis.index()] {
                Some(armed) if armed.direction == WaveformDirection::Load => {}
                _ => {
                    return Err(StageError::Usage(
                        "trigger does not match an armed load setup",
                    ));
                }
            }
            expect_ack(dev.transact(Command::WaveformTriggerLoad { axis })?)?;
            dev.record.armed[axis.index()] = None;
            Ok(())
        })
    }

    /// One-call load: setup, trigger and playback in a single blocking
    /// operation.
    pub fn load_waveform(&self, axis: Axis, interval_ms: f64, samples: &[f64]) -> Result<()> {
        self.setup_load_waveform(axis, interval_ms, samples)?;
        self.trigger_load_waveform(axis)
    }

    // ---- three-axis synchronized acquisition -------------------------------

    /// Bind per-axis playback buffers of equal length for a lockstep
    /// acquisition across axes X, Y and Z. `iterations == 0` repeats
    /// until stopped.
    pub fn wfma_setup(
        &self,
        x: &[f64],
        y: &[f64],
        z: &[f64],
        interval_ms: f64,
        iterations: u16,
    ) -> Result<()> {
        if x.len() != y.len() || y.len() != z.len() {
            return Err(StageError::Argument("per-axis buffers differ in length"));
        }
        let points = x.len() as u32;
        validate_points(points)?;
        validate_interval(interval_ms)?;
        self.with_device(|dev| {
            for axis in [Axis::X, Axis::Y, Axis::Z] {
                dev.require_axis(axis)?;
            }
            dev.piezo()?;
            expect_ack(dev.transact(Command::WfmaArm {
                x: x.to_vec(),
                y: y.to_vec(),
                z: z.to_vec(),
                interval_ms,
                iterations,
            })?)?;
            dev.record.wfma = Some(WfmaState { points, triggered: false });
            debug!(points, interval_ms, iterations, "wfma armed");
            Ok(())
        })
    }

    /// Trigger the armed acquisition and transfer the capture in one
    /// blocking call.
    pub fn wfma_trigger_and_read(&self) -> Result<WfmaCapture> {
        self.with_device(|dev| {
            dev.piezo()?;
            match dev.record.wfma {
                Some(state) if !state.triggered => {}
                _ => return Err(StageError::Usage("no armed wfma setup to trigger")),
            }
            expect_ack(dev.transact(Command::WfmaTrigger)?)?;
            let (x, y, z) = expect_triple_samples(dev.transact(Command::WfmaRead)?)?;
            dev.record.wfma = None;
            Ok(WfmaCapture { x, y, z })
        })
    }

    /// Trigger the armed acquisition without transferring data, so the
    /// transfer can happen later without affecting acquisition timing.
    pub fn wfma_trigger(&self) -> Result<()> {
        self.with_device(|dev| {
            dev.piezo()?;
            match dev.record.wfma {
                Some(state) if !state.triggered => {}
                _ => return Err(StageError::Usage("no armed wfma setup to trigger")),
            }
            expect_ack(dev.transact(Command::WfmaTrigger)?)?;
            if let Some(state) = dev.record.wfma.as_mut() {
                state.triggered = true;
            }
            Ok(())
        })
    }

    /// Transfer the capture of a previously triggered acquisition.
    pub fn wfma_read(&self) -> Result<WfmaCapture> {
        self.with_device(|dev| {
            dev.piezo()?;
            match dev.record.wfma {
                Some(state) if state.triggered => {}
                _ => return Err(StageError::Usage("no triggered wfma acquisition to read")),
            }
            let (x, y, z) = expect_triple_samples(dev.transact(Command::WfmaRead)?)?;
            dev.record.wfma = None;
            Ok(WfmaCapture { x, y, z })
        })
    }

    /// Abort the acquisition and disarm the pipeline.
    ///
    /// Abort policy: anything captured but not yet read is discarded and
    /// the device zero-fills its buffers; a subsequent trigger or read
    /// reports a usage error until a fresh setup arms the pipeline again.
    pub fn wfma_stop(&self) -> Result<()> {
        self.with_device(|dev| {
            dev.piezo()?;
            expect_ack(dev.transact(Command::WfmaStop)?)?;
            dev.record.wfma = None;
            debug!("wfma stopped");
            Ok(())
        })
    }
}

//! Motion engine: single-axis and three-axis moves, status, wait
//!
//! Continuous (piezo) writes are synchronous and return the position the
//! hardware actually reached, which may be clamped to the calibrated
//! range. Discrete (stepper) moves return as soon as the command is
//! issued; completion is observed through [`Stage::status`],
//! [`Stage::is_moving`] or the blocking [`Stage::wait`].

use crate::device::{
    expect_ack, expect_encoders, expect_microsteps, expect_moving, expect_position, expect_status,
};
use crate::error::{Result, StageError};
use crate::registry::Stage;
use stagedrive_protocol::{Axis, Command, Rounding, StatusWord, StepDirection, StepLeg};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default deadline for [`Stage::wait`].
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll period of the wait loop.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// One leg of a three-axis relative move: a physical distance plus the
/// rounding policy converting it to microsteps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveLeg {
    pub axis: Axis,
    /// Commanded velocity, mm/s.
    pub velocity: f64,
    /// Signed distance, mm.
    pub distance: f64,
    pub rounding: Rounding,
}

impl Stage<'_> {
    // ---- continuous (piezo) -------------------------------------------------

    /// Read the current position of a piezo axis.
    pub fn read_position(&self, axis: Axis) -> Result<f64> {
        self.with_device(|dev| {
            dev.require_axis(axis)?;
            dev.piezo()?;
            expect_position(dev.transact(Command::ReadPosition { axis })?)
        })
    }

    /// Write an absolute position to a piezo axis.
    ///
    /// Returns the position actually achieved; hardware clamps to the
    /// calibrated range, and the return value reflects that clamping, not
    /// the request.
    pub fn write_position(&self, axis: Axis, position: f64) -> Result<f64> {
        if !position.is_finite() {
            return Err(StageError::Argument("position must be finite"));
        }
        self.with_device(|dev| {
            dev.require_axis(axis)?;
            dev.piezo()?;
            let actual = expect_position(dev.transact(Command::WritePosition { axis, position })?)?;
            debug!(axis = %axis, position, actual, "position written");
            Ok(actual)
        })
    }

    /// Write a tilt angle in milliradians on a tip/tilt-capable stage.
    /// Returns the angle actually achieved.
    pub fn write_theta(&self, axis: Axis, milliradians: f64) -> Result<f64> {
        if !milliradians.is_finite() {
            return Err(StageError::Argument("angle must be finite"));
        }
        if !matches!(axis, Axis::X | Axis::Y) {
            return Err(StageError::InvalidAxis(axis));
        }
        self.with_device(|dev| {
            if !dev.piezo()?.tip_tilt {
                return Err(StageError::Usage("stage has no tip/tilt support"));
            }
            expect_position(dev.transact(Command::WriteTheta { axis, milliradians })?)
        })
    }

    // ---- discrete (stepper) -------------------------------------------------

    /// Issue a microstep move. Non-blocking: returns once the command is
    /// on the wire.
    pub fn move_microsteps(&self, axis: Axis, velocity: f64, microsteps: i32) -> Result<()> {
        self.with_device(|dev| {
            dev.require_axis(axis)?;
            let motor = dev.stepper()?.motor;
            validate_velocity(velocity, motor.min_velocity, motor.max_velocity)?;
            let leg = StepLeg { axis, velocity, microsteps };
            debug!(axis = %axis, velocity, microsteps, "microstep move issued");
            expect_ack(dev.transact(Command::MoveSteps { leg })?)
        })
    }

    /// Issue a relative move by physical distance; the rounding mode
    /// converts it to a whole microstep count. Non-blocking.
    pub fn move_relative(
        &self,
        axis: Axis,
        velocity: f64,
        distance: f64,
        rounding: Rounding,
    ) -> Result<()> {
        if !distance.is_finite() {
            return Err(StageError::Argument("distance must be finite"));
        }
        self.with_device(|dev| {
            dev.require_axis(axis)?;
            let motor = dev.stepper()?.motor;
            validate_velocity(velocity, motor.min_velocity, motor.max_velocity)?;
            let microsteps = rounding.microsteps(distance, motor.step_size);
            let leg = StepLeg { axis, velocity, microsteps };
            debug!(axis = %axis, velocity, distance, microsteps, "relative move issued");
            expect_ack(dev.transact(Command::MoveSteps { leg })?)
        })
    }

    /// Issue one atomic command moving three axes simultaneously.
    ///
    /// Every leg is validated before anything reaches the hardware: a
    /// single invalid axis or velocity aborts the whole command with no
    /// partial motion.
    pub fn move_three_microsteps(&self, legs: [StepLeg; 3]) -> Result<()> {
        self.with_device(|dev| {
            let motor = dev.stepper()?.motor;
            let limit = motor.max_velocity_for(3);
            for leg in &legs {
                dev.require_axis(leg.axis)?;
                validate_velocity(leg.velocity, motor.min_velocity, limit)?;
            }
            require_distinct_axes(&legs)?;
            debug!(?legs, "three-axis move issued");
            expect_ack(dev.transact(Command::MoveThreeSteps { legs })?)
        })
    }

    /// Three-axis relative move. The rounding conversion uses the same
    /// step size for every leg, preserving synchronized arrival.
    pub fn move_three_relative(&self, legs: [MoveLeg; 3]) -> Result<()> {
        self.with_device(|dev| {
            let motor = dev.stepper()?.motor;
            let limit = motor.max_velocity_for(3);
            for leg in &legs {
                if !leg.distance.is_finite() {
                    return Err(StageError::Argument("distance must be finite"));
                }
                dev.require_axis(leg.axis)?;
                validate_velocity(leg.velocity, motor.min_velocity, limit)?;
            }
            let step_legs = legs.map(|leg| StepLeg {
                axis: leg.axis,
                velocity: leg.velocity,
                microsteps: leg.rounding.microsteps(leg.distance, motor.step_size),
            });
            require_distinct_axes(&step_legs)?;
            debug!(?step_legs, "three-axis relative move issued");
            expect_ack(dev.transact(Command::MoveThreeSteps { legs: step_legs })?)
        })
    }

    /// Move one axis by exactly one microstep.
    pub fn single_step(&self, axis: Axis, direction: StepDirection) -> Result<()> {
        self.with_device(|dev| {
            dev.require_axis(axis)?;
            dev.stepper()?;
            expect_ack(dev.transact(Command::SingleStep { axis, direction })?)
        })
    }

    // ---- status & wait ------------------------------------------------------

    /// Read the 16-bit device status word.
    pub fn status(&self) -> Result<StatusWord> {
        self.with_device(|dev| {
            dev.stepper()?;
            expect_status(dev.transact(Command::ReadStatus)?)
        })
    }

    /// Whether any axis is still executing a move.
    pub fn is_moving(&self) -> Result<bool> {
        self.with_device(|dev| {
            dev.stepper()?;
            expect_moving(dev.transact(Command::ReadMoveStatus)?)
        })
    }

    /// Force any in-flight move to end now. Reports the status word at
    /// the moment of the stop.
    pub fn stop(&self) -> Result<StatusWord> {
        self.with_device(|dev| {
            dev.stepper()?;
            let word = expect_status(dev.transact(Command::Stop)?)?;
            debug!(status = word.raw(), "motion stopped");
            Ok(word)
        })
    }

    /// Block until the stage is idle, with the default deadline.
    pub fn wait(&self) -> Result<()> {
        self.wait_timeout(DEFAULT_WAIT_TIMEOUT)
    }

    /// Block until the stage is idle or the deadline expires.
    ///
    /// This is a liveness poll of an in-flight move, not a retry of a
    /// failed operation. The device lock is dropped between polls, and an
    /// idle answer must repeat on two consecutive polls before the wait
    /// ends, so one noisy status read cannot end it early.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut idle_polls = 0u32;
        loop {
            if !self.is_moving()? {
                idle_polls += 1;
                if idle_polls >= 2 {
                    return Ok(());
                }
            } else {
                idle_polls = 0;
            }
            if Instant::now() >= deadline {
                return Err(StageError::Timeout);
            }
            std::thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    // ---- encoders -----------------------------------------------------------

    /// Read all four encoder channels.
    pub fn read_encoders(&self) -> Result<[f64; 4]> {
        self.with_device(|dev| {
            dev.stepper()?;
            expect_encoders(dev.transact(Command::ReadEncoders)?)
        })
    }

    /// Read one axis' encoder. The axis must carry an encoder per the
    /// device's encoder bitmap.
    pub fn encoder_position(&self, axis: Axis) -> Result<f64> {
        self.with_device(|dev| {
            dev.require_encoder(axis)?;
            let values = expect_encoders(dev.transact(Command::ReadEncoders)?)?;
            Ok(values[axis.index()])
        })
    }

    /// Zero one axis' encoder.
    pub fn reset_encoder(&self, axis: Axis) -> Result<()> {
        self.with_device(|dev| {
            dev.require_encoder(axis)?;
            expect_ack(dev.transact(Command::ResetEncoder { axis })?)
        })
    }

    /// Zero every encoder the device carries.
    pub fn reset_encoders(&self) -> Result<()> {
        self.with_device(|dev| {
            let encoders = dev.stepper()?.encoders;
            for axis in encoders.iter() {
                expect_ack(dev.transact(Command::ResetEncoder { axis })?)?;
            }
            Ok(())
        })
    }

    /// Current microstep position of one axis.
    pub fn microstep_position(&self, axis: Axis) -> Result<i32> {
        self.with_device(|dev| {
            dev.require_axis(axis)?;
            dev.stepper()?;
            expect_microsteps(dev.transact(Command::ReadMicrosteps { axis })?)
        })
    }
}

fn validate_velocity(velocity: f64, min: f64, max: f64) -> Result<()> {
    if !velocity.is_finite() || velocity < min || velocity > max {
        return Err(StageError::Argument("velocity outside the motor's range"));
    }
    Ok(())
}

fn require_distinct_axes(legs: &[StepLeg; 3]) -> Result<()> {
    for i in 0..legs.len() {
        for j in (i + 1)..legs.len() {
            if legs[i].axis == legs[j].axis {
                return Err(StageError::Argument("three-axis move repeats an axis"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_validation_bounds() {
        assert!(validate_velocity(1.0, 0.1, 4.0).is_ok());
        assert!(validate_velocity(0.05, 0.1, 4.0).is_err());
        assert!(validate_velocity(5.0, 0.1, 4.0).is_err());
        assert!(validate_velocity(f64::NAN, 0.1, 4.0).is_err());
    }

    #[test]
    fn repeated_axes_are_rejected() {
        let leg = |axis| StepLeg { axis, velocity: 1.0, microsteps: 1 };
        assert!(require_distinct_axes(&[leg(Axis::X), leg(Axis::Y), leg(Axis::Z)]).is_ok());
        assert!(require_distinct_axes(&[leg(Axis::X), leg(Axis::X), leg(Axis::Z)]).is_err());
    }
}

//! Legacy call variants
//!
//! Backward-compatible surfaces kept for callers written against the old
//! API. Every one is a thin adapter over exactly one canonical operation
//! with an explicit width narrowing; none duplicates logic, so legacy and
//! canonical calls agree on the non-truncated bits by construction.

use crate::error::Result;
use crate::motion::MoveLeg;
use crate::registry::Stage;
use stagedrive_protocol::{Axis, Rounding, StepLeg};

impl Stage<'_> {
    /// 8-bit status word: the low byte of [`Stage::status`].
    pub fn legacy_status(&self) -> Result<u8> {
        Ok(self.status()?.legacy())
    }

    /// Stop, reporting the 8-bit status word at the moment of the stop.
    pub fn legacy_stop(&self) -> Result<u8> {
        Ok(self.stop()?.legacy())
    }

    /// Relative move in the old argument order.
    pub fn legacy_move_profile(
        &self,
        axis: Axis,
        velocity: f64,
        distance: f64,
        rounding: Rounding,
    ) -> Result<()> {
        self.move_relative(axis, velocity, distance, rounding)
    }

    /// Three-axis relative move with the axes fixed to X, Y, Z.
    #[allow(clippy::too_many_arguments)]
    pub fn move_profile_xyz(
        &self,
        velocity_x: f64,
        distance_x: f64,
        rounding_x: Rounding,
        velocity_y: f64,
        distance_y: f64,
        rounding_y: Rounding,
        velocity_z: f64,
        distance_z: f64,
        rounding_z: Rounding,
    ) -> Result<()> {
        self.move_three_relative([
            MoveLeg { axis: Axis::X, velocity: velocity_x, distance: distance_x, rounding: rounding_x },
            MoveLeg { axis: Axis::Y, velocity: velocity_y, distance: distance_y, rounding: rounding_y },
            MoveLeg { axis: Axis::Z, velocity: velocity_z, distance: distance_z, rounding: rounding_z },
        ])
    }

    /// Three-axis microstep move with the axes fixed to X, Y, Z.
    pub fn move_profile_xyz_microsteps(
        &self,
        velocity_x: f64,
        microsteps_x: i32,
        velocity_y: f64,
        microsteps_y: i32,
        velocity_z: f64,
        microsteps_z: i32,
    ) -> Result<()> {
        self.move_three_microsteps([
            StepLeg { axis: Axis::X, velocity: velocity_x, microsteps: microsteps_x },
            StepLeg { axis: Axis::Y, velocity: velocity_y, microsteps: microsteps_y },
            StepLeg { axis: Axis::Z, velocity: velocity_z, microsteps: microsteps_z },
        ])
    }

    /// X/Y/Z encoder values: the first three of the canonical four
    /// channels.
    pub fn legacy_read_encoders(&self) -> Result<[f64; 3]> {
        let [x, y, z, _aux] = self.read_encoders()?;
        Ok([x, y, z])
    }
}

//! Motion primitives: rounding modes, status words, motor profiles

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Policy converting a continuous distance into an integer microstep
/// count.
///
/// The conversion works on the magnitude and reapplies the sign, so for a
/// given distance `Up` never yields fewer microsteps than `Truncate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Rounding {
    /// Round to the nearest whole microstep.
    #[default]
    Nearest = 0,
    /// Drop the fractional microstep (round toward zero).
    Truncate = 1,
    /// Round the magnitude up to the next whole microstep.
    Up = 2,
}

impl Rounding {
    /// Convert a physical distance to a signed microstep count.
    ///
    /// `step_size` is the physical length of one microstep and must be
    /// positive; callers validate it against the motor profile first.
    pub fn microsteps(self, distance: f64, step_size: f64) -> i32 {
        let steps = distance.abs() / step_size;
        let magnitude = match self {
            Rounding::Nearest => steps.round(),
            Rounding::Truncate => steps.trunc(),
            Rounding::Up => steps.ceil(),
        };
        let signed = if distance.is_sign_negative() {
            -magnitude
        } else {
            magnitude
        };
        signed as i32
    }
}

/// Direction of a single discrete step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepDirection {
    Forward,
    Reverse,
}

/// 16-bit device status word.
///
/// The low byte carries the bits the legacy 8-bit status exposed; legacy
/// and canonical reads therefore agree on the non-truncated bits by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusWord(pub u16);

impl StatusWord {
    /// Per-axis forward limit-switch bits occupy the low nibble.
    pub const LIMIT_MASK: u16 = 0x000f;
    /// Set while any axis is still executing a move.
    pub const MOVING: u16 = 0x0100;
    /// Set when the last move was cut short by an explicit stop.
    pub const STOPPED_SHORT: u16 = 0x0200;

    pub fn raw(self) -> u16 {
        self.0
    }

    /// Low byte, as reported by the legacy 8-bit status calls.
    pub fn legacy(self) -> u8 {
        (self.0 & 0x00ff) as u8
    }

    pub fn is_moving(self) -> bool {
        self.0 & Self::MOVING != 0
    }

    pub fn stopped_short(self) -> bool {
        self.0 & Self::STOPPED_SHORT != 0
    }
}

/// Closed min/max interval, used for calibration and theta ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Static motor characteristics of a micro-stepping stage.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotorInfo {
    /// Encoder resolution in millimeters per count.
    pub encoder_resolution: f64,
    /// Physical length of one microstep, in millimeters.
    pub step_size: f64,
    /// Velocity ceiling for a single-axis move, mm/s.
    pub max_velocity: f64,
    /// Velocity ceiling when two axes move together, mm/s.
    pub max_velocity_two_axis: f64,
    /// Velocity ceiling when three axes move together, mm/s.
    pub max_velocity_three_axis: f64,
    /// Slowest commandable velocity, mm/s.
    pub min_velocity: f64,
}

impl MotorInfo {
    /// Velocity ceiling for a simultaneous move of `axes` axes (1-3).
    pub fn max_velocity_for(&self, axes: usize) -> f64 {
        match axes {
            0 | 1 => self.max_velocity,
            2 => self.max_velocity_two_axis,
            _ => self.max_velocity_three_axis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn truncate_matches_expected_step_count() {
        // 10.0 mm at 0.1 mm per microstep
        assert_eq!(Rounding::Truncate.microsteps(10.0, 0.1), 100);
    }

    #[test]
    fn rounding_modes_differ_on_fractional_steps() {
        assert_eq!(Rounding::Truncate.microsteps(1.05, 0.5), 2);
        assert_eq!(Rounding::Nearest.microsteps(1.05, 0.5), 2);
        assert_eq!(Rounding::Up.microsteps(1.05, 0.5), 3);
    }

    #[test]
    fn sign_is_preserved() {
        assert_eq!(Rounding::Up.microsteps(-1.05, 0.5), -3);
        assert_eq!(Rounding::Truncate.microsteps(-1.05, 0.5), -2);
    }

    #[test]
    fn legacy_status_is_low_byte() {
        let status = StatusWord(0x01ab);
        assert_eq!(status.legacy(), 0xab);
        assert!(status.is_moving());
    }

    proptest! {
        /// Up never yields a smaller magnitude than Truncate.
        #[test]
        fn up_never_smaller_than_truncate(
            distance in -1000.0f64..1000.0,
            step_size in 0.001f64..10.0,
        ) {
            let up = Rounding::Up.microsteps(distance, step_size);
            let trunc = Rounding::Truncate.microsteps(distance, step_size);
            prop_assert!(up.unsigned_abs() >= trunc.unsigned_abs());
        }

        /// All modes agree within one microstep of each other.
        #[test]
        fn modes_agree_within_one_step(
            distance in -1000.0f64..1000.0,
            step_size in 0.001f64..10.0,
        ) {
            let up = Rounding::Up.microsteps(distance, step_size);
            let trunc = Rounding::Truncate.microsteps(distance, step_size);
            prop_assert!((up - trunc).abs() <= 1);
        }
    }
}

//! Logical timing sources and polarity modes
//!
//! Devices expose four logical clocks that can be pulsed directly or bound
//! to axes so that axis activity emits synchronization edges.

use crate::axis::Axis;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Logical timing source identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Clock {
    Pixel = 1,
    Line = 2,
    Frame = 3,
    Aux = 4,
}

/// Signal edge polarity. Values follow the firmware encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ClockPolarity {
    LowToHigh = 2,
    HighToLow = 3,
}

/// Association of a clock with a physical axis and polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockBinding {
    pub clock: Clock,
    pub axis: Axis,
    pub polarity: ClockPolarity,
}

/// Current ADC/DAC sampling frequency pair, in hertz.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockFrequency {
    pub adc_hz: f64,
    pub dac_hz: f64,
}

//! Axis indices and axis bitmaps
//!
//! Axes are 1-based across the whole API, matching the device firmware
//! convention. A device advertises which axes are physically present via
//! an [`AxisBitmap`] where bit `1 << (axis - 1)` marks axis presence.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Physical axis index (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Axis {
    X = 1,
    Y = 2,
    Z = 3,
    Aux = 4,
}

impl Axis {
    /// All axes, in index order.
    pub const ALL: [Axis; 4] = [Axis::X, Axis::Y, Axis::Z, Axis::Aux];

    /// Zero-based index, for array addressing.
    pub fn index(self) -> usize {
        (self as u8 - 1) as usize
    }

    /// Presence bit inside an [`AxisBitmap`].
    pub fn bit(self) -> u8 {
        1 << (self as u8 - 1)
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
            Axis::Z => write!(f, "Z"),
            Axis::Aux => write!(f, "AUX"),
        }
    }
}

/// Set of axes physically present on a device.
///
/// Bits 0-3 map to axes 1-4. On piezo devices bit 4 marks "Z encoder
/// present" per the firmware convention; it is carried through untouched
/// and never interpreted as an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisBitmap(pub u8);

impl AxisBitmap {
    pub fn contains(self, axis: Axis) -> bool {
        self.0 & axis.bit() != 0
    }

    /// Iterator over the axes present, in index order.
    pub fn iter(self) -> impl Iterator<Item = Axis> {
        Axis::ALL.into_iter().filter(move |a| self.contains(*a))
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    /// Z-encoder presence bit used by piezo devices.
    pub fn z_encoder_present(self) -> bool {
        self.0 & 0x10 != 0
    }
}

impl std::fmt::Display for AxisBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for axis in self.iter() {
            if !first {
                write!(f, "+")?;
            }
            write!(f, "{axis}")?;
            first = false;
        }
        if first {
            write!(f, "none")?;
        }
        Ok(())
    }
}

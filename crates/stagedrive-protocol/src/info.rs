//! Product identity records
//!
//! [`ProductInformation`] is a fixed-layout telemetry record: 11 bytes,
//! tightly packed, little-endian, field order exactly as declared. Any
//! party exposing it over a boundary (file, socket, shared memory) must
//! reproduce this byte layout, so encode/decode are hand-rolled rather
//! than derived.

use crate::ProtocolError;
use crate::axis::AxisBitmap;

/// Known product identities.
pub mod products {
    /// Nano-Drive single axis
    pub const NANO_DRIVE_1: i16 = 0x2001;
    /// Nano-Drive three axis
    pub const NANO_DRIVE_3: i16 = 0x2003;
    /// Nano-Drive four axis
    pub const NANO_DRIVE_4: i16 = 0x2004;
    /// Nano-Drive 16-bit tip/tilt Z
    pub const NANO_DRIVE_TIP_TILT: i16 = 0x2053;
    /// Nano-Drive 20-bit single axis
    pub const NANO_DRIVE_20BIT_1: i16 = 0x2201;
    /// Nano-Drive 20-bit three axis
    pub const NANO_DRIVE_20BIT_3: i16 = 0x2203;
    /// Nano-Drive 20-bit tip/tilt Z
    pub const NANO_DRIVE_20BIT_TIP_TILT: i16 = 0x2253;
    /// Nano-Gauge
    pub const NANO_GAUGE: i16 = 0x2100;
    /// C-Focus
    pub const C_FOCUS: i16 = 0x2401;
    /// Micro-Drive single axis
    pub const MICRO_DRIVE_1: i16 = 0x2501;
    /// Micro-Drive three axis
    pub const MICRO_DRIVE_3: i16 = 0x2503;
    /// Micro-Drive four axis with encoders
    pub const MICRO_DRIVE_4: i16 = 0x2504;
}

/// Actuation family of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceFamily {
    /// Continuous-position piezo actuators (analog position writes).
    Piezo,
    /// Discrete micro-stepping motor actuators (velocity + step counts).
    Stepper,
}

impl DeviceFamily {
    /// Classify a product id. Micro-Drive products live in the 0x25xx
    /// block; everything else known is a piezo-family product.
    pub fn from_product_id(product_id: i16) -> Option<DeviceFamily> {
        match product_id {
            id if id & 0x7f00 == 0x2500 => Some(DeviceFamily::Stepper),
            products::NANO_DRIVE_1
            | products::NANO_DRIVE_3
            | products::NANO_DRIVE_4
            | products::NANO_DRIVE_TIP_TILT
            | products::NANO_DRIVE_20BIT_1
            | products::NANO_DRIVE_20BIT_3
            | products::NANO_DRIVE_20BIT_TIP_TILT
            | products::NANO_GAUGE
            | products::C_FOCUS => Some(DeviceFamily::Piezo),
            _ => None,
        }
    }

    /// Whether the product supports tip/tilt (angular) positioning.
    pub fn is_tip_tilt(product_id: i16) -> bool {
        matches!(
            product_id,
            products::NANO_DRIVE_TIP_TILT | products::NANO_DRIVE_20BIT_TIP_TILT
        )
    }
}

/// Firmware version/profile pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FirmwareVersion {
    pub version: i16,
    pub profile: i16,
}

/// Fixed-layout product identity record.
///
/// Wire layout (little-endian, no padding, 11 bytes total):
///
/// | offset | field            | type |
/// |--------|------------------|------|
/// | 0      | axis_bitmap      | u8   |
/// | 1      | adc_resolution   | i16  |
/// | 3      | dac_resolution   | i16  |
/// | 5      | product_id       | i16  |
/// | 7      | firmware_version | i16  |
/// | 9      | firmware_profile | i16  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProductInformation {
    /// Bitmap of physically present axes.
    pub axis_bitmap: u8,
    /// ADC resolution in bits.
    pub adc_resolution: i16,
    /// DAC resolution in bits.
    pub dac_resolution: i16,
    pub product_id: i16,
    pub firmware_version: i16,
    pub firmware_profile: i16,
}

impl ProductInformation {
    /// Size of the packed wire form.
    pub const WIRE_SIZE: usize = 11;

    /// Encode to the packed 11-byte wire form.
    pub fn encode(&self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        out[0] = self.axis_bitmap;
        out[1..3].copy_from_slice(&self.adc_resolution.to_le_bytes());
        out[3..5].copy_from_slice(&self.dac_resolution.to_le_bytes());
        out[5..7].copy_from_slice(&self.product_id.to_le_bytes());
        out[7..9].copy_from_slice(&self.firmware_version.to_le_bytes());
        out[9..11].copy_from_slice(&self.firmware_profile.to_le_bytes());
        out
    }

    /// Decode from the packed wire form. The slice length must be exactly
    /// [`Self::WIRE_SIZE`].
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != Self::WIRE_SIZE {
            return Err(ProtocolError::InvalidLength {
                expected: Self::WIRE_SIZE,
                actual: bytes.len(),
            });
        }
        let le16 = |at: usize| i16::from_le_bytes([bytes[at], bytes[at + 1]]);
        Ok(Self {
            axis_bitmap: bytes[0],
            adc_resolution: le16(1),
            dac_resolution: le16(3),
            product_id: le16(5),
            firmware_version: le16(7),
            firmware_profile: le16(9),
        })
    }

    pub fn axes(&self) -> AxisBitmap {
        AxisBitmap(self.axis_bitmap)
    }

    pub fn firmware(&self) -> FirmwareVersion {
        FirmwareVersion {
            version: self.firmware_version,
            profile: self.firmware_profile,
        }
    }

    pub fn family(&self) -> Option<DeviceFamily> {
        DeviceFamily::from_product_id(self.product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProductInformation {
        ProductInformation {
            axis_bitmap: 0x07,
            adc_resolution: 16,
            dac_resolution: 16,
            product_id: 2100,
            firmware_version: 101,
            firmware_profile: 3,
        }
    }

    #[test]
    fn wire_form_is_eleven_bytes_packed() {
        let bytes = sample().encode();
        assert_eq!(bytes.len(), 11);
        assert_eq!(bytes[0], 0x07);
        // adc = 16 little-endian
        assert_eq!(&bytes[1..3], &[16, 0]);
        // product_id 2100 = 0x0834
        assert_eq!(&bytes[5..7], &[0x34, 0x08]);
    }

    #[test]
    fn encode_decode_round_trip() {
        let info = sample();
        let bytes = info.encode();
        let back = ProductInformation::decode(&bytes).unwrap();
        assert_eq!(back, info);
        assert_eq!(back.encode(), bytes);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let err = ProductInformation::decode(&[0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidLength {
                expected: 11,
                actual: 10
            }
        ));
    }

    #[test]
    fn family_classification() {
        assert_eq!(
            DeviceFamily::from_product_id(products::NANO_DRIVE_3),
            Some(DeviceFamily::Piezo)
        );
        assert_eq!(
            DeviceFamily::from_product_id(products::MICRO_DRIVE_3),
            Some(DeviceFamily::Stepper)
        );
        assert_eq!(DeviceFamily::from_product_id(0x0042), None);
        assert!(DeviceFamily::is_tip_tilt(products::NANO_DRIVE_TIP_TILT));
        assert!(!DeviceFamily::is_tip_tilt(products::NANO_DRIVE_3));
    }
}

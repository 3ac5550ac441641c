//! Touchscreen calibration record
//!
//! Maps raw controller coordinates to panel pixels. Persisted to flash with
//! postcard under `StorageKey::TouchCalibration`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use l4bsp_hal::crc::{CrcConfig, CrcUnit, SoftwareCrc};

/// Magic number to identify valid calibration data
pub const CALIBRATION_MAGIC: u32 = 0x5453_4341; // "TSCA"

/// Current calibration data version
pub const CALIBRATION_VERSION: u8 = 1;

/// Largest serialized calibration record
pub const MAX_CALIBRATION_SIZE: usize = 64;

/// Raw reading range of one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisCalibration {
    /// Raw value at pixel 0
    pub raw_min: u16,
    /// Raw value at the last pixel
    pub raw_max: u16,
}

impl AxisCalibration {
    /// Identity mapping for a controller whose raw range is `0..span`
    pub const fn identity(span: u16) -> Self {
        Self {
            raw_min: 0,
            raw_max: span.saturating_sub(1),
        }
    }

    /// Map a raw value onto `0..pixels`, clamping outside the range
    ///
    /// `raw_min > raw_max` describes an inverted axis.
    pub fn map(&self, raw: u16, pixels: u16) -> u16 {
        if pixels == 0 {
            return 0;
        }
        // 16-bit span times 16-bit panel overflows i32
        let last = i64::from(pixels - 1);
        let (lo, hi) = (i64::from(self.raw_min), i64::from(self.raw_max));
        if lo == hi {
            return 0;
        }
        let scaled = (i64::from(raw) - lo) * last / (hi - lo);
        scaled.clamp(0, last) as u16
    }
}

/// Touchscreen calibration stored in flash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TouchCalibration {
    /// Magic number for validation
    pub magic: u32,
    /// Data format version
    pub version: u8,
    pub x: AxisCalibration,
    pub y: AxisCalibration,
    /// CRC32 over magic..y
    pub crc: u32,
}

impl TouchCalibration {
    /// Calibration that maps raw coordinates one-to-one onto the panel
    pub fn identity(width: u16, height: u16) -> Self {
        Self::new(AxisCalibration::identity(width), AxisCalibration::identity(height))
    }

    /// Create a record from measured axis ranges, with its CRC filled in
    pub fn new(x: AxisCalibration, y: AxisCalibration) -> Self {
        let mut cal = Self {
            magic: CALIBRATION_MAGIC,
            version: CALIBRATION_VERSION,
            x,
            y,
            crc: 0,
        };
        cal.update_crc();
        cal
    }

    /// Check magic and version
    pub fn is_valid(&self) -> bool {
        self.magic == CALIBRATION_MAGIC && self.version == CALIBRATION_VERSION
    }

    /// Calculate the CRC32 of the record (excluding the crc field)
    pub fn calculate_crc(&self) -> u32 {
        let mut crc = SoftwareCrc::new(CrcConfig::crc32_ieee());
        crc.feed_bytes(&self.magic.to_le_bytes());
        crc.feed_bytes(&[self.version]);
        crc.feed_bytes(&self.x.raw_min.to_le_bytes());
        crc.feed_bytes(&self.x.raw_max.to_le_bytes());
        crc.feed_bytes(&self.y.raw_min.to_le_bytes());
        !crc.feed_bytes(&self.y.raw_max.to_le_bytes())
    }

    /// Update the CRC field
    pub fn update_crc(&mut self) {
        self.crc = self.calculate_crc();
    }

    /// Verify the CRC is correct
    pub fn verify_crc(&self) -> bool {
        self.crc == self.calculate_crc()
    }

    /// Map a raw sample to panel pixels
    pub fn apply(&self, raw_x: u16, raw_y: u16, width: u16, height: u16) -> (u16, u16) {
        (self.x.map(raw_x, width), self.y.map(raw_y, height))
    }
}

/// Errors decoding a persisted calibration record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Serialization failed
    Serialize,
    /// Deserialization failed
    Deserialize,
    /// Invalid magic or version
    InvalidFormat,
    /// CRC check failed
    CrcMismatch,
}

#[cfg(feature = "serde")]
impl TouchCalibration {
    /// Serialize into `buffer`, returning the used part
    pub fn encode<'a>(&self, buffer: &'a mut [u8]) -> Result<&'a mut [u8], CalibrationError> {
        postcard::to_slice(self, buffer).map_err(|_| CalibrationError::Serialize)
    }

    /// Deserialize and validate a stored record
    pub fn decode(bytes: &[u8]) -> Result<Self, CalibrationError> {
        let cal: Self = postcard::from_bytes(bytes).map_err(|_| CalibrationError::Deserialize)?;
        if !cal.is_valid() {
            return Err(CalibrationError::InvalidFormat);
        }
        if !cal.verify_crc() {
            return Err(CalibrationError::CrcMismatch);
        }
        Ok(cal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_mapping() {
        let cal = TouchCalibration::identity(390, 390);
        assert_eq!(cal.apply(0, 0, 390, 390), (0, 0));
        assert_eq!(cal.apply(389, 200, 390, 390), (389, 200));
    }

    #[test]
    fn test_inverted_axis() {
        let axis = AxisCalibration {
            raw_min: 4000,
            raw_max: 100,
        };
        assert_eq!(axis.map(4000, 320), 0);
        assert_eq!(axis.map(100, 320), 319);
        // Outside the calibrated range clamps
        assert_eq!(axis.map(4095, 320), 0);
        assert_eq!(axis.map(0, 320), 319);
    }

    #[test]
    fn test_full_range_does_not_overflow() {
        let axis = AxisCalibration {
            raw_min: 0,
            raw_max: 1,
        };
        assert_eq!(axis.map(u16::MAX, u16::MAX), u16::MAX - 1);
        assert_eq!(axis.map(0, u16::MAX), 0);

        let inverted = AxisCalibration {
            raw_min: u16::MAX,
            raw_max: 0,
        };
        assert_eq!(inverted.map(0, u16::MAX), u16::MAX - 1);
    }

    #[test]
    fn test_crc_consistency() {
        let mut cal = TouchCalibration::new(
            AxisCalibration {
                raw_min: 120,
                raw_max: 3900,
            },
            AxisCalibration {
                raw_min: 200,
                raw_max: 3800,
            },
        );
        assert!(cal.is_valid());
        assert!(cal.verify_crc());

        cal.x.raw_min = 0;
        assert!(!cal.verify_crc());
    }

    proptest::proptest! {
        #[test]
        fn prop_mapped_value_stays_on_panel(
            raw_min in proptest::prelude::any::<u16>(),
            raw_max in proptest::prelude::any::<u16>(),
            raw in proptest::prelude::any::<u16>(),
            pixels in 1u16..=u16::MAX,
        ) {
            let axis = AxisCalibration { raw_min, raw_max };
            proptest::prop_assert!(axis.map(raw, pixels) < pixels);
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_decode_rejects_corrupted_record() {
        let cal = TouchCalibration::identity(390, 390);
        let mut buffer = [0u8; MAX_CALIBRATION_SIZE];
        let len = cal.encode(&mut buffer).unwrap().len();
        assert_eq!(TouchCalibration::decode(&buffer[..len]), Ok(cal));

        let mut tampered = cal;
        tampered.y.raw_max = 10;
        let len = tampered.encode(&mut buffer).unwrap().len();
        assert_eq!(
            TouchCalibration::decode(&buffer[..len]),
            Err(CalibrationError::CrcMismatch)
        );
    }
}

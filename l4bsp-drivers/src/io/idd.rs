//! IDD measurement settings and result decoding for the MFX
//!
//! The MFX switches a chain of shunt resistors in series with the MCU
//! supply, picks the one giving the best resolution and reports the
//! averaged current in units of 10 nA.

use l4bsp_core::config::IddSettings;

/// Number of shunt positions
pub const MAX_SHUNTS: usize = 5;

/// Delay unit bit: set = 20 ms steps, clear = 0.5 ms steps
pub const DELAY_UNIT_20MS: u8 = 0x80;

/// Delay value field
pub const DELAY_VALUE_MASK: u8 = 0x7F;

/// IDD_CTRL bits
pub mod ctrl {
    /// Start a measurement
    pub const REQ: u8 = 0x01;
    /// Number of shunts on board, bits 3:1
    pub const SHUNT_NB_MASK: u8 = 0x0E;
    /// Skip the VDD measurement
    pub const VREF_DIS: u8 = 0x40;
    /// Skip the calibration cycle
    pub const CAL_DIS: u8 = 0x80;
}

/// IDD configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IddError {
    /// Shunt count outside 1..=5
    ShuntCount,
    /// Zero measurements requested
    NoMeasurements,
    /// The MFX reported a measurement error
    Measurement(IddErrorSource),
}

/// Error latched by the MFX (ERROR_SRC and ERROR_MSG registers)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IddErrorSource {
    pub source: u8,
    pub message: u8,
}

/// Full IDD measurement configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IddConfig {
    /// Shunt resistor values as programmed into the MFX
    pub shunts: [u16; MAX_SHUNTS],
    /// Settling delay after switching to each shunt (raw, 0.5 ms units)
    pub stabilization: [u8; MAX_SHUNTS],
    /// Amplifier gain ×100
    pub gain: u16,
    /// Minimum VDD for a valid measurement (mV)
    pub vdd_min_mv: u16,
    /// Delay before the first measurement (ms)
    pub pre_delay_ms: u16,
    /// Number of averaged measurements
    pub measurements: u8,
    /// Delay between measurements (ms)
    pub delta_delay_ms: u16,
    /// Number of shunts fitted
    pub shunts_on_board: u8,
    /// Run the offset calibration before measuring
    pub calibration: bool,
    /// Measure VDD alongside the current
    pub vref_measurement: bool,
}

impl IddConfig {
    /// Evaluation board shunt bank with timing taken from the board settings
    pub fn from_settings(settings: &IddSettings) -> Self {
        Self {
            shunts: [1000, 24, 620, 0, 10_000],
            stabilization: [149, 149, 149, 0, 255],
            gain: 4967,
            vdd_min_mv: settings.vdd_min_mv,
            pre_delay_ms: settings.pre_delay_ms,
            measurements: settings.measurements,
            delta_delay_ms: settings.delta_delay_ms,
            shunts_on_board: settings.shunts_on_board,
            calibration: true,
            vref_measurement: true,
        }
    }

    /// Check ranges before programming the MFX
    pub fn validate(&self) -> Result<(), IddError> {
        if self.shunts_on_board == 0 || self.shunts_on_board as usize > MAX_SHUNTS {
            return Err(IddError::ShuntCount);
        }
        if self.measurements == 0 {
            return Err(IddError::NoMeasurements);
        }
        Ok(())
    }

    /// IDD_CTRL value without the request bit
    pub fn ctrl(&self) -> u8 {
        let mut value = (self.shunts_on_board << 1) & ctrl::SHUNT_NB_MASK;
        if !self.vref_measurement {
            value |= ctrl::VREF_DIS;
        }
        if !self.calibration {
            value |= ctrl::CAL_DIS;
        }
        value
    }
}

/// Encode a delay in milliseconds into the MFX delay register format
///
/// Up to 63.5 ms is encoded in 0.5 ms steps, longer delays in 20 ms steps
/// (saturating at 2540 ms).
pub fn encode_delay(ms: u16) -> u8 {
    if ms <= 63 {
        (ms * 2) as u8
    } else {
        ((ms / 20).min(DELAY_VALUE_MASK as u16) as u8) | DELAY_UNIT_20MS
    }
}

/// Decode a delay register back to milliseconds (rounded down)
pub fn decode_delay(raw: u8) -> u16 {
    let value = (raw & DELAY_VALUE_MASK) as u16;
    if raw & DELAY_UNIT_20MS != 0 {
        value * 20
    } else {
        value / 2
    }
}

/// Decode the 24-bit IDD value registers (MSB first) into nanoamps
pub fn decode_value_na(raw: [u8; 3]) -> u32 {
    let tens_of_na = (raw[0] as u32) << 16 | (raw[1] as u32) << 8 | raw[2] as u32;
    tens_of_na * 10
}

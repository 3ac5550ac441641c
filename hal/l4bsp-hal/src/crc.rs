//! CRC calculation unit
//!
//! Models the STM32 CRC peripheral: programmable polynomial (8/16/32 bit),
//! initial value, input bit reversal and output bit reversal. No final XOR
//! is applied by the unit.

/// Polynomial width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PolySize {
    Width8,
    Width16,
    Width32,
}

impl PolySize {
    /// Width in bits
    pub fn bits(self) -> u32 {
        match self {
            PolySize::Width8 => 8,
            PolySize::Width16 => 16,
            PolySize::Width32 => 32,
        }
    }

    fn mask(self) -> u32 {
        match self {
            PolySize::Width32 => u32::MAX,
            other => (1u32 << other.bits()) - 1,
        }
    }
}

/// Input data bit reversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputReverse {
    /// Data is processed as written
    None,
    /// Bits reversed within each byte
    Byte,
    /// Bits reversed within each halfword
    HalfWord,
    /// Bits reversed within the whole word
    Word,
}

/// CRC unit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CrcConfig {
    /// Generator polynomial (without the implicit top bit)
    pub polynomial: u32,
    /// Polynomial width
    pub size: PolySize,
    /// Value loaded on reset
    pub initial: u32,
    /// Input bit reversal
    pub input_reverse: InputReverse,
    /// Reverse the bits of the result
    pub output_reverse: bool,
}

impl Default for CrcConfig {
    /// Peripheral reset configuration (CRC-32/MPEG-2 without final XOR)
    fn default() -> Self {
        Self {
            polynomial: 0x04C1_1DB7,
            size: PolySize::Width32,
            initial: 0xFFFF_FFFF,
            input_reverse: InputReverse::None,
            output_reverse: false,
        }
    }
}

impl CrcConfig {
    /// Ethernet/zlib CRC-32 (the caller complements the result)
    pub const fn crc32_ieee() -> Self {
        Self {
            polynomial: 0x04C1_1DB7,
            size: PolySize::Width32,
            initial: 0xFFFF_FFFF,
            input_reverse: InputReverse::Byte,
            output_reverse: true,
        }
    }

    /// CRC-16/CCITT-FALSE
    pub const fn crc16_ccitt() -> Self {
        Self {
            polynomial: 0x1021,
            size: PolySize::Width16,
            initial: 0xFFFF,
            input_reverse: InputReverse::None,
            output_reverse: false,
        }
    }
}

/// CRC calculation unit
pub trait CrcUnit {
    /// Reload the initial value
    fn reset(&mut self);

    /// Feed bytes, returning the running CRC
    fn feed_bytes(&mut self, data: &[u8]) -> u32;

    /// Feed 32-bit words, returning the running CRC
    ///
    /// Each word is processed most significant byte first.
    fn feed_words(&mut self, data: &[u32]) -> u32;
}

/// Bit-exact software model of the CRC peripheral
#[derive(Debug, Clone)]
pub struct SoftwareCrc {
    config: CrcConfig,
    crc: u32,
}

impl SoftwareCrc {
    /// Create a unit with the given configuration
    pub fn new(config: CrcConfig) -> Self {
        Self {
            config,
            crc: config.initial & config.size.mask(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &CrcConfig {
        &self.config
    }

    fn update_byte(&mut self, byte: u8) {
        let width = self.config.size.bits();
        let top = 1u32 << (width - 1);
        let mask = self.config.size.mask();

        self.crc ^= (byte as u32) << (width - 8);
        for _ in 0..8 {
            self.crc = if self.crc & top != 0 {
                (self.crc << 1) ^ self.config.polynomial
            } else {
                self.crc << 1
            };
            self.crc &= mask;
        }
    }

    fn output(&self) -> u32 {
        if self.config.output_reverse {
            self.crc.reverse_bits() >> (32 - self.config.size.bits())
        } else {
            self.crc
        }
    }
}

impl CrcUnit for SoftwareCrc {
    fn reset(&mut self) {
        self.crc = self.config.initial & self.config.size.mask();
    }

    fn feed_bytes(&mut self, data: &[u8]) -> u32 {
        for &byte in data {
            let byte = match self.config.input_reverse {
                InputReverse::None => byte,
                _ => byte.reverse_bits(),
            };
            self.update_byte(byte);
        }
        self.output()
    }

    fn feed_words(&mut self, data: &[u32]) -> u32 {
        for &word in data {
            let word = match self.config.input_reverse {
                InputReverse::None => word,
                InputReverse::Byte => u32::from_be_bytes(word.to_be_bytes().map(u8::reverse_bits)),
                InputReverse::HalfWord => {
                    let hi = ((word >> 16) as u16).reverse_bits() as u32;
                    let lo = (word as u16).reverse_bits() as u32;
                    (hi << 16) | lo
                }
                InputReverse::Word => word.reverse_bits(),
            };
            for byte in word.to_be_bytes() {
                self.update_byte(byte);
            }
        }
        self.output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECK: &[u8] = b"123456789";

    #[test]
    fn test_reset_config_is_mpeg2() {
        let mut crc = SoftwareCrc::new(CrcConfig::default());
        assert_eq!(crc.feed_bytes(CHECK), 0x0376_E6E7);
    }

    #[test]
    fn test_ieee_crc32() {
        let mut crc = SoftwareCrc::new(CrcConfig::crc32_ieee());
        assert_eq!(!crc.feed_bytes(CHECK), 0xCBF4_3926);
    }

    #[test]
    fn test_crc16_ccitt() {
        let mut crc = SoftwareCrc::new(CrcConfig::crc16_ccitt());
        assert_eq!(crc.feed_bytes(CHECK), 0x29B1);
    }

    #[test]
    fn test_crc8() {
        let mut crc = SoftwareCrc::new(CrcConfig {
            polynomial: 0x07,
            size: PolySize::Width8,
            initial: 0,
            input_reverse: InputReverse::None,
            output_reverse: false,
        });
        assert_eq!(crc.feed_bytes(CHECK), 0xF4);
    }

    #[test]
    fn test_words_match_big_endian_bytes() {
        let words = [0x1234_5678u32, 0x9ABC_DEF0];
        let mut by_word = SoftwareCrc::new(CrcConfig::default());
        let mut by_byte = SoftwareCrc::new(CrcConfig::default());

        let a = by_word.feed_words(&words);
        let b = by_byte.feed_bytes(&[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_reset_restarts_computation() {
        let mut crc = SoftwareCrc::new(CrcConfig::default());
        crc.feed_bytes(b"garbage");
        crc.reset();
        assert_eq!(crc.feed_bytes(CHECK), 0x0376_E6E7);
    }
}

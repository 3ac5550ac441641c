//! CRC peripheral for STM32L4

use embassy_stm32::crc::{Config, Crc, InputReverseConfig, PolySize as HwPolySize};
use embassy_stm32::peripherals::CRC;
use embassy_stm32::Peri;
use l4bsp_hal::crc::{CrcConfig, CrcUnit, InputReverse, PolySize};

/// The CRC unit rejects an even polynomial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidPolynomial;

fn hw_config(config: &CrcConfig) -> Result<Config, InvalidPolynomial> {
    let reverse_in = match config.input_reverse {
        InputReverse::None => InputReverseConfig::None,
        InputReverse::Byte => InputReverseConfig::Byte,
        InputReverse::HalfWord => InputReverseConfig::Halfword,
        InputReverse::Word => InputReverseConfig::Word,
    };
    let size = match config.size {
        PolySize::Width8 => HwPolySize::Width8,
        PolySize::Width16 => HwPolySize::Width16,
        PolySize::Width32 => HwPolySize::Width32,
    };
    Config::new(
        reverse_in,
        config.output_reverse,
        size,
        config.initial,
        config.polynomial,
    )
    .map_err(|_| InvalidPolynomial)
}

/// Hardware [`CrcUnit`]
pub struct L4Crc<'d> {
    crc: Crc<'d>,
    config: CrcConfig,
}

impl<'d> L4Crc<'d> {
    /// Take the CRC peripheral and program `config`
    pub fn new(peri: Peri<'d, CRC>, config: CrcConfig) -> Result<Self, InvalidPolynomial> {
        let crc = Crc::new(peri, hw_config(&config)?);
        Ok(Self { crc, config })
    }

    pub fn config(&self) -> &CrcConfig {
        &self.config
    }

    /// Switch to another polynomial or reversal mode
    pub fn reconfigure(&mut self, config: CrcConfig) -> Result<(), InvalidPolynomial> {
        self.crc.reconfigure(hw_config(&config)?);
        self.config = config;
        Ok(())
    }
}

impl CrcUnit for L4Crc<'_> {
    fn reset(&mut self) {
        self.crc.reset();
    }

    fn feed_bytes(&mut self, data: &[u8]) -> u32 {
        self.crc.feed_bytes(data)
    }

    fn feed_words(&mut self, data: &[u32]) -> u32 {
        self.crc.feed_words(data)
    }
}

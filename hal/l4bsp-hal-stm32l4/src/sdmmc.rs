//! SDMMC host for STM32L4+
//!
//! embassy-stm32's SDMMC driver is async; the [`SdHost`] trait is blocking,
//! so each call is driven to completion with `embassy_futures::block_on`.

use embassy_futures::block_on;
use embassy_stm32::sdmmc::{DataBlock, Error, Instance, Sdmmc};
use embassy_stm32::time::Hertz;
use l4bsp_hal::block::{CardInfo, CardState, CardType, SdError, SdHost, BLOCK_SIZE};

/// Transfer clock after identification
pub const SD_TRANSFER_FREQ: Hertz = Hertz(25_000_000);

/// Cards above 2GB are high capacity
const SDSC_MAX_BYTES: u64 = 2 * 1024 * 1024 * 1024;

impl From<Error> for SdError {
    fn from(e: Error) -> Self {
        match e {
            Error::Timeout | Error::SoftwareTimeout => SdError::Timeout,
            Error::Crc => SdError::Crc,
            Error::NoCard => SdError::NoCard,
            Error::RxOverFlow | Error::TxUnderErr => SdError::Overrun,
            Error::UnsupportedCardVersion | Error::UnsupportedCardType => SdError::Unsupported,
            _ => SdError::Other,
        }
    }
}

/// Blocking [`SdHost`] over the embassy SDMMC driver
pub struct L4SdHost<'d, T: Instance> {
    sdmmc: Sdmmc<'d, T>,
    frequency: Hertz,
    initialized: bool,
}

impl<'d, T: Instance> L4SdHost<'d, T> {
    pub fn new(sdmmc: Sdmmc<'d, T>) -> Self {
        Self {
            sdmmc,
            frequency: SD_TRANSFER_FREQ,
            initialized: false,
        }
    }

    /// Use a lower bus clock, e.g. for long cables on extension boards
    pub fn with_frequency(mut self, frequency: Hertz) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn release(self) -> Sdmmc<'d, T> {
        self.sdmmc
    }
}

impl<T: Instance> SdHost for L4SdHost<'_, T> {
    fn init_card(&mut self) -> Result<CardInfo, SdError> {
        self.initialized = false;
        block_on(self.sdmmc.init_sd_card(self.frequency))?;
        let card = self.sdmmc.card()?;

        let bytes = card.size();
        let blocks = (bytes / BLOCK_SIZE as u64) as u32;
        self.initialized = true;
        Ok(CardInfo {
            card_type: if bytes > SDSC_MAX_BYTES {
                CardType::SdhcSdxc
            } else {
                CardType::Sdsc
            },
            version: 2,
            class: 0,
            rel_card_addr: card.rca as u16,
            block_count: blocks,
            block_size: BLOCK_SIZE as u32,
            logical_block_count: blocks,
            logical_block_size: BLOCK_SIZE as u32,
        })
    }

    fn read_blocks(&mut self, lba: u32, buf: &mut [u8]) -> Result<(), SdError> {
        if buf.len() % BLOCK_SIZE != 0 {
            return Err(SdError::AddressOutOfRange);
        }
        let mut block = DataBlock([0; BLOCK_SIZE]);
        for (i, chunk) in buf.chunks_mut(BLOCK_SIZE).enumerate() {
            block_on(self.sdmmc.read_block(lba + i as u32, &mut block))?;
            chunk.copy_from_slice(&block.0);
        }
        Ok(())
    }

    fn write_blocks(&mut self, lba: u32, data: &[u8]) -> Result<(), SdError> {
        if data.len() % BLOCK_SIZE != 0 {
            return Err(SdError::AddressOutOfRange);
        }
        let mut block = DataBlock([0; BLOCK_SIZE]);
        for (i, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
            block.0.copy_from_slice(chunk);
            block_on(self.sdmmc.write_block(lba + i as u32, &block))?;
        }
        Ok(())
    }

    /// The driver has no erase command; blocks are overwritten with zeros
    fn erase(&mut self, start: u32, end: u32) -> Result<(), SdError> {
        let block = DataBlock([0; BLOCK_SIZE]);
        for lba in start..=end {
            block_on(self.sdmmc.write_block(lba, &block))?;
        }
        Ok(())
    }

    /// Writes complete before the driver returns, so an initialized card
    /// is always back in the transfer state
    fn card_state(&mut self) -> Result<CardState, SdError> {
        if self.initialized {
            Ok(CardState::Transfer)
        } else {
            Err(SdError::NoCard)
        }
    }
}

//! `embedded-sdmmc` block device over an [`SdCard`]

use core::cell::RefCell;

use embedded_sdmmc::{Block, BlockCount, BlockDevice, BlockIdx};
use l4bsp_core::BspError;
use l4bsp_hal::block::SdHost;

use super::card::{CardDetect, SdCard};

/// Shares an initialized card with a `VolumeManager`
///
/// `embedded-sdmmc` calls the block device through `&self`, so the card
/// sits in a `RefCell`.
pub struct SdBlockDevice<H, D> {
    card: RefCell<SdCard<H, D>>,
}

impl<H: SdHost, D: CardDetect> SdBlockDevice<H, D> {
    /// Wrap a card; `init` must have succeeded
    pub fn new(card: SdCard<H, D>) -> Self {
        Self {
            card: RefCell::new(card),
        }
    }

    /// Take the card back
    pub fn into_inner(self) -> SdCard<H, D> {
        self.card.into_inner()
    }
}

impl<H: SdHost, D: CardDetect> BlockDevice for SdBlockDevice<H, D> {
    type Error = BspError;

    fn read(&self, blocks: &mut [Block], start_block_idx: BlockIdx) -> Result<(), Self::Error> {
        let mut card = self.card.try_borrow_mut().map_err(|_| BspError::Busy)?;
        for (i, block) in blocks.iter_mut().enumerate() {
            card.read_blocks(start_block_idx.0 + i as u32, &mut block.contents)?;
        }
        Ok(())
    }

    fn write(&self, blocks: &[Block], start_block_idx: BlockIdx) -> Result<(), Self::Error> {
        let mut card = self.card.try_borrow_mut().map_err(|_| BspError::Busy)?;
        for (i, block) in blocks.iter().enumerate() {
            card.write_blocks(start_block_idx.0 + i as u32, &block.contents)?;
        }
        Ok(())
    }

    fn num_blocks(&self) -> Result<BlockCount, Self::Error> {
        let card = self.card.try_borrow().map_err(|_| BspError::Busy)?;
        Ok(BlockCount(card.card_info()?.logical_block_count))
    }
}

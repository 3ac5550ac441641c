//! Card presence, geometry checks and transfer-state polling

use l4bsp_core::{BspError, BspResult};
use l4bsp_hal::block::{CardInfo, CardState, SdHost, BLOCK_SIZE};
use l4bsp_hal::gpio::{InputPin, Signal};

/// Card state reads allowed while waiting for the transfer state
///
/// Each read is a CMD13 exchange, so this bounds the wait to roughly a
/// second on a 24 MHz bus.
pub const TRANSFER_POLL_LIMIT: u32 = 50_000;

/// Card detect switch
pub trait CardDetect {
    /// True when a card is inserted
    fn is_present(&mut self) -> bool;
}

impl<P: InputPin> CardDetect for Signal<P> {
    fn is_present(&mut self) -> bool {
        self.is_asserted()
    }
}

/// Detect through a closure, e.g. reading a pin on the IO expander
pub struct DetectFn<F>(pub F);

impl<F: FnMut() -> bool> CardDetect for DetectFn<F> {
    fn is_present(&mut self) -> bool {
        (self.0)()
    }
}

/// Slot without a detect switch: a card is assumed present
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDetect;

impl CardDetect for NoDetect {
    fn is_present(&mut self) -> bool {
        true
    }
}

/// SD card in a slot
pub struct SdCard<H, D> {
    host: H,
    detect: D,
    info: Option<CardInfo>,
    poll_limit: u32,
}

impl<H: SdHost, D: CardDetect> SdCard<H, D> {
    pub fn new(host: H, detect: D) -> Self {
        Self {
            host,
            detect,
            info: None,
            poll_limit: TRANSFER_POLL_LIMIT,
        }
    }

    /// Change the transfer-state polling bound
    pub fn with_poll_limit(mut self, limit: u32) -> Self {
        self.poll_limit = limit;
        self
    }

    /// Identify and initialize the card
    pub fn init(&mut self) -> BspResult<CardInfo> {
        self.info = None;
        if !self.detect.is_present() {
            return Err(BspError::NotPresent);
        }
        let info = self.host.init_card()?;
        self.info = Some(info);
        Ok(info)
    }

    /// Card detect switch state
    pub fn is_detected(&mut self) -> bool {
        self.detect.is_present()
    }

    /// Geometry of the initialized card
    pub fn card_info(&self) -> BspResult<CardInfo> {
        self.info.ok_or(BspError::NotPresent)
    }

    /// Current card state (CMD13)
    pub fn card_state(&mut self) -> BspResult<CardState> {
        Ok(self.host.card_state()?)
    }

    /// Wait until the card is back in the transfer state
    pub fn wait_ready(&mut self) -> BspResult<()> {
        for _ in 0..self.poll_limit {
            match self.host.card_state()? {
                CardState::Transfer => return Ok(()),
                CardState::Error | CardState::Disconnected => return Err(BspError::Error),
                _ => {}
            }
        }
        Err(BspError::Timeout)
    }

    /// Check the card is still there and the block range fits
    fn check_access(&mut self, lba: u32, blocks: u32) -> BspResult<()> {
        if !self.detect.is_present() {
            self.info = None;
            return Err(BspError::NotPresent);
        }
        let info = self.card_info()?;
        let end = lba.checked_add(blocks).ok_or(BspError::InvalidParameter)?;
        if end > info.logical_block_count {
            return Err(BspError::InvalidParameter);
        }
        Ok(())
    }

    fn block_count(len: usize) -> BspResult<u32> {
        if len == 0 || len % BLOCK_SIZE != 0 {
            return Err(BspError::InvalidParameter);
        }
        Ok((len / BLOCK_SIZE) as u32)
    }

    /// Read whole blocks starting at `lba`
    pub fn read_blocks(&mut self, lba: u32, buf: &mut [u8]) -> BspResult<()> {
        let blocks = Self::block_count(buf.len())?;
        self.check_access(lba, blocks)?;
        self.host.read_blocks(lba, buf)?;
        self.wait_ready()
    }

    /// Write whole blocks starting at `lba`
    pub fn write_blocks(&mut self, lba: u32, data: &[u8]) -> BspResult<()> {
        let blocks = Self::block_count(data.len())?;
        self.check_access(lba, blocks)?;
        self.host.write_blocks(lba, data)?;
        self.wait_ready()
    }

    /// Erase blocks `start..=end`
    pub fn erase(&mut self, start: u32, end: u32) -> BspResult<()> {
        if end < start {
            return Err(BspError::InvalidParameter);
        }
        self.check_access(start, end - start + 1)?;
        self.host.erase(start, end)?;
        self.wait_ready()
    }

    /// Release the host and detect input
    pub fn release(self) -> (H, D) {
        (self.host, self.detect)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use l4bsp_hal::block::SdError;

    /// In-memory card that reports `busy_polls` non-transfer states after
    /// every data command
    pub(crate) struct MockHost {
        pub blocks: std::vec::Vec<[u8; BLOCK_SIZE]>,
        pub busy_polls: u32,
        pub busy: u32,
        pub stuck: Option<CardState>,
    }

    impl MockHost {
        pub(crate) fn new(blocks: usize) -> Self {
            Self {
                blocks: std::vec![[0u8; BLOCK_SIZE]; blocks],
                busy_polls: 2,
                busy: 0,
                stuck: None,
            }
        }
    }

    impl SdHost for MockHost {
        fn init_card(&mut self) -> Result<CardInfo, SdError> {
            Ok(CardInfo {
                card_type: l4bsp_hal::block::CardType::SdhcSdxc,
                block_count: self.blocks.len() as u32,
                block_size: BLOCK_SIZE as u32,
                logical_block_count: self.blocks.len() as u32,
                logical_block_size: BLOCK_SIZE as u32,
                ..Default::default()
            })
        }

        fn read_blocks(&mut self, lba: u32, buf: &mut [u8]) -> Result<(), SdError> {
            for (i, chunk) in buf.chunks_mut(BLOCK_SIZE).enumerate() {
                chunk.copy_from_slice(&self.blocks[lba as usize + i]);
            }
            self.busy = self.busy_polls;
            Ok(())
        }

        fn write_blocks(&mut self, lba: u32, data: &[u8]) -> Result<(), SdError> {
            for (i, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
                self.blocks[lba as usize + i].copy_from_slice(chunk);
            }
            self.busy = self.busy_polls;
            Ok(())
        }

        fn erase(&mut self, start: u32, end: u32) -> Result<(), SdError> {
            for block in &mut self.blocks[start as usize..=end as usize] {
                block.fill(0xFF);
            }
            self.busy = self.busy_polls;
            Ok(())
        }

        fn card_state(&mut self) -> Result<CardState, SdError> {
            if let Some(state) = self.stuck {
                return Ok(state);
            }
            if self.busy > 0 {
                self.busy -= 1;
                return Ok(CardState::Programming);
            }
            Ok(CardState::Transfer)
        }
    }

    #[test]
    fn test_no_card_is_not_present() {
        let mut card = SdCard::new(MockHost::new(8), DetectFn(|| false));
        assert_eq!(card.init(), Err(BspError::NotPresent));
        assert_eq!(card.card_info(), Err(BspError::NotPresent));
    }

    #[test]
    fn test_read_write_roundtrip() {
        let mut card = SdCard::new(MockHost::new(8), NoDetect);
        let info = card.init().unwrap();
        assert_eq!(info.capacity_bytes(), 8 * 512);

        let data = [0x5Au8; 2 * BLOCK_SIZE];
        card.write_blocks(3, &data).unwrap();
        let mut buf = [0u8; 2 * BLOCK_SIZE];
        card.read_blocks(3, &mut buf).unwrap();
        assert_eq!(buf, data);
    }

    #[test]
    fn test_range_and_size_checks() {
        let mut card = SdCard::new(MockHost::new(8), NoDetect);
        card.init().unwrap();

        let mut buf = [0u8; BLOCK_SIZE];
        assert_eq!(card.read_blocks(8, &mut buf), Err(BspError::InvalidParameter));
        assert_eq!(card.read_blocks(0, &mut buf[..100]), Err(BspError::InvalidParameter));
        assert_eq!(card.erase(5, 4), Err(BspError::InvalidParameter));
        assert_eq!(card.erase(6, 8), Err(BspError::InvalidParameter));
    }

    #[test]
    fn test_erase_waits_for_transfer_state() {
        let mut host = MockHost::new(8);
        host.busy_polls = 10;
        let mut card = SdCard::new(host, NoDetect).with_poll_limit(11);
        card.init().unwrap();
        card.erase(1, 2).unwrap();

        let (host, _) = card.release();
        assert_eq!(host.busy, 0);
        assert_eq!(host.blocks[1], [0xFF; BLOCK_SIZE]);
        assert_eq!(host.blocks[3], [0x00; BLOCK_SIZE]);
    }

    #[test]
    fn test_state_polling_is_bounded() {
        let mut host = MockHost::new(8);
        host.stuck = Some(CardState::Programming);
        let mut card = SdCard::new(host, NoDetect).with_poll_limit(5);
        card.init().unwrap();
        assert_eq!(card.write_blocks(0, &[0u8; BLOCK_SIZE]), Err(BspError::Timeout));
    }

    #[test]
    fn test_card_removed_after_init() {
        let mut present = true;
        let mut card = SdCard::new(
            MockHost::new(8),
            DetectFn(move || {
                let now = present;
                present = false;
                now
            }),
        );
        card.init().unwrap();
        let mut buf = [0u8; BLOCK_SIZE];
        assert_eq!(card.read_blocks(0, &mut buf), Err(BspError::NotPresent));
        assert_eq!(card.card_info(), Err(BspError::NotPresent));
    }
}

//! SD/MMC host abstraction
//!
//! The SDMMC peripheral runs the card protocol (CMD/ACMD sequencing, CRC,
//! data path). The board layer only needs the operations below.

/// SD block size in bytes
pub const BLOCK_SIZE: usize = 512;

/// Card type reported after identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardType {
    /// Standard capacity (byte addressed)
    #[default]
    Sdsc,
    /// High/extended capacity (block addressed)
    SdhcSdxc,
    /// Secure card
    Secured,
}

/// Card information, filled in by the host after initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CardInfo {
    /// Card type
    pub card_type: CardType,
    /// Card specification version (1 or 2)
    pub version: u8,
    /// Card command classes from the CSD
    pub class: u16,
    /// Relative card address
    pub rel_card_addr: u16,
    /// Number of physical blocks
    pub block_count: u32,
    /// Physical block size in bytes
    pub block_size: u32,
    /// Number of logical blocks
    pub logical_block_count: u32,
    /// Logical block size in bytes
    pub logical_block_size: u32,
}

impl CardInfo {
    /// Capacity in bytes
    pub fn capacity_bytes(&self) -> u64 {
        self.logical_block_count as u64 * self.logical_block_size as u64
    }
}

/// Card state machine as reported by CMD13 (SEND_STATUS)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardState {
    Ready,
    Identification,
    Standby,
    Transfer,
    Sending,
    Receiving,
    Programming,
    Disconnected,
    Error,
}

impl CardState {
    /// Decode the CURRENT_STATE field (bits 12:9) of the card status
    pub fn from_status(status: u32) -> Self {
        match (status >> 9) & 0x0F {
            1 => CardState::Ready,
            2 => CardState::Identification,
            3 => CardState::Standby,
            4 => CardState::Transfer,
            5 => CardState::Sending,
            6 => CardState::Receiving,
            7 => CardState::Programming,
            8 => CardState::Disconnected,
            _ => CardState::Error,
        }
    }
}

/// Errors reported by the SDMMC host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SdError {
    /// Command or data timeout
    Timeout,
    /// CRC failure on command response or data
    Crc,
    /// Card rejected the address
    AddressOutOfRange,
    /// FIFO underrun/overrun
    Overrun,
    /// Card did not respond to identification
    NoCard,
    /// Operation not supported by the card
    Unsupported,
    /// Any other host error
    Other,
}

/// SDMMC host
pub trait SdHost {
    /// Power up and identify the card, returning its information
    fn init_card(&mut self) -> Result<CardInfo, SdError>;

    /// Read whole blocks starting at logical block `lba`
    ///
    /// `buf.len()` must be a multiple of [`BLOCK_SIZE`].
    fn read_blocks(&mut self, lba: u32, buf: &mut [u8]) -> Result<(), SdError>;

    /// Write whole blocks starting at logical block `lba`
    fn write_blocks(&mut self, lba: u32, data: &[u8]) -> Result<(), SdError>;

    /// Erase the inclusive block range `start..=end`
    fn erase(&mut self, start: u32, end: u32) -> Result<(), SdError>;

    /// Query the card state
    fn card_state(&mut self) -> Result<CardState, SdError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_state_decoding() {
        assert_eq!(CardState::from_status(4 << 9), CardState::Transfer);
        assert_eq!(CardState::from_status((7 << 9) | 0x100), CardState::Programming);
        assert_eq!(CardState::from_status(0x0F << 9), CardState::Error);
    }

    #[test]
    fn test_capacity() {
        let info = CardInfo {
            logical_block_count: 2048,
            logical_block_size: 512,
            ..Default::default()
        };
        assert_eq!(info.capacity_bytes(), 1024 * 1024);
    }
}

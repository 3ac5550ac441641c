//! Board driver status codes

use l4bsp_hal::block::SdError;
use l4bsp_hal::flash::FlashError;
use l4bsp_hal::memory::MemoryError;
use l4bsp_hal::octospi::OspiError;
use l4bsp_hal::pka::PkaError;
use l4bsp_hal::rng::RngError;

/// Status returned by board-level operations
///
/// `Ok(())` plays the role of the classic `BSP_OK`; the first three
/// variants are the classic ERROR/BUSY/NOT_PRESENT codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BspError {
    /// Generic failure
    Error,
    /// Device or peripheral busy
    Busy,
    /// Device not present (no card inserted, wrong chip id)
    NotPresent,
    /// Device did not answer in time
    Timeout,
    /// Argument out of range
    InvalidParameter,
    /// Operation not supported by this device
    NotSupported,
    /// Bus-level failure (I2C NACK, arbitration lost, ...)
    Bus,
}

/// Result alias for board operations
pub type BspResult<T> = Result<T, BspError>;

impl From<FlashError> for BspError {
    fn from(e: FlashError) -> Self {
        match e {
            FlashError::OutOfBounds | FlashError::BufferTooSmall => BspError::InvalidParameter,
            FlashError::NotFound => BspError::NotPresent,
            _ => BspError::Error,
        }
    }
}

impl From<SdError> for BspError {
    fn from(e: SdError) -> Self {
        match e {
            SdError::Timeout => BspError::Timeout,
            SdError::NoCard => BspError::NotPresent,
            SdError::AddressOutOfRange => BspError::InvalidParameter,
            SdError::Unsupported => BspError::NotSupported,
            _ => BspError::Error,
        }
    }
}

impl From<MemoryError> for BspError {
    fn from(e: MemoryError) -> Self {
        match e {
            MemoryError::OutOfBounds | MemoryError::Misaligned => BspError::InvalidParameter,
        }
    }
}

impl From<OspiError> for BspError {
    fn from(e: OspiError) -> Self {
        match e {
            OspiError::Timeout => BspError::Timeout,
            OspiError::InvalidCommand => BspError::InvalidParameter,
            OspiError::Transfer => BspError::Error,
        }
    }
}

impl From<RngError> for BspError {
    fn from(e: RngError) -> Self {
        match e {
            RngError::Timeout => BspError::Timeout,
            RngError::SeedError | RngError::ClockError => BspError::Error,
        }
    }
}

impl From<PkaError> for BspError {
    fn from(e: PkaError) -> Self {
        match e {
            PkaError::InvalidOperand => BspError::InvalidParameter,
            PkaError::Busy => BspError::Busy,
            PkaError::Unsupported => BspError::NotSupported,
            _ => BspError::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_card_maps_to_not_present() {
        assert_eq!(BspError::from(SdError::NoCard), BspError::NotPresent);
    }

    #[test]
    fn test_busy_pka_maps_to_busy() {
        assert_eq!(BspError::from(PkaError::Busy), BspError::Busy);
    }
}

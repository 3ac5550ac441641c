//! SD card
//!
//! [`SdCard`] adds presence detection, range checks and the wait for the
//! card to return to the transfer state on top of an [`SdHost`]. FAT
//! volumes are opened through `embedded-sdmmc` with [`SdBlockDevice`].
//!
//! [`SdHost`]: l4bsp_hal::block::SdHost

pub mod block_device;
pub mod card;
pub mod fat;

pub use block_device::SdBlockDevice;
pub use card::{CardDetect, DetectFn, NoDetect, SdCard};

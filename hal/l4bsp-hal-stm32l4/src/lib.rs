//! STM32L4-specific HAL for the l4bsp board support package
//!
//! This crate binds the `l4bsp-hal` traits to embassy-stm32 peripherals on
//! STM32L4 and STM32L4+ parts:
//!
//! - STM32L4R9AI (L4R9I-EVAL, L4R9I-DISCO)
//! - STM32L496AG (L496G-DISCO)
//!
//! # Features
//!
//! - `stm32l4r9ai` / `stm32l4r9zi` / `stm32l496ag` - Chip selection
//! - `defmt` - Enable debug formatting support
//!
//! # Usage
//!
//! Peripherals are created with embassy-stm32 in the firmware and wrapped
//! here, so the board drivers only see the traits:
//!
//! ```ignore
//! let p = embassy_stm32::init(config);
//! let i2c = I2c::new_blocking(p.I2C1, p.PG14, p.PG13, i2c_config);
//! let eeprom = M24lr64::new(EhI2c::new(i2c), BoardConfig::L4R9I_EVAL.i2c.eeprom);
//! ```

#![no_std]

pub mod crc;
pub mod flash;
pub mod gpio;
pub mod i2c;
pub mod memory;
pub mod ospi;
pub mod rng;
pub mod sdmmc;

// Re-export shared types from l4bsp-hal
pub use l4bsp_hal::flash::StorageKey;

pub use crc::L4Crc;
pub use flash::{L4FlashStorage, L4PageFlash};
pub use gpio::{L4Input, L4Output};
pub use i2c::EhI2c;
pub use memory::FmcMemory;
pub use ospi::L4Ospi;
pub use rng::L4Rng;
pub use sdmmc::L4SdHost;

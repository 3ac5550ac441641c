//! l4bsp Hardware Abstraction Layer
//!
//! This crate defines the peripheral traits the board drivers are written
//! against. The STM32L4 binding lives in `l4bsp-hal-stm32l4`; host tests use
//! mocks of the same traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  l4bsp-firmware / l4bsp-drivers         │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  l4bsp-hal (this crate - traits)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  l4bsp-hal-stm32l4 (embassy-stm32)      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`] - Digital I/O
//! - [`i2c::I2cBus`] - I2C bus operations
//! - [`flash::FlashStorage`] - Key-value config storage
//! - [`flash::PageFlash`] - Raw page-granular internal flash
//! - [`block::SdHost`] - SDMMC host
//! - [`octospi::OctoSpiBus`] - OctoSPI command interface
//! - [`memory::MemoryBus`] - Memory-mapped external SRAM/PSRAM
//! - [`crc::CrcUnit`], [`rng::RandomSource`], [`pka::PkaEngine`] - Crypto blocks

#![no_std]
#![deny(unsafe_code)]

pub mod block;
pub mod crc;
pub mod flash;
pub mod gpio;
pub mod i2c;
pub mod memory;
pub mod octospi;
pub mod pka;
pub mod rng;

// Re-export key traits at crate root for convenience
pub use block::SdHost;
pub use crc::CrcUnit;
pub use flash::{FlashStorage, PageFlash, StorageKey};
pub use gpio::{InputPin, OutputPin};
pub use i2c::I2cBus;
pub use memory::MemoryBus;
pub use octospi::OctoSpiBus;
pub use pka::PkaEngine;
pub use rng::RandomSource;

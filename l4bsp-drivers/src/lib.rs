//! On-board device drivers
//!
//! This crate provides concrete implementations of the traits defined
//! in l4bsp-core and l4bsp-hal for the devices fitted to the evaluation
//! boards:
//!
//! - EEPROM (M24LR64 dual-interface NFC EEPROM)
//! - IO expander and supply current measurement (MFXSTM32L152)
//! - Capacitive touch controller (FT3X67) and the touchscreen layer
//! - SD card and FAT volumes
//! - OctoSPI NOR flash (MX25LM51245G) and PSRAM (APS6408)
//! - FMC SRAM
//! - Internal flash page rewrite
//! - CRC, RNG and PKA glue
//! - NDEF message storage on the NFC EEPROM

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod crypto;
pub mod eeprom;
pub mod flash_page;
pub mod io;
pub mod irq;
pub mod nfc_tag;
pub mod ospi;
pub mod sd;
pub mod sram;
pub mod touch;

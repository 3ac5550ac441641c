//! Board-level types shared by the l4bsp drivers and firmware
//!
//! - [`status::BspError`] - the status codes every board driver reports
//! - [`traits`] - interfaces of the on-board devices (touch, IO expander, EEPROM)
//! - [`config`] - board description and persisted calibration records

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod status;
pub mod traits;

pub use status::{BspError, BspResult};

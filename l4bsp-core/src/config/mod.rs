//! Configuration types
//!
//! Board description (normally generated from `board.toml` at build time)
//! and records persisted to flash with postcard.

pub mod board;
pub mod calibration;

pub use board::*;
pub use calibration::*;

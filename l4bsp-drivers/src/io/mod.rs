//! IO expander and supply current (IDD) measurement
//!
//! The evaluation boards route slow signals (SD detect, LED, audio and
//! camera resets) through an MFX companion MCU, which also measures the
//! main MCU supply current through a bank of shunt resistors.

pub mod idd;
pub mod mfx;

pub use idd::{IddConfig, IddError, IddErrorSource};
pub use mfx::{Mfx, MfxError};

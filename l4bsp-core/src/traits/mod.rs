//! On-board device interfaces
//!
//! These traits sit between the board-level layers (touchscreen, NFC tag,
//! IDD measurement) and the chip drivers that implement them.

pub mod eeprom;
pub mod io_expander;
pub mod touch;

pub use eeprom::Eeprom;
pub use io_expander::{IoExpander, PinMask};
pub use touch::{Gesture, TouchController, TouchEvent, TouchPoint};

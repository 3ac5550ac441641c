//! I2C EEPROM drivers

pub mod m24lr64;

pub use m24lr64::{EepromError, M24lr64};

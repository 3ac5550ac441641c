//! I2C bus adapter for STM32L4
//!
//! The board drivers talk to the EEPROMs, the MFX and the touch controller
//! through [`I2cBus`]. [`EhI2c`] adapts any blocking `embedded-hal` I2C
//! master to it, which covers `embassy_stm32::i2c::I2c` in blocking mode.

use embassy_stm32::i2c::Error as I2cError;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c, NoAcknowledgeSource};
use l4bsp_hal::i2c::I2cBus;

pub use l4bsp_hal::i2c::I2cConfig;

/// Error from I2C operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cBusError {
    /// Bus error
    Bus,
    /// Arbitration lost
    ArbitrationLost,
    /// NACK received
    Nack,
    /// Timeout
    Timeout,
    /// Overrun
    Overrun,
    /// Other error
    Other,
}

impl From<I2cError> for I2cBusError {
    fn from(e: I2cError) -> Self {
        match e {
            I2cError::Bus => I2cBusError::Bus,
            I2cError::Arbitration => I2cBusError::ArbitrationLost,
            I2cError::Nack => I2cBusError::Nack,
            I2cError::Timeout => I2cBusError::Timeout,
            I2cError::Overrun => I2cBusError::Overrun,
            _ => I2cBusError::Other,
        }
    }
}

impl From<ErrorKind> for I2cBusError {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Bus => I2cBusError::Bus,
            ErrorKind::ArbitrationLoss => I2cBusError::ArbitrationLost,
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
            | ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
            | ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown) => I2cBusError::Nack,
            ErrorKind::Overrun => I2cBusError::Overrun,
            _ => I2cBusError::Other,
        }
    }
}

/// [`I2cBus`] over a blocking `embedded-hal` I2C master
pub struct EhI2c<T> {
    bus: T,
}

impl<T: I2c> EhI2c<T> {
    pub fn new(bus: T) -> Self {
        Self { bus }
    }

    pub fn release(self) -> T {
        self.bus
    }
}

impl<T: I2c> I2cBus for EhI2c<T> {
    type Error = I2cBusError;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), I2cBusError> {
        self.bus.write(address, data).map_err(|e| e.kind().into())
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), I2cBusError> {
        self.bus.read(address, buf).map_err(|e| e.kind().into())
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), I2cBusError> {
        self.bus
            .write_read(address, write_data, read_buf)
            .map_err(|e| e.kind().into())
    }
}

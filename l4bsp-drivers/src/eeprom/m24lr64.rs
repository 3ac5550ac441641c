//! M24LR64 dual-interface EEPROM
//!
//! 64 Kbit EEPROM readable over I2C and over ISO 15693 RF (NFC Type 5).
//! The I2C side exposes two areas behind different device select codes:
//! - user memory, 8 KiB, 16-bit addresses
//! - system area (E2 = 1): passwords, sector security, UID
//!
//! Writes are programmed in 4-byte pages. While a page is being programmed
//! the device does not acknowledge its address, so completion is detected
//! by polling for an ACK.

use l4bsp_core::traits::Eeprom;
use l4bsp_core::BspError;
use l4bsp_hal::i2c::{I2cBus, I2cMemExt, MemAddressSize};

/// User memory size in bytes
pub const M24LR64_SIZE: usize = 8 * 1024;

/// Page write buffer size
pub const PAGE_SIZE: usize = 4;

/// ACK polling attempts before giving up on a page write
pub const MAX_TRIALS: u32 = 300;

/// Offset of the system-area select bit in the 7-bit device address
pub const SYSTEM_AREA_BIT: u8 = 0x04;

/// System area registers
pub mod sys {
    /// I2C password (4 bytes)
    pub const I2C_PASSWORD: u16 = 0x0900;
    /// RF sector security status, one byte per sector
    pub const SECTOR_SECURITY: u16 = 0x0000;
    /// 64-bit unique identifier, LSB first
    pub const UID: u16 = 0x0914;
    /// DSFID / AFI / IC reference block
    pub const IC_REF: u16 = 0x091C;
}

/// EEPROM errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EepromError<E> {
    /// Bus transaction failed
    Bus(E),
    /// Access past the end of memory
    OutOfRange,
    /// Device still busy after all ACK polling attempts
    Timeout,
}

impl<E> From<EepromError<E>> for BspError {
    fn from(e: EepromError<E>) -> Self {
        match e {
            EepromError::Bus(_) => BspError::Bus,
            EepromError::OutOfRange => BspError::InvalidParameter,
            EepromError::Timeout => BspError::Timeout,
        }
    }
}

/// M24LR64 on an I2C bus
pub struct M24lr64<B> {
    bus: B,
    address: u8,
    system_address: u8,
    max_trials: u32,
}

impl<B: I2cBus> M24lr64<B> {
    /// Create a driver for the device at `address` (user memory select code)
    pub fn new(bus: B, address: u8) -> Self {
        Self {
            bus,
            address,
            system_address: address | SYSTEM_AREA_BIT,
            max_trials: MAX_TRIALS,
        }
    }

    /// Override the system-area address when it is not `address | 0x04`
    pub fn with_system_address(mut self, address: u8) -> Self {
        self.system_address = address;
        self
    }

    /// Release the bus
    pub fn release(self) -> B {
        self.bus
    }

    /// Check the device acknowledges its address
    pub fn is_ready(&mut self) -> bool {
        let mut byte = [0u8; 1];
        self.bus.read(self.address, &mut byte).is_ok()
    }

    /// Poll until the device acknowledges again after a write
    fn wait_ready(&mut self, address: u8) -> Result<(), EepromError<B::Error>> {
        let mut byte = [0u8; 1];
        for _ in 0..self.max_trials {
            if self.bus.read(address, &mut byte).is_ok() {
                return Ok(());
            }
        }
        Err(EepromError::Timeout)
    }

    fn check_range(offset: u16, len: usize) -> Result<(), EepromError<B::Error>> {
        if offset as usize + len > M24LR64_SIZE {
            return Err(EepromError::OutOfRange);
        }
        Ok(())
    }

    fn read_area(
        &mut self,
        address: u8,
        offset: u16,
        buf: &mut [u8],
    ) -> Result<(), EepromError<B::Error>> {
        if buf.is_empty() {
            return Ok(());
        }
        self.bus
            .mem_read(address, offset, MemAddressSize::Bits16, buf)
            .map_err(EepromError::Bus)
    }

    /// Write page by page, polling for completion after each page
    fn write_area(
        &mut self,
        address: u8,
        offset: u16,
        data: &[u8],
    ) -> Result<(), EepromError<B::Error>> {
        let mut addr = offset as usize;
        let mut remaining = data;
        while !remaining.is_empty() {
            let room = PAGE_SIZE - addr % PAGE_SIZE;
            let (chunk, rest) = remaining.split_at(room.min(remaining.len()));
            self.bus
                .mem_write(address, addr as u16, MemAddressSize::Bits16, chunk)
                .map_err(EepromError::Bus)?;
            self.wait_ready(address)?;
            addr += chunk.len();
            remaining = rest;
        }
        Ok(())
    }

    /// Read user memory
    pub fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), EepromError<B::Error>> {
        Self::check_range(offset, buf.len())?;
        self.read_area(self.address, offset, buf)
    }

    /// Write user memory
    pub fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), EepromError<B::Error>> {
        Self::check_range(offset, data.len())?;
        self.write_area(self.address, offset, data)
    }

    /// Read the system area
    pub fn read_system(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), EepromError<B::Error>> {
        self.read_area(self.system_address, offset, buf)
    }

    /// Write the system area
    pub fn write_system(&mut self, offset: u16, data: &[u8]) -> Result<(), EepromError<B::Error>> {
        self.write_area(self.system_address, offset, data)
    }

    /// Read the 64-bit unique identifier
    pub fn uid(&mut self) -> Result<u64, EepromError<B::Error>> {
        let mut raw = [0u8; 8];
        self.read_system(sys::UID, &mut raw)?;
        Ok(u64::from_le_bytes(raw))
    }
}

impl<B: I2cBus> Eeprom for M24lr64<B> {
    type Error = EepromError<B::Error>;

    fn capacity(&self) -> usize {
        M24LR64_SIZE
    }

    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), Self::Error> {
        M24lr64::read(self, offset, buf)
    }

    fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), Self::Error> {
        M24lr64::write(self, offset, data)
    }
}

//! I2C bus abstractions
//!
//! Provides the I2C master operations used by the on-board I2C devices
//! (EEPROM, IO expander, touch controller).

/// I2C bus master
pub trait I2cBus {
    /// Error type for I2C operations
    type Error;

    /// Write data to a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `data` - Bytes to write
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Read data from a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `buf` - Buffer to read into
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write then read in a single transaction (repeated start)
    ///
    /// This is commonly used to write a register address then read data.
    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error>;
}

/// Width of the memory/register address sent before the data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MemAddressSize {
    /// One address byte (register-mapped devices)
    Bits8,
    /// Two address bytes, big-endian (EEPROMs)
    Bits16,
}

/// Maximum bytes written in one memory write transaction
pub const MAX_MEM_WRITE: usize = 64;

/// Memory-style register access on top of [`I2cBus`]
///
/// Equivalent of the `Mem_Read`/`Mem_Write` helpers: the register or memory
/// address is sent first, followed by the data.
pub trait I2cMemExt: I2cBus {
    /// Read `buf.len()` bytes starting at `mem_address`
    fn mem_read(
        &mut self,
        address: u8,
        mem_address: u16,
        size: MemAddressSize,
        buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        let hdr = mem_header(mem_address, size);
        self.write_read(address, &hdr.0[..hdr.1], buf)
    }

    /// Write `data` starting at `mem_address`
    ///
    /// `data` longer than [`MAX_MEM_WRITE`] is truncated; callers split
    /// larger writes on device page boundaries anyway.
    fn mem_write(
        &mut self,
        address: u8,
        mem_address: u16,
        size: MemAddressSize,
        data: &[u8],
    ) -> Result<(), Self::Error> {
        let (hdr, hdr_len) = mem_header(mem_address, size);
        let len = data.len().min(MAX_MEM_WRITE);

        let mut frame = [0u8; MAX_MEM_WRITE + 2];
        frame[..hdr_len].copy_from_slice(&hdr[..hdr_len]);
        frame[hdr_len..hdr_len + len].copy_from_slice(&data[..len]);
        self.write(address, &frame[..hdr_len + len])
    }

    /// Read a single 8-bit register
    fn read_reg(&mut self, address: u8, reg: u8) -> Result<u8, Self::Error> {
        let mut buf = [0u8; 1];
        self.write_read(address, &[reg], &mut buf)?;
        Ok(buf[0])
    }

    /// Write a single 8-bit register
    fn write_reg(&mut self, address: u8, reg: u8, value: u8) -> Result<(), Self::Error> {
        self.write(address, &[reg, value])
    }
}

impl<T: I2cBus> I2cMemExt for T {}

fn mem_header(mem_address: u16, size: MemAddressSize) -> ([u8; 2], usize) {
    match size {
        MemAddressSize::Bits8 => ([mem_address as u8, 0], 1),
        MemAddressSize::Bits16 => (mem_address.to_be_bytes(), 2),
    }
}

/// I2C configuration
#[derive(Debug, Clone, Copy)]
pub struct I2cConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            frequency: 100_000, // 100kHz standard mode
        }
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self { frequency: 100_000 };

    /// Fast mode (400 kHz)
    pub const FAST: Self = Self { frequency: 400_000 };

    /// Fast mode plus (1 MHz)
    pub const FAST_PLUS: Self = Self {
        frequency: 1_000_000,
    };
}

//! APS6408 64 Mbit octal DDR PSRAM
//!
//! All phases run on eight lines at double rate. Mode register 0 holds the
//! read latency code, mode register 4 the write latency code:
//!
//! ```text
//! MR0: [5] fixed latency  [4:2] read latency code  [1:0] drive strength
//! MR4: [7:5] write latency code
//! ```

use l4bsp_core::BspError;
use l4bsp_hal::octospi::{Command, FieldSize, Lines, OctoSpiBus, OspiError, Transfer};

/// APS6408 opcodes
pub mod cmd {
    pub const SYNC_READ: u8 = 0x00;
    pub const SYNC_WRITE: u8 = 0x80;
    pub const READ_REGISTER: u8 = 0x40;
    pub const WRITE_REGISTER: u8 = 0xC0;
}

/// Capacity in bytes
pub const PSRAM_SIZE: u32 = 8 * 1024 * 1024;
/// Row size; a burst must not cross a row
pub const ROW_SIZE: u32 = 1024;

pub const MR0: u32 = 0x00;
pub const MR4: u32 = 0x04;

const MR0_LATENCY_SHIFT: u8 = 2;
const MR0_LATENCY_MASK: u8 = 0x07 << MR0_LATENCY_SHIFT;
const MR0_FIXED_LATENCY: u8 = 0x20;
const MR4_LATENCY_SHIFT: u8 = 5;
const MR4_LATENCY_MASK: u8 = 0x07 << MR4_LATENCY_SHIFT;

/// Latency at power-up
pub const DEFAULT_LATENCY: u8 = 5;

/// PSRAM errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PsramError {
    Ospi(OspiError),
    /// Range outside the device
    OutOfRange,
    /// Odd address or length
    Misaligned,
    /// Latency outside 3..=7 clocks
    InvalidLatency,
}

impl From<OspiError> for PsramError {
    fn from(e: OspiError) -> Self {
        PsramError::Ospi(e)
    }
}

impl From<PsramError> for BspError {
    fn from(e: PsramError) -> Self {
        match e {
            PsramError::Ospi(e) => e.into(),
            _ => BspError::InvalidParameter,
        }
    }
}

/// MR0 read latency code for 3..=7 clocks
fn read_latency_code(latency: u8) -> Option<u8> {
    match latency {
        3..=7 => Some(latency - 3),
        _ => None,
    }
}

/// MR4 write latency code for 3..=7 clocks
fn write_latency_code(latency: u8) -> Option<u8> {
    match latency {
        3 => Some(0b000),
        4 => Some(0b100),
        5 => Some(0b010),
        6 => Some(0b110),
        7 => Some(0b001),
        _ => None,
    }
}

/// APS6408 driver
pub struct Aps6408<B> {
    bus: B,
    latency: u8,
}

impl<B: OctoSpiBus> Aps6408<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            latency: DEFAULT_LATENCY,
        }
    }

    /// Release the bus
    pub fn release(self) -> B {
        self.bus
    }

    /// Configured latency in clocks
    pub fn latency(&self) -> u8 {
        self.latency
    }

    fn command(&self, opcode: u8, address: u32, dummy_cycles: u8, read: bool) -> Command {
        Command {
            instruction_lines: Lines::Octal,
            instruction_size: FieldSize::Bits8,
            instruction: opcode as u32,
            instruction_dtr: true,
            address_lines: Lines::Octal,
            address_size: FieldSize::Bits32,
            address,
            address_dtr: true,
            dummy_cycles,
            data_lines: Lines::Octal,
            data_dtr: true,
            dqs: read,
        }
    }

    // Fixed latency doubles the read wait
    fn read_dummy(&self) -> u8 {
        2 * self.latency
    }

    fn write_dummy(&self) -> u8 {
        self.latency
    }

    /// Read a mode register
    ///
    /// The register is returned twice in DDR; the first byte is kept.
    pub fn read_register(&mut self, address: u32) -> Result<u8, PsramError> {
        let command = self.command(cmd::READ_REGISTER, address, self.read_dummy(), true);
        let mut raw = [0u8; 2];
        self.bus.command(&command, Transfer::Read(&mut raw))?;
        Ok(raw[0])
    }

    /// Write a mode register
    pub fn write_register(&mut self, address: u32, value: u8) -> Result<(), PsramError> {
        let command = self.command(cmd::WRITE_REGISTER, address, 0, false);
        self.bus.command(&command, Transfer::Write(&[value, value]))?;
        Ok(())
    }

    /// Program read and write latency (3..=7 clocks, fixed latency)
    pub fn configure(&mut self, latency: u8) -> Result<(), PsramError> {
        let (rlc, wlc) = read_latency_code(latency)
            .zip(write_latency_code(latency))
            .ok_or(PsramError::InvalidLatency)?;

        let mr0 = self.read_register(MR0)?;
        let mr0 = (mr0 & !MR0_LATENCY_MASK) | MR0_FIXED_LATENCY | (rlc << MR0_LATENCY_SHIFT);
        self.write_register(MR0, mr0)?;

        let mr4 = self.read_register(MR4)?;
        let mr4 = (mr4 & !MR4_LATENCY_MASK) | (wlc << MR4_LATENCY_SHIFT);
        self.write_register(MR4, mr4)?;

        self.latency = latency;
        Ok(())
    }

    fn check(&self, addr: u32, len: usize) -> Result<(), PsramError> {
        if addr as u64 + len as u64 > PSRAM_SIZE as u64 {
            return Err(PsramError::OutOfRange);
        }
        if addr % 2 != 0 || len % 2 != 0 {
            return Err(PsramError::Misaligned);
        }
        Ok(())
    }

    /// Read `buf.len()` bytes at `addr`, one burst per row
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), PsramError> {
        self.check(addr, buf.len())?;
        let mut done = 0;
        for (row_addr, len) in super::mx25lm51245g::page_chunks(addr, buf.len(), ROW_SIZE) {
            let command = self.command(cmd::SYNC_READ, row_addr, self.read_dummy(), true);
            self.bus
                .command(&command, Transfer::Read(&mut buf[done..done + len]))?;
            done += len;
        }
        Ok(())
    }

    /// Write `data` at `addr`, one burst per row
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), PsramError> {
        self.check(addr, data.len())?;
        let mut done = 0;
        for (row_addr, len) in super::mx25lm51245g::page_chunks(addr, data.len(), ROW_SIZE) {
            let command = self.command(cmd::SYNC_WRITE, row_addr, self.write_dummy(), false);
            self.bus
                .command(&command, Transfer::Write(&data[done..done + len]))?;
            done += len;
        }
        Ok(())
    }
}

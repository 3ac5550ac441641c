//! MX25LM51245G 512 Mbit octal NOR flash
//!
//! The device powers up in single-line SPI mode. Configuration register 2
//! switches it to octal STR (SOPI) or octal DTR (DOPI). In both octal modes
//! every instruction is two bytes: the opcode followed by its complement.
//!
//! ```text
//! SPI : [op]          [addr x4]  dummy  data...   (1 line)
//! OPI : [op][!op]     [addr x4]  dummy  data...   (8 lines)
//! ```

use l4bsp_core::BspError;
use l4bsp_hal::octospi::{AutoPoll, Command, FieldSize, Lines, OctoSpiBus, OspiError, Transfer};

/// Single-line SPI opcodes
pub mod cmd {
    pub const WRITE_ENABLE: u8 = 0x06;
    pub const READ_STATUS: u8 = 0x05;
    pub const WRITE_CR2: u8 = 0x72;
    pub const READ_CR2: u8 = 0x71;
    pub const PAGE_PROGRAM_4B: u8 = 0x12;
    pub const SECTOR_ERASE_4B: u8 = 0x21;
    pub const BLOCK_ERASE_4B: u8 = 0xDC;
    pub const CHIP_ERASE: u8 = 0x60;
    pub const FAST_READ_4B: u8 = 0x0C;
    pub const READ_ID: u8 = 0x9F;
    pub const RESET_ENABLE: u8 = 0x66;
    pub const RESET: u8 = 0x99;
    /// Octal STR read
    pub const OCTA_READ: u8 = 0xEC;
    /// Octal DTR read
    pub const OCTA_DTR_READ: u8 = 0xEE;
}

/// JEDEC id: Macronix, octal, 512 Mbit
pub const MX25LM51245G_ID: [u8; 3] = [0xC2, 0x85, 0x3A];

/// Capacity in bytes
pub const FLASH_SIZE: u32 = 64 * 1024 * 1024;
/// Program page
pub const PAGE_SIZE: u32 = 256;
/// Smallest erase unit
pub const SECTOR_SIZE: u32 = 4 * 1024;
/// Block erase unit
pub const BLOCK_SIZE: u32 = 64 * 1024;

/// Status register: write in progress
pub const SR_WIP: u8 = 0x01;
/// Status register: write enable latch
pub const SR_WEL: u8 = 0x02;

/// CR2 address holding the interface mode
pub const CR2_MODE_ADDR: u32 = 0x0000_0000;
/// CR2 address holding the dummy cycle setting
pub const CR2_DUMMY_ADDR: u32 = 0x0000_0300;
/// CR2 mode: SPI
pub const CR2_SPI: u8 = 0x00;
/// CR2 mode: octal STR
pub const CR2_SOPI: u8 = 0x01;
/// CR2 mode: octal DTR
pub const CR2_DOPI: u8 = 0x02;
/// CR2 dummy setting for 20 cycles
pub const CR2_DUMMY_20: u8 = 0x00;

/// Dummy cycles for memory reads in octal mode
pub const DUMMY_CYCLES_READ_OCTAL: u8 = 20;
/// Dummy cycles for SPI fast read
pub const DUMMY_CYCLES_READ_SPI: u8 = 8;
/// Dummy cycles for register reads in octal STR mode
pub const DUMMY_CYCLES_REG_STR: u8 = 4;
/// Dummy cycles for register reads in octal DTR mode
pub const DUMMY_CYCLES_REG_DTR: u8 = 5;

/// Worst-case times from the datasheet
pub const PAGE_PROGRAM_TIMEOUT_MS: u32 = 10;
pub const SECTOR_ERASE_TIMEOUT_MS: u32 = 400;
pub const BLOCK_ERASE_TIMEOUT_MS: u32 = 2_000;
pub const CHIP_ERASE_TIMEOUT_MS: u32 = 300_000;
/// Register writes and the latch checks
pub const REGISTER_TIMEOUT_MS: u32 = 10;

/// Bus protocol the device currently expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interface {
    #[default]
    Spi,
    /// Octal, single transfer rate
    OctalStr,
    /// Octal, double transfer rate
    OctalDtr,
}

impl Interface {
    fn is_octal(self) -> bool {
        !matches!(self, Interface::Spi)
    }

    fn is_dtr(self) -> bool {
        matches!(self, Interface::OctalDtr)
    }
}

/// NOR flash errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NorError {
    /// OctoSPI host error
    Ospi(OspiError),
    /// Address range outside the device
    OutOfRange,
    /// Address or length not aligned to the operation's unit
    Misaligned,
    /// READ ID returned something else
    WrongId([u8; 3]),
    /// CR2 read-back did not show the requested mode
    ModeSwitch,
}

impl From<OspiError> for NorError {
    fn from(e: OspiError) -> Self {
        NorError::Ospi(e)
    }
}

impl From<NorError> for BspError {
    fn from(e: NorError) -> Self {
        match e {
            NorError::Ospi(e) => e.into(),
            NorError::OutOfRange | NorError::Misaligned => BspError::InvalidParameter,
            NorError::WrongId(_) => BspError::NotPresent,
            NorError::ModeSwitch => BspError::Error,
        }
    }
}

/// Two-byte octal instruction: opcode then its complement
pub const fn opi_instruction(opcode: u8) -> u32 {
    (opcode as u32) << 8 | (!opcode) as u32
}

/// Split `len` bytes starting at `addr` into runs that never cross a
/// `page`-byte boundary
pub fn page_chunks(addr: u32, len: usize, page: u32) -> impl Iterator<Item = (u32, usize)> {
    let mut addr = addr;
    let mut remaining = len;
    core::iter::from_fn(move || {
        if remaining == 0 {
            return None;
        }
        let room = (page - addr % page) as usize;
        let n = room.min(remaining);
        let chunk = (addr, n);
        addr += n as u32;
        remaining -= n;
        Some(chunk)
    })
}

/// MX25LM51245G driver
pub struct Mx25lm51245g<B> {
    bus: B,
    interface: Interface,
}

impl<B: OctoSpiBus> Mx25lm51245g<B> {
    /// Driver for a device in power-up (SPI) mode
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            interface: Interface::Spi,
        }
    }

    /// Release the bus
    pub fn release(self) -> B {
        self.bus
    }

    pub fn interface(&self) -> Interface {
        self.interface
    }

    /// Instruction phase for `opcode` in the current mode
    fn instruction(&self, opcode: u8) -> Command {
        match self.interface {
            Interface::Spi => Command {
                instruction_lines: Lines::Single,
                instruction_size: FieldSize::Bits8,
                instruction: opcode as u32,
                ..Default::default()
            },
            mode => Command {
                instruction_lines: Lines::Octal,
                instruction_size: FieldSize::Bits16,
                instruction: opi_instruction(opcode),
                instruction_dtr: mode.is_dtr(),
                ..Default::default()
            },
        }
    }

    fn lines(&self) -> Lines {
        if self.interface.is_octal() {
            Lines::Octal
        } else {
            Lines::Single
        }
    }

    fn with_address(&self, mut command: Command, address: u32) -> Command {
        command.address_lines = self.lines();
        command.address_size = FieldSize::Bits32;
        command.address = address;
        command.address_dtr = self.interface.is_dtr();
        command
    }

    fn with_data(&self, mut command: Command, dummy_cycles: u8, read: bool) -> Command {
        command.dummy_cycles = dummy_cycles;
        command.data_lines = self.lines();
        command.data_dtr = self.interface.is_dtr();
        command.dqs = read && self.interface.is_dtr();
        command
    }

    /// Register reads need an address in octal mode and return two bytes in DTR
    ///
    /// In SPI mode only READ CR2 carries an address.
    fn register_read_command(&self, opcode: u8, address: u32) -> Command {
        let command = self.instruction(opcode);
        match self.interface {
            Interface::Spi if opcode == cmd::READ_CR2 => {
                self.with_data(self.with_address(command, address), 0, true)
            }
            Interface::Spi => self.with_data(command, 0, true),
            Interface::OctalStr => {
                self.with_data(self.with_address(command, address), DUMMY_CYCLES_REG_STR, true)
            }
            Interface::OctalDtr => {
                self.with_data(self.with_address(command, address), DUMMY_CYCLES_REG_DTR, true)
            }
        }
    }

    fn register_len(&self) -> usize {
        if self.interface.is_dtr() {
            2
        } else {
            1
        }
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<(), NorError> {
        let end = (addr as u64) + len as u64;
        if end > FLASH_SIZE as u64 {
            return Err(NorError::OutOfRange);
        }
        // DTR transfers move 16 bits per clock
        if self.interface.is_dtr() && (addr % 2 != 0 || len % 2 != 0) {
            return Err(NorError::Misaligned);
        }
        Ok(())
    }

    /// Read the 3-byte JEDEC id
    ///
    /// In DTR mode each id byte is clocked out twice, so six bytes are read
    /// and every other one kept.
    pub fn read_id(&mut self) -> Result<[u8; 3], NorError> {
        let command = self.register_read_command(cmd::READ_ID, 0);
        let mut raw = [0u8; 6];
        let len = if self.interface.is_dtr() { 6 } else { 3 };
        self.bus.command(&command, Transfer::Read(&mut raw[..len]))?;
        Ok(if self.interface.is_dtr() {
            [raw[0], raw[2], raw[4]]
        } else {
            [raw[0], raw[1], raw[2]]
        })
    }

    /// Read the id and compare it with [`MX25LM51245G_ID`]
    pub fn check_id(&mut self) -> Result<(), NorError> {
        let id = self.read_id()?;
        if id != MX25LM51245G_ID {
            return Err(NorError::WrongId(id));
        }
        Ok(())
    }

    /// Status register
    pub fn status(&mut self) -> Result<u8, NorError> {
        let command = self.register_read_command(cmd::READ_STATUS, 0);
        let mut raw = [0u8; 2];
        let len = self.register_len();
        self.bus.command(&command, Transfer::Read(&mut raw[..len]))?;
        Ok(raw[0])
    }

    /// Read one configuration register 2 byte
    pub fn read_cr2(&mut self, address: u32) -> Result<u8, NorError> {
        let command = self.register_read_command(cmd::READ_CR2, address);
        let mut raw = [0u8; 2];
        let len = self.register_len();
        self.bus.command(&command, Transfer::Read(&mut raw[..len]))?;
        Ok(raw[0])
    }

    fn write_cr2(&mut self, address: u32, value: u8) -> Result<(), NorError> {
        self.write_enable()?;
        let command = self.with_data(self.with_address(self.instruction(cmd::WRITE_CR2), address), 0, false);
        let data = [value, value];
        let len = self.register_len();
        self.bus.command(&command, Transfer::Write(&data[..len]))?;
        Ok(())
    }

    fn poll_status(&mut self, mask: u8, matches: u8, timeout_ms: u32) -> Result<(), NorError> {
        let poll = AutoPoll {
            command: self.register_read_command(cmd::READ_STATUS, 0),
            mask: mask as u32,
            matches: matches as u32,
            timeout_ms,
        };
        self.bus.auto_poll(&poll)?;
        Ok(())
    }

    /// Set the write enable latch and wait for it to show in the status
    pub fn write_enable(&mut self) -> Result<(), NorError> {
        let command = self.instruction(cmd::WRITE_ENABLE);
        self.bus.command(&command, Transfer::None)?;
        self.poll_status(SR_WEL, SR_WEL, REGISTER_TIMEOUT_MS)
    }

    /// Wait until no program or erase is in progress
    pub fn wait_ready(&mut self, timeout_ms: u32) -> Result<(), NorError> {
        self.poll_status(SR_WIP, 0, timeout_ms)
    }

    /// Software reset
    ///
    /// The current mode of the device is unknown after an MCU reset, so the
    /// reset sequence is sent in all three protocols. The driver is back in
    /// SPI mode afterwards.
    pub fn reset(&mut self) -> Result<(), NorError> {
        for mode in [Interface::OctalDtr, Interface::OctalStr, Interface::Spi] {
            self.interface = mode;
            for opcode in [cmd::RESET_ENABLE, cmd::RESET] {
                let command = self.instruction(opcode);
                self.bus.command(&command, Transfer::None)?;
            }
        }
        self.interface = Interface::Spi;
        self.wait_ready(REGISTER_TIMEOUT_MS)
    }

    /// Switch from SPI to octal STR or DTR
    ///
    /// Sets 20 dummy cycles first, then the mode, then checks CR2 through
    /// the new protocol.
    pub fn enter_octal(&mut self, mode: Interface) -> Result<(), NorError> {
        let value = match mode {
            Interface::Spi => return self.exit_octal(),
            Interface::OctalStr => CR2_SOPI,
            Interface::OctalDtr => CR2_DOPI,
        };
        if self.interface == mode {
            return Ok(());
        }
        if self.interface.is_octal() {
            self.exit_octal()?;
        }

        self.write_cr2(CR2_DUMMY_ADDR, CR2_DUMMY_20)?;
        self.write_cr2(CR2_MODE_ADDR, value)?;

        self.interface = mode;
        self.wait_ready(REGISTER_TIMEOUT_MS)?;
        if self.read_cr2(CR2_MODE_ADDR)? != value {
            return Err(NorError::ModeSwitch);
        }
        Ok(())
    }

    /// Return to single-line SPI
    pub fn exit_octal(&mut self) -> Result<(), NorError> {
        if !self.interface.is_octal() {
            return Ok(());
        }
        self.write_cr2(CR2_MODE_ADDR, CR2_SPI)?;
        self.interface = Interface::Spi;
        self.wait_ready(REGISTER_TIMEOUT_MS)?;
        if self.read_cr2(CR2_MODE_ADDR)? != CR2_SPI {
            return Err(NorError::ModeSwitch);
        }
        Ok(())
    }

    /// Read `buf.len()` bytes at `addr`
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), NorError> {
        self.check_range(addr, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }
        let (opcode, dummy) = match self.interface {
            Interface::Spi => (cmd::FAST_READ_4B, DUMMY_CYCLES_READ_SPI),
            Interface::OctalStr => (cmd::OCTA_READ, DUMMY_CYCLES_READ_OCTAL),
            Interface::OctalDtr => (cmd::OCTA_DTR_READ, DUMMY_CYCLES_READ_OCTAL),
        };
        let command = self.with_data(self.with_address(self.instruction(opcode), addr), dummy, true);
        self.bus.command(&command, Transfer::Read(buf))?;
        Ok(())
    }

    /// Program `data` at `addr`, one page program per 256-byte page touched
    ///
    /// The target must be erased; NOR programming only clears bits.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), NorError> {
        self.check_range(addr, data.len())?;
        let mut consumed = 0;
        for (page_addr, len) in page_chunks(addr, data.len(), PAGE_SIZE) {
            self.write_enable()?;
            let command = self.with_data(
                self.with_address(self.instruction(cmd::PAGE_PROGRAM_4B), page_addr),
                0,
                false,
            );
            self.bus
                .command(&command, Transfer::Write(&data[consumed..consumed + len]))?;
            consumed += len;
            self.wait_ready(PAGE_PROGRAM_TIMEOUT_MS)?;
        }
        Ok(())
    }

    fn erase(&mut self, opcode: u8, addr: u32, unit: u32, timeout_ms: u32) -> Result<(), NorError> {
        if addr >= FLASH_SIZE {
            return Err(NorError::OutOfRange);
        }
        if addr % unit != 0 {
            return Err(NorError::Misaligned);
        }
        self.write_enable()?;
        let command = self.with_address(self.instruction(opcode), addr);
        self.bus.command(&command, Transfer::None)?;
        self.wait_ready(timeout_ms)
    }

    /// Erase the 4 KiB sector at `addr`
    pub fn erase_sector(&mut self, addr: u32) -> Result<(), NorError> {
        self.erase(cmd::SECTOR_ERASE_4B, addr, SECTOR_SIZE, SECTOR_ERASE_TIMEOUT_MS)
    }

    /// Erase the 64 KiB block at `addr`
    pub fn erase_block(&mut self, addr: u32) -> Result<(), NorError> {
        self.erase(cmd::BLOCK_ERASE_4B, addr, BLOCK_SIZE, BLOCK_ERASE_TIMEOUT_MS)
    }

    /// Erase the whole device
    pub fn erase_chip(&mut self) -> Result<(), NorError> {
        self.write_enable()?;
        let command = self.instruction(cmd::CHIP_ERASE);
        self.bus.command(&command, Transfer::None)?;
        self.wait_ready(CHIP_ERASE_TIMEOUT_MS)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::vec::Vec;

    /// Logged command with the data length it carried
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Logged {
        pub command: Command,
        pub len: usize,
    }

    /// Host that records every command and emulates a small NOR array
    pub(crate) struct MockOspi {
        pub log: Vec<Logged>,
        pub polls: Vec<AutoPoll>,
        pub memory: Vec<u8>,
        pub cr2: u8,
        pub fail_polls: bool,
    }

    impl MockOspi {
        pub(crate) fn new() -> Self {
            Self {
                log: Vec::new(),
                polls: Vec::new(),
                memory: std::vec![0xFF; 4096],
                cr2: 0,
                fail_polls: false,
            }
        }

        fn opcode(command: &Command) -> u8 {
            match command.instruction_size {
                FieldSize::Bits16 => (command.instruction >> 8) as u8,
                _ => command.instruction as u8,
            }
        }

        pub(crate) fn opcodes(&self) -> Vec<u8> {
            self.log.iter().map(|l| Self::opcode(&l.command)).collect()
        }
    }

    impl OctoSpiBus for MockOspi {
        fn command(&mut self, command: &Command, transfer: Transfer<'_>) -> Result<(), OspiError> {
            let addr = command.address as usize;
            let len = match transfer {
                Transfer::None => 0,
                Transfer::Read(buf) => {
                    match Self::opcode(command) {
                        cmd::READ_ID => {
                            let id = MX25LM51245G_ID;
                            if buf.len() == 6 {
                                buf.copy_from_slice(&[id[0], id[0], id[1], id[1], id[2], id[2]]);
                            } else {
                                buf.copy_from_slice(&id);
                            }
                        }
                        cmd::READ_CR2 => buf.fill(self.cr2),
                        cmd::READ_STATUS => buf.fill(0),
                        _ => {
                            let n = buf.len();
                            buf.copy_from_slice(&self.memory[addr..addr + n]);
                        }
                    }
                    buf.len()
                }
                Transfer::Write(data) => {
                    match Self::opcode(command) {
                        cmd::WRITE_CR2 if command.address == CR2_MODE_ADDR => self.cr2 = data[0],
                        cmd::WRITE_CR2 => {}
                        _ => {
                            for (i, b) in data.iter().enumerate() {
                                self.memory[addr + i] &= b;
                            }
                        }
                    }
                    data.len()
                }
            };
            self.log.push(Logged {
                command: *command,
                len,
            });
            Ok(())
        }

        fn auto_poll(&mut self, poll: &AutoPoll) -> Result<(), OspiError> {
            self.polls.push(*poll);
            if self.fail_polls {
                Err(OspiError::Timeout)
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_opi_instruction_encoding() {
        assert_eq!(opi_instruction(cmd::OCTA_DTR_READ), 0xEE11);
        assert_eq!(opi_instruction(cmd::OCTA_READ), 0xEC13);
        assert_eq!(opi_instruction(cmd::WRITE_ENABLE), 0x06F9);
    }

    #[test]
    fn test_page_chunks_split_on_boundaries() {
        let chunks: Vec<_> = page_chunks(250, 300, 256).collect();
        assert_eq!(chunks, [(250, 6), (256, 256), (512, 38)]);
        assert_eq!(page_chunks(0, 0, 256).count(), 0);
        assert_eq!(page_chunks(512, 256, 256).count(), 1);
    }

    #[test]
    fn test_spi_read_id() {
        let mut nor = Mx25lm51245g::new(MockOspi::new());
        nor.check_id().unwrap();
        let bus = nor.release();
        assert_eq!(bus.log[0].command.instruction, cmd::READ_ID as u32);
        assert_eq!(bus.log[0].command.instruction_lines, Lines::Single);
    }

    #[test]
    fn test_write_splits_pages_with_latch_and_busy_polls() {
        let mut nor = Mx25lm51245g::new(MockOspi::new());
        let data = [0xA5u8; 300];
        nor.write(250, &data).unwrap();

        let bus = nor.release();
        let programs: Vec<_> = bus
            .log
            .iter()
            .filter(|l| l.command.instruction == cmd::PAGE_PROGRAM_4B as u32)
            .map(|l| (l.command.address, l.len))
            .collect();
        assert_eq!(programs, [(250, 6), (256, 256), (512, 38)]);
        assert_eq!(
            bus.opcodes(),
            [
                cmd::WRITE_ENABLE,
                cmd::PAGE_PROGRAM_4B,
                cmd::WRITE_ENABLE,
                cmd::PAGE_PROGRAM_4B,
                cmd::WRITE_ENABLE,
                cmd::PAGE_PROGRAM_4B
            ]
        );
        // WEL set then WIP clear per page
        assert_eq!(bus.polls.len(), 6);
        assert_eq!((bus.polls[0].mask, bus.polls[0].matches), (SR_WEL as u32, SR_WEL as u32));
        assert_eq!((bus.polls[1].mask, bus.polls[1].matches), (SR_WIP as u32, 0));
        assert!(bus.memory[250..550].iter().all(|&b| b == 0xA5));
        assert_eq!(bus.memory[249], 0xFF);
    }

    #[test]
    fn test_enter_octal_dtr() {
        let mut nor = Mx25lm51245g::new(MockOspi::new());
        nor.enter_octal(Interface::OctalDtr).unwrap();
        assert_eq!(nor.interface(), Interface::OctalDtr);
        nor.check_id().unwrap();

        let mut buf = [0u8; 4];
        nor.read(16, &mut buf).unwrap();
        assert_eq!(nor.read(17, &mut buf), Err(NorError::Misaligned));

        let bus = nor.release();
        let read = bus.log.last().unwrap().command;
        assert_eq!(read.instruction, 0xEE11);
        assert_eq!(read.instruction_size, FieldSize::Bits16);
        assert!(read.instruction_dtr && read.address_dtr && read.data_dtr && read.dqs);
        assert_eq!(read.dummy_cycles, DUMMY_CYCLES_READ_OCTAL);
        assert_eq!(read.data_lines, Lines::Octal);
    }

    #[test]
    fn test_enter_octal_str_and_back() {
        let mut nor = Mx25lm51245g::new(MockOspi::new());
        nor.enter_octal(Interface::OctalStr).unwrap();
        let status = nor.status();
        assert_eq!(status, Ok(0));
        nor.exit_octal().unwrap();
        assert_eq!(nor.interface(), Interface::Spi);
        assert_eq!(nor.release().cr2, CR2_SPI);
    }

    #[test]
    fn test_spi_cr2_read_carries_address() {
        let mut nor = Mx25lm51245g::new(MockOspi::new());
        nor.read_cr2(CR2_DUMMY_ADDR).unwrap();
        nor.status().unwrap();

        let bus = nor.release();
        let cr2 = bus.log[0].command;
        assert_eq!(cr2.instruction, cmd::READ_CR2 as u32);
        assert_eq!(cr2.address_lines, Lines::Single);
        assert_eq!(cr2.address_size, FieldSize::Bits32);
        assert_eq!(cr2.address, CR2_DUMMY_ADDR);
        assert_eq!(cr2.dummy_cycles, 0);
        assert_eq!(cr2.data_lines, Lines::Single);

        // Status stays address-less
        assert_eq!(bus.log[1].command.address_lines, Lines::None);
    }

    #[test]
    fn test_mode_switch_verified() {
        struct Stuck(MockOspi);
        impl OctoSpiBus for Stuck {
            fn command(&mut self, command: &Command, transfer: Transfer<'_>) -> Result<(), OspiError> {
                self.0.command(command, transfer)?;
                self.0.cr2 = CR2_SPI;
                Ok(())
            }
            fn auto_poll(&mut self, poll: &AutoPoll) -> Result<(), OspiError> {
                self.0.auto_poll(poll)
            }
        }

        let mut nor = Mx25lm51245g::new(Stuck(MockOspi::new()));
        assert_eq!(nor.enter_octal(Interface::OctalStr), Err(NorError::ModeSwitch));
    }

    #[test]
    fn test_erase_alignment_and_range() {
        let mut nor = Mx25lm51245g::new(MockOspi::new());
        assert_eq!(nor.erase_sector(100), Err(NorError::Misaligned));
        assert_eq!(nor.erase_block(SECTOR_SIZE), Err(NorError::Misaligned));
        assert_eq!(nor.erase_sector(FLASH_SIZE), Err(NorError::OutOfRange));
        nor.erase_block(BLOCK_SIZE).unwrap();

        let mut buf = [0u8; 2];
        assert_eq!(nor.read(FLASH_SIZE - 1, &mut buf), Err(NorError::OutOfRange));

        let bus = nor.release();
        assert_eq!(bus.polls.last().unwrap().timeout_ms, BLOCK_ERASE_TIMEOUT_MS);
    }

    #[test]
    fn test_busy_timeout_propagates() {
        let mut bus = MockOspi::new();
        bus.fail_polls = true;
        let mut nor = Mx25lm51245g::new(bus);
        assert_eq!(nor.erase_chip(), Err(NorError::Ospi(OspiError::Timeout)));
        assert_eq!(BspError::from(NorError::Ospi(OspiError::Timeout)), BspError::Timeout);
    }

    #[test]
    fn test_reset_sends_all_protocols() {
        let mut nor = Mx25lm51245g::new(MockOspi::new());
        nor.enter_octal(Interface::OctalDtr).unwrap();
        nor.reset().unwrap();
        assert_eq!(nor.interface(), Interface::Spi);

        let bus = nor.release();
        let resets: Vec<_> = bus
            .log
            .iter()
            .filter(|l| matches!(MockOspi::opcode(&l.command), cmd::RESET_ENABLE | cmd::RESET))
            .map(|l| l.command.instruction)
            .collect();
        assert_eq!(resets, [0x6699, 0x9966, 0x6699, 0x9966, 0x66, 0x99]);
    }
}

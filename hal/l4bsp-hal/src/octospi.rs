//! OctoSPI command interface
//!
//! An OctoSPI transaction is made of optional phases, each with its own
//! line count and transfer rate:
//!
//! ```text
//! ┌─────────────┬─────────┬───────────┬───────┬──────────┐
//! │ INSTRUCTION │ ADDRESS │ ALTERNATE │ DUMMY │ DATA     │
//! │ 1-4 bytes   │ 1-4 B   │ 0-4 B     │ n clk │ 0-n B    │
//! └─────────────┴─────────┴───────────┴───────┴──────────┘
//! ```

/// Number of lines used by a phase (`None` skips the phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lines {
    #[default]
    None,
    Single,
    Dual,
    Quad,
    Octal,
}

/// Width of the instruction or address field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldSize {
    #[default]
    Bits8,
    Bits16,
    Bits24,
    Bits32,
}

impl FieldSize {
    /// Size in bytes
    pub fn bytes(self) -> usize {
        match self {
            FieldSize::Bits8 => 1,
            FieldSize::Bits16 => 2,
            FieldSize::Bits24 => 3,
            FieldSize::Bits32 => 4,
        }
    }
}

/// One OctoSPI command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command {
    /// Instruction lines
    pub instruction_lines: Lines,
    /// Instruction width
    pub instruction_size: FieldSize,
    /// Instruction value
    pub instruction: u32,
    /// Instruction sent on both clock edges
    pub instruction_dtr: bool,
    /// Address lines
    pub address_lines: Lines,
    /// Address width
    pub address_size: FieldSize,
    /// Address value
    pub address: u32,
    /// Address sent on both clock edges
    pub address_dtr: bool,
    /// Dummy cycles between address and data
    pub dummy_cycles: u8,
    /// Data lines
    pub data_lines: Lines,
    /// Data transferred on both clock edges
    pub data_dtr: bool,
    /// DQS (data strobe) used for reads
    pub dqs: bool,
}

/// Data phase of a command
pub enum Transfer<'a> {
    /// No data phase
    None,
    /// Read into the buffer
    Read(&'a mut [u8]),
    /// Write the buffer
    Write(&'a [u8]),
}

/// Automatic status polling request
///
/// The peripheral re-issues `command` until `(status & mask) == matches`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AutoPoll {
    /// Status-read command
    pub command: Command,
    /// Bits to compare
    pub mask: u32,
    /// Expected value of the masked bits
    pub matches: u32,
    /// Give up after this many milliseconds
    pub timeout_ms: u32,
}

/// Errors reported by the OctoSPI host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OspiError {
    /// Command or polling timeout
    Timeout,
    /// Transfer error flag
    Transfer,
    /// Command not valid for the current configuration
    InvalidCommand,
}

/// OctoSPI host in indirect mode
pub trait OctoSpiBus {
    /// Issue one command with an optional data phase
    fn command(&mut self, command: &Command, transfer: Transfer<'_>) -> Result<(), OspiError>;

    /// Poll a status register until it matches
    fn auto_poll(&mut self, poll: &AutoPoll) -> Result<(), OspiError>;
}

//! OctoSPI bus for STM32L4+
//!
//! Maps the phase-by-phase [`Command`] onto embassy-stm32's indirect-mode
//! `TransferConfig`. Status polling is done in software against an
//! embassy-time deadline.

use embassy_stm32::mode::Blocking;
use embassy_stm32::ospi::{AddressSize, DummyCycles, Instance, Ospi, OspiWidth, TransferConfig};
use embassy_time::{Duration, Instant};
use l4bsp_hal::octospi::{AutoPoll, Command, FieldSize, Lines, OctoSpiBus, OspiError, Transfer};

fn width(lines: Lines) -> OspiWidth {
    match lines {
        Lines::None => OspiWidth::NONE,
        Lines::Single => OspiWidth::SING,
        Lines::Dual => OspiWidth::DUAL,
        Lines::Quad => OspiWidth::QUAD,
        Lines::Octal => OspiWidth::OCTO,
    }
}

fn size(size: FieldSize) -> AddressSize {
    match size {
        FieldSize::Bits8 => AddressSize::_8Bit,
        FieldSize::Bits16 => AddressSize::_16Bit,
        FieldSize::Bits24 => AddressSize::_24bit,
        FieldSize::Bits32 => AddressSize::_32bit,
    }
}

fn dummy(cycles: u8) -> Result<DummyCycles, OspiError> {
    use DummyCycles::*;
    const TABLE: [DummyCycles; 32] = [
        _0, _1, _2, _3, _4, _5, _6, _7, _8, _9, _10, _11, _12, _13, _14, _15, _16, _17, _18, _19,
        _20, _21, _22, _23, _24, _25, _26, _27, _28, _29, _30, _31,
    ];
    TABLE
        .get(cycles as usize)
        .copied()
        .ok_or(OspiError::InvalidCommand)
}

/// Build the transfer description for `command`
pub fn transfer_config(command: &Command) -> Result<TransferConfig, OspiError> {
    let has_instruction = command.instruction_lines != Lines::None;
    let has_address = command.address_lines != Lines::None;
    Ok(TransferConfig {
        iwidth: width(command.instruction_lines),
        instruction: has_instruction.then_some(command.instruction),
        isize: size(command.instruction_size),
        idtr: command.instruction_dtr,
        adwidth: width(command.address_lines),
        address: has_address.then_some(command.address),
        adsize: size(command.address_size),
        addtr: command.address_dtr,
        dwidth: width(command.data_lines),
        ddtr: command.data_dtr,
        dummy: dummy(command.dummy_cycles)?,
        ..Default::default()
    })
}

/// Blocking [`OctoSpiBus`] over an embassy OctoSPI instance
///
/// DQS is part of the peripheral configuration in embassy, so the per
/// command flag only has to agree with how the instance was set up.
pub struct L4Ospi<'d, T: Instance> {
    ospi: Ospi<'d, T, Blocking>,
}

impl<'d, T: Instance> L4Ospi<'d, T> {
    pub fn new(ospi: Ospi<'d, T, Blocking>) -> Self {
        Self { ospi }
    }

    pub fn release(self) -> Ospi<'d, T, Blocking> {
        self.ospi
    }
}

impl<T: Instance> OctoSpiBus for L4Ospi<'_, T> {
    fn command(&mut self, command: &Command, transfer: Transfer<'_>) -> Result<(), OspiError> {
        let config = transfer_config(command)?;
        match transfer {
            Transfer::None => {
                if command.data_lines != Lines::None {
                    return Err(OspiError::InvalidCommand);
                }
                self.ospi.blocking_command(&config)
            }
            Transfer::Read(buf) => self.ospi.blocking_read(buf, config),
            Transfer::Write(data) => self.ospi.blocking_write(data, config),
        }
        .map_err(|_| OspiError::Transfer)
    }

    fn auto_poll(&mut self, poll: &AutoPoll) -> Result<(), OspiError> {
        let config = transfer_config(&poll.command)?;
        // DTR status reads return each byte twice
        let mut status = [0u8; 4];
        let len = if poll.command.data_dtr { 2 } else { 1 };
        let deadline = Instant::now() + Duration::from_millis(poll.timeout_ms as u64);

        loop {
            self.ospi
                .blocking_read(&mut status[..len], config)
                .map_err(|_| OspiError::Transfer)?;
            let value = u32::from_le_bytes(status);
            if value & poll.mask == poll.matches {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(OspiError::Timeout);
            }
        }
    }
}

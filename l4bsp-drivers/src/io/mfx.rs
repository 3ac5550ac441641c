//! MFXSTM32L152 multi-function expander
//!
//! An STM32L152 running ST's MFX firmware, reached over I2C. It provides:
//! - 16 GPIOs plus 8 alternate GPIOs (AGPIO) when the touchscreen and IDD
//!   functions do not claim them
//! - IDD measurement of the main MCU supply
//! - one interrupt output (IRQ_OUT) aggregating all its event sources
//!
//! Multi-byte GPIO registers are three consecutive bytes, pins 0-7 first.

use embedded_hal::delay::DelayNs;
use l4bsp_core::traits::io_expander::{IoExpander, IrqTrigger, PinDirection, PinMask, Pull};
use l4bsp_core::BspError;
use l4bsp_hal::i2c::{I2cBus, I2cMemExt, MemAddressSize};

use super::idd::{self, IddConfig, IddError, IddErrorSource, MAX_SHUNTS};
use crate::irq::IrqFlag;

/// MFX register addresses
pub mod reg {
    pub const ID: u8 = 0x00;
    pub const FW_VERSION_MSB: u8 = 0x01;
    pub const FW_VERSION_LSB: u8 = 0x02;
    pub const ERROR_SRC: u8 = 0x03;
    pub const ERROR_MSG: u8 = 0x04;
    pub const IRQ_PENDING: u8 = 0x08;
    pub const IRQ_GPI_PENDING1: u8 = 0x0C;
    pub const GPIO_STATE1: u8 = 0x10;
    pub const IDD_VALUE_MSB: u8 = 0x14;
    pub const IDD_SHUNT_USED: u8 = 0x1A;
    pub const SYS_CTRL: u8 = 0x40;
    pub const IRQ_OUT: u8 = 0x41;
    pub const IRQ_SRC_EN: u8 = 0x42;
    pub const IRQ_ACK: u8 = 0x44;
    pub const IRQ_GPI_SRC1: u8 = 0x48;
    pub const IRQ_GPI_EVT1: u8 = 0x4C;
    pub const IRQ_GPI_TYPE1: u8 = 0x50;
    pub const IRQ_GPI_ACK1: u8 = 0x54;
    pub const GPIO_DIR1: u8 = 0x60;
    pub const GPIO_TYPE1: u8 = 0x64;
    pub const GPIO_PUPD1: u8 = 0x68;
    pub const GPO_SET1: u8 = 0x6C;
    pub const GPO_CLR1: u8 = 0x70;
    pub const IDD_CTRL: u8 = 0x80;
    pub const IDD_PRE_DELAY: u8 = 0x81;
    pub const IDD_SHUNT0_MSB: u8 = 0x82;
    pub const IDD_GAIN_MSB: u8 = 0x8C;
    pub const IDD_VDD_MIN_MSB: u8 = 0x8E;
    pub const IDD_SH0_STABILIZATION: u8 = 0x90;
    pub const IDD_NBR_OF_MEAS: u8 = 0x96;
    pub const IDD_MEAS_DELTA_DELAY: u8 = 0x97;
    pub const IDD_SHUNTS_ON_BOARD: u8 = 0x98;
}

/// SYS_CTRL bits
pub mod sys_ctrl {
    pub const GPIO_EN: u8 = 0x01;
    pub const TS_EN: u8 = 0x02;
    pub const IDD_EN: u8 = 0x04;
    pub const ALTERNATE_GPIO_EN: u8 = 0x08;
    pub const STANDBY: u8 = 0x40;
    pub const SWRST: u8 = 0x80;
}

/// Global interrupt sources (IRQ_SRC_EN / IRQ_PENDING / IRQ_ACK)
pub mod irq {
    pub const GPIO: u8 = 0x01;
    pub const IDD: u8 = 0x02;
    pub const ERROR: u8 = 0x04;
    pub const TS_DET: u8 = 0x08;
    pub const TS_NE: u8 = 0x10;
    pub const TS_TH: u8 = 0x20;
    pub const TS_FULL: u8 = 0x40;
    pub const TS_OVF: u8 = 0x80;
}

/// IRQ_OUT: push-pull output
pub const IRQ_OUT_PUSH_PULL: u8 = 0x01;
/// IRQ_OUT: active high
pub const IRQ_OUT_ACTIVE_HIGH: u8 = 0x02;

/// Identifiers reported by the ID register
pub const MFX_IDS: [u8; 2] = [0x7B, 0x79];

/// GPIOs available with the alternate GPIOs enabled
pub const MFX_PIN_COUNT: u8 = 24;

const ALL_PINS: PinMask = (1 << MFX_PIN_COUNT) - 1;

/// Time the MFX needs to come back after a software reset
pub const RESET_DELAY_MS: u32 = 10;

/// MFX errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MfxError<E> {
    /// Bus transaction failed
    Bus(E),
    /// ID register did not match an MFX
    WrongChipId(u8),
    /// Pin mask outside the 24 available pins
    InvalidPin,
    /// IDD configuration or measurement failure
    Idd(IddError),
    /// No IDD completion within the allowed time
    Timeout,
}

impl<E> From<MfxError<E>> for BspError {
    fn from(e: MfxError<E>) -> Self {
        match e {
            MfxError::Bus(_) => BspError::Bus,
            MfxError::WrongChipId(_) => BspError::NotPresent,
            MfxError::InvalidPin => BspError::InvalidParameter,
            MfxError::Idd(IddError::Measurement(_)) => BspError::Error,
            MfxError::Idd(_) => BspError::InvalidParameter,
            MfxError::Timeout => BspError::Timeout,
        }
    }
}

/// MFX driver
pub struct Mfx<B> {
    bus: B,
    address: u8,
}

impl<B: I2cBus> Mfx<B> {
    pub fn new(bus: B, address: u8) -> Self {
        Self { bus, address }
    }

    /// Release the bus
    pub fn release(self) -> B {
        self.bus
    }

    fn read(&mut self, reg: u8) -> Result<u8, MfxError<B::Error>> {
        self.bus.read_reg(self.address, reg).map_err(MfxError::Bus)
    }

    fn write(&mut self, reg: u8, value: u8) -> Result<(), MfxError<B::Error>> {
        self.bus
            .write_reg(self.address, reg, value)
            .map_err(MfxError::Bus)
    }

    fn write_block(&mut self, reg: u8, data: &[u8]) -> Result<(), MfxError<B::Error>> {
        self.bus
            .mem_write(self.address, reg as u16, MemAddressSize::Bits8, data)
            .map_err(MfxError::Bus)
    }

    fn read_block(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), MfxError<B::Error>> {
        self.bus
            .mem_read(self.address, reg as u16, MemAddressSize::Bits8, buf)
            .map_err(MfxError::Bus)
    }

    fn read_pins24(&mut self, reg: u8) -> Result<PinMask, MfxError<B::Error>> {
        let mut raw = [0u8; 3];
        self.read_block(reg, &mut raw)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], 0]))
    }

    fn write_pins24(&mut self, reg: u8, pins: PinMask) -> Result<(), MfxError<B::Error>> {
        let [b0, b1, b2, _] = pins.to_le_bytes();
        self.write_block(reg, &[b0, b1, b2])
    }

    /// Set or clear `pins` in a 24-bit register, leaving the others
    fn update_pins24(&mut self, reg: u8, pins: PinMask, set: bool) -> Result<(), MfxError<B::Error>> {
        let current = self.read_pins24(reg)?;
        let value = if set { current | pins } else { current & !pins };
        self.write_pins24(reg, value)
    }

    fn check_pins(pins: PinMask) -> Result<(), MfxError<B::Error>> {
        if pins & !ALL_PINS != 0 {
            return Err(MfxError::InvalidPin);
        }
        Ok(())
    }

    /// Read the ID register
    pub fn chip_id(&mut self) -> Result<u8, MfxError<B::Error>> {
        self.read(reg::ID)
    }

    /// Firmware version (major in the high byte)
    pub fn firmware_version(&mut self) -> Result<u16, MfxError<B::Error>> {
        let mut raw = [0u8; 2];
        self.read_block(reg::FW_VERSION_MSB, &mut raw)?;
        Ok(u16::from_be_bytes(raw))
    }

    /// Check the chip id, configure IRQ_OUT and enable the GPIO function
    pub fn init(&mut self) -> Result<(), MfxError<B::Error>> {
        let id = self.chip_id()?;
        if !MFX_IDS.contains(&id) {
            return Err(MfxError::WrongChipId(id));
        }
        // Active-low push-pull into the MCU EXTI line
        self.write(reg::IRQ_OUT, IRQ_OUT_PUSH_PULL)?;
        self.enable_functions(sys_ctrl::GPIO_EN | sys_ctrl::ALTERNATE_GPIO_EN)
    }

    /// Software reset, waiting for the MFX to restart
    pub fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), MfxError<B::Error>> {
        self.write(reg::SYS_CTRL, sys_ctrl::SWRST)?;
        delay.delay_ms(RESET_DELAY_MS);
        Ok(())
    }

    /// Put the MFX into standby; it wakes on its wakeup pin
    pub fn enter_standby(&mut self) -> Result<(), MfxError<B::Error>> {
        let ctrl = self.read(reg::SYS_CTRL)?;
        self.write(reg::SYS_CTRL, ctrl | sys_ctrl::STANDBY)
    }

    /// Enable functions (SYS_CTRL bits)
    pub fn enable_functions(&mut self, functions: u8) -> Result<(), MfxError<B::Error>> {
        let ctrl = self.read(reg::SYS_CTRL)?;
        self.write(reg::SYS_CTRL, ctrl | functions)
    }

    /// Disable functions (SYS_CTRL bits)
    pub fn disable_functions(&mut self, functions: u8) -> Result<(), MfxError<B::Error>> {
        let ctrl = self.read(reg::SYS_CTRL)?;
        self.write(reg::SYS_CTRL, ctrl & !functions)
    }

    /// Route global interrupt sources to IRQ_OUT
    pub fn enable_global_irq(&mut self, sources: u8) -> Result<(), MfxError<B::Error>> {
        let enabled = self.read(reg::IRQ_SRC_EN)?;
        self.write(reg::IRQ_SRC_EN, enabled | sources)
    }

    /// Stop routing global interrupt sources
    pub fn disable_global_irq(&mut self, sources: u8) -> Result<(), MfxError<B::Error>> {
        let enabled = self.read(reg::IRQ_SRC_EN)?;
        self.write(reg::IRQ_SRC_EN, enabled & !sources)
    }

    /// Pending global interrupt sources
    pub fn pending_global_irqs(&mut self) -> Result<u8, MfxError<B::Error>> {
        self.read(reg::IRQ_PENDING)
    }

    /// Acknowledge global interrupt sources
    pub fn ack_global_irqs(&mut self, sources: u8) -> Result<(), MfxError<B::Error>> {
        self.write(reg::IRQ_ACK, sources)
    }

    /// Set pins high
    pub fn set_pins(&mut self, pins: PinMask) -> Result<(), MfxError<B::Error>> {
        Self::check_pins(pins)?;
        self.write_pins24(reg::GPO_SET1, pins)
    }

    /// Set pins low
    pub fn clear_pins(&mut self, pins: PinMask) -> Result<(), MfxError<B::Error>> {
        Self::check_pins(pins)?;
        self.write_pins24(reg::GPO_CLR1, pins)
    }

    // IDD measurement

    /// Program the shunt bank and measurement timing, enabling the IDD
    /// function and its interrupt
    pub fn idd_configure(&mut self, config: &IddConfig) -> Result<(), MfxError<B::Error>> {
        config.validate().map_err(MfxError::Idd)?;
        self.enable_functions(sys_ctrl::IDD_EN)?;

        for i in 0..MAX_SHUNTS {
            self.write_block(reg::IDD_SHUNT0_MSB + 2 * i as u8, &config.shunts[i].to_be_bytes())?;
            self.write(reg::IDD_SH0_STABILIZATION + i as u8, config.stabilization[i])?;
        }
        self.write_block(reg::IDD_GAIN_MSB, &config.gain.to_be_bytes())?;
        self.write_block(reg::IDD_VDD_MIN_MSB, &config.vdd_min_mv.to_be_bytes())?;
        self.write(reg::IDD_PRE_DELAY, idd::encode_delay(config.pre_delay_ms))?;
        self.write(reg::IDD_NBR_OF_MEAS, config.measurements)?;
        self.write(reg::IDD_MEAS_DELTA_DELAY, idd::encode_delay(config.delta_delay_ms))?;
        self.write(reg::IDD_SHUNTS_ON_BOARD, config.shunts_on_board)?;
        self.write(reg::IDD_CTRL, config.ctrl())?;

        self.enable_global_irq(irq::IDD | irq::ERROR)
    }

    /// Request a measurement
    pub fn idd_start(&mut self) -> Result<(), MfxError<B::Error>> {
        let ctrl = self.read(reg::IDD_CTRL)?;
        self.write(reg::IDD_CTRL, ctrl | idd::ctrl::REQ)
    }

    /// Last measured current in nanoamps
    pub fn idd_value_na(&mut self) -> Result<u32, MfxError<B::Error>> {
        let mut raw = [0u8; 3];
        self.read_block(reg::IDD_VALUE_MSB, &mut raw)?;
        Ok(idd::decode_value_na(raw))
    }

    /// Shunt selected for the last measurement
    pub fn idd_shunt_used(&mut self) -> Result<u8, MfxError<B::Error>> {
        self.read(reg::IDD_SHUNT_USED)
    }

    /// Latched error source and message
    pub fn idd_error(&mut self) -> Result<IddErrorSource, MfxError<B::Error>> {
        let mut raw = [0u8; 2];
        self.read_block(reg::ERROR_SRC, &mut raw)?;
        Ok(IddErrorSource {
            source: raw[0],
            message: raw[1],
        })
    }

    /// Wait for the end of a measurement and return the current in nanoamps
    ///
    /// `flag` is signalled by the IRQ_OUT interrupt handler. The pending
    /// register is read as well so the call also works with the interrupt
    /// line unconnected.
    pub fn idd_wait(
        &mut self,
        flag: &IrqFlag,
        delay: &mut impl DelayNs,
        timeout_ms: u32,
    ) -> Result<u32, MfxError<B::Error>> {
        for _ in 0..=timeout_ms {
            let signalled = flag.take();
            let pending = self.pending_global_irqs()?;
            if pending & irq::ERROR != 0 {
                let source = self.idd_error()?;
                self.ack_global_irqs(irq::ERROR)?;
                return Err(MfxError::Idd(IddError::Measurement(source)));
            }
            if signalled || pending & irq::IDD != 0 {
                self.ack_global_irqs(irq::IDD)?;
                return self.idd_value_na();
            }
            delay.delay_ms(1);
        }
        Err(MfxError::Timeout)
    }
}

impl<B: I2cBus> IoExpander for Mfx<B> {
    type Error = MfxError<B::Error>;

    fn pin_count(&self) -> u8 {
        MFX_PIN_COUNT
    }

    fn set_direction(&mut self, pins: PinMask, direction: PinDirection) -> Result<(), Self::Error> {
        Self::check_pins(pins)?;
        self.update_pins24(reg::GPIO_DIR1, pins, direction == PinDirection::Output)
    }

    fn set_pull(&mut self, pins: PinMask, pull: Pull) -> Result<(), Self::Error> {
        Self::check_pins(pins)?;
        // Inputs: TYPE selects pull enable, PUPD selects up/down
        match pull {
            Pull::None => self.update_pins24(reg::GPIO_TYPE1, pins, false),
            Pull::Up => {
                self.update_pins24(reg::GPIO_TYPE1, pins, true)?;
                self.update_pins24(reg::GPIO_PUPD1, pins, true)
            }
            Pull::Down => {
                self.update_pins24(reg::GPIO_TYPE1, pins, true)?;
                self.update_pins24(reg::GPIO_PUPD1, pins, false)
            }
        }
    }

    fn write_pins(&mut self, pins: PinMask, high: bool) -> Result<(), Self::Error> {
        if high {
            self.set_pins(pins)
        } else {
            self.clear_pins(pins)
        }
    }

    fn read_pins(&mut self, pins: PinMask) -> Result<PinMask, Self::Error> {
        Self::check_pins(pins)?;
        Ok(self.read_pins24(reg::GPIO_STATE1)? & pins)
    }

    fn enable_pin_irq(&mut self, pins: PinMask, trigger: IrqTrigger) -> Result<(), Self::Error> {
        Self::check_pins(pins)?;
        let edge = matches!(trigger, IrqTrigger::RisingEdge | IrqTrigger::FallingEdge);
        let high = matches!(trigger, IrqTrigger::RisingEdge | IrqTrigger::HighLevel);
        self.update_pins24(reg::IRQ_GPI_EVT1, pins, edge)?;
        self.update_pins24(reg::IRQ_GPI_TYPE1, pins, high)?;
        self.update_pins24(reg::IRQ_GPI_SRC1, pins, true)?;
        self.enable_global_irq(irq::GPIO)
    }

    fn pending_pin_irqs(&mut self) -> Result<PinMask, Self::Error> {
        self.read_pins24(reg::IRQ_GPI_PENDING1)
    }

    fn ack_pin_irqs(&mut self, pins: PinMask) -> Result<(), Self::Error> {
        Self::check_pins(pins)?;
        self.write_pins24(reg::IRQ_GPI_ACK1, pins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Nack;

    /// Register file with ACK registers that clear pending bits
    struct MockMfx {
        regs: [u8; 256],
        writes: std::vec::Vec<(u8, u8)>,
    }

    impl MockMfx {
        fn new() -> Self {
            let mut regs = [0u8; 256];
            regs[reg::ID as usize] = 0x7B;
            Self {
                regs,
                writes: std::vec::Vec::new(),
            }
        }

        fn written(&self, reg: u8) -> std::vec::Vec<u8> {
            self.writes
                .iter()
                .filter(|(r, _)| *r == reg)
                .map(|(_, v)| *v)
                .collect()
        }
    }

    impl I2cBus for MockMfx {
        type Error = Nack;

        fn write(&mut self, _address: u8, data: &[u8]) -> Result<(), Nack> {
            let base = data[0];
            for (i, &value) in data[1..].iter().enumerate() {
                let reg = base + i as u8;
                self.writes.push((reg, value));
                if reg == reg::IRQ_ACK {
                    self.regs[reg::IRQ_PENDING as usize] &= !value;
                } else {
                    self.regs[reg as usize] = value;
                }
            }
            Ok(())
        }

        fn read(&mut self, _address: u8, _buf: &mut [u8]) -> Result<(), Nack> {
            Err(Nack)
        }

        fn write_read(&mut self, _address: u8, wr: &[u8], rd: &mut [u8]) -> Result<(), Nack> {
            let base = wr[0] as usize;
            rd.copy_from_slice(&self.regs[base..base + rd.len()]);
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn test_init_checks_chip_id() {
        let mut mfx = Mfx::new(MockMfx::new(), 0x42);
        mfx.init().unwrap();
        let bus = mfx.release();
        assert_eq!(
            bus.regs[reg::SYS_CTRL as usize],
            sys_ctrl::GPIO_EN | sys_ctrl::ALTERNATE_GPIO_EN
        );

        let mut bus = MockMfx::new();
        bus.regs[reg::ID as usize] = 0x12;
        let mut mfx = Mfx::new(bus, 0x42);
        assert_eq!(mfx.init(), Err(MfxError::WrongChipId(0x12)));
        assert_eq!(
            BspError::from(MfxError::<Nack>::WrongChipId(0x12)),
            BspError::NotPresent
        );
    }

    #[test]
    fn test_pin_registers_are_little_endian() {
        let mut mfx = Mfx::new(MockMfx::new(), 0x42);
        mfx.set_pins(1 << 0 | 1 << 9 | 1 << 17).unwrap();
        let bus = mfx.release();
        assert_eq!(&bus.regs[reg::GPO_SET1 as usize..][..3], &[0x01, 0x02, 0x02]);
    }

    #[test]
    fn test_direction_is_read_modify_write() {
        let mut bus = MockMfx::new();
        bus.regs[reg::GPIO_DIR1 as usize] = 0x80;
        let mut mfx = Mfx::new(bus, 0x42);
        mfx.set_direction(1 << 8, PinDirection::Output).unwrap();
        mfx.set_direction(1 << 7, PinDirection::Input).unwrap();

        let bus = mfx.release();
        assert_eq!(&bus.regs[reg::GPIO_DIR1 as usize..][..3], &[0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_read_pins_masks_result() {
        let mut bus = MockMfx::new();
        bus.regs[reg::GPIO_STATE1 as usize + 1] = 0xFF;
        let mut mfx = Mfx::new(bus, 0x42);
        assert_eq!(mfx.read_pins(1 << 8 | 1 << 0).unwrap(), 1 << 8);
        assert_eq!(mfx.read_pins(1 << 24), Err(MfxError::InvalidPin));
    }

    #[test]
    fn test_pin_irq_configuration() {
        let mut mfx = Mfx::new(MockMfx::new(), 0x42);
        mfx.enable_pin_irq(1 << 8, IrqTrigger::FallingEdge).unwrap();
        let bus = mfx.release();

        assert_eq!(bus.regs[reg::IRQ_GPI_EVT1 as usize + 1], 0x01);
        assert_eq!(bus.regs[reg::IRQ_GPI_TYPE1 as usize + 1], 0x00);
        assert_eq!(bus.regs[reg::IRQ_GPI_SRC1 as usize + 1], 0x01);
        assert_eq!(bus.regs[reg::IRQ_SRC_EN as usize], irq::GPIO);
    }

    #[test]
    fn test_idd_configure_programs_registers() {
        let cfg = IddConfig::from_settings(&l4bsp_core::config::BoardConfig::L4R9I_EVAL.idd);
        let mut mfx = Mfx::new(MockMfx::new(), 0x42);
        mfx.idd_configure(&cfg).unwrap();
        mfx.idd_start().unwrap();
        let bus = mfx.release();

        assert_eq!(&bus.regs[reg::IDD_SHUNT0_MSB as usize..][..2], &1000u16.to_be_bytes());
        assert_eq!(&bus.regs[reg::IDD_GAIN_MSB as usize..][..2], &4967u16.to_be_bytes());
        assert_eq!(bus.regs[reg::IDD_PRE_DELAY as usize], 0x80 | 5);
        assert_eq!(bus.regs[reg::IDD_NBR_OF_MEAS as usize], 10);
        assert_eq!(bus.regs[reg::IDD_SHUNTS_ON_BOARD as usize], 5);
        assert_eq!(bus.written(reg::IDD_CTRL), std::vec![5 << 1, (5 << 1) | 0x01]);
        assert_ne!(bus.regs[reg::SYS_CTRL as usize] & sys_ctrl::IDD_EN, 0);
    }

    #[test]
    fn test_idd_wait_uses_flag() {
        let flag = IrqFlag::new();
        let mut bus = MockMfx::new();
        bus.regs[reg::IDD_VALUE_MSB as usize..][..3].copy_from_slice(&[0x00, 0x27, 0x10]);
        let mut mfx = Mfx::new(bus, 0x42);

        flag.signal();
        assert_eq!(mfx.idd_wait(&flag, &mut NoDelay, 10), Ok(100_000));
        assert!(!flag.is_set());
    }

    #[test]
    fn test_idd_wait_after_irq_edge() {
        static DONE: IrqFlag = IrqFlag::new();
        let mut bus = MockMfx::new();
        bus.regs[reg::IDD_VALUE_MSB as usize..][..3].copy_from_slice(&[0x00, 0x00, 0x64]);
        let mut mfx = Mfx::new(bus, 0x42);

        // Single check before the edge
        assert_eq!(mfx.idd_wait(&DONE, &mut NoDelay, 0), Err(MfxError::Timeout));

        // EXTI handler on another context
        std::thread::spawn(|| DONE.signal()).join().unwrap();
        assert_eq!(mfx.idd_wait(&DONE, &mut NoDelay, 0), Ok(1_000));
        assert_eq!(mfx.release().written(reg::IRQ_ACK), std::vec![irq::IDD]);
    }

    #[test]
    fn test_idd_wait_polls_pending_and_acks() {
        let flag = IrqFlag::new();
        let mut bus = MockMfx::new();
        bus.regs[reg::IRQ_PENDING as usize] = irq::IDD;
        let mut mfx = Mfx::new(bus, 0x42);

        assert_eq!(mfx.idd_wait(&flag, &mut NoDelay, 10), Ok(0));
        let bus = mfx.release();
        assert_eq!(bus.regs[reg::IRQ_PENDING as usize], 0);
    }

    #[test]
    fn test_idd_wait_reports_error_and_timeout() {
        let flag = IrqFlag::new();
        let mut bus = MockMfx::new();
        bus.regs[reg::IRQ_PENDING as usize] = irq::ERROR;
        bus.regs[reg::ERROR_SRC as usize] = 0x04;
        bus.regs[reg::ERROR_MSG as usize] = 0x11;
        let mut mfx = Mfx::new(bus, 0x42);
        assert_eq!(
            mfx.idd_wait(&flag, &mut NoDelay, 10),
            Err(MfxError::Idd(IddError::Measurement(IddErrorSource {
                source: 0x04,
                message: 0x11
            })))
        );
        assert_eq!(mfx.idd_wait(&flag, &mut NoDelay, 10), Err(MfxError::Timeout));
    }
}

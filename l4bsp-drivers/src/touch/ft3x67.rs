//! FT3X67 capacitive touch controller
//!
//! Register-mapped over I2C. Each touch occupies six registers:
//!
//! ```text
//! XH: [7:6] event flag  [3:0] X[11:8]
//! XL: X[7:0]
//! YH: [7:4] touch id    [3:0] Y[11:8]
//! YL: Y[7:0]
//! WEIGHT
//! MISC: [7:4] touch area
//! ```

use l4bsp_core::traits::touch::{Gesture, TouchController, TouchEvent, TouchPoint};
use l4bsp_core::BspError;
use l4bsp_hal::i2c::{I2cBus, I2cMemExt, MemAddressSize};

/// FT3X67 register addresses
pub mod reg {
    pub const DEV_MODE: u8 = 0x00;
    pub const GEST_ID: u8 = 0x01;
    pub const TD_STAT: u8 = 0x02;
    pub const P1_XH: u8 = 0x03;
    pub const P2_XH: u8 = 0x09;
    pub const TH_GROUP: u8 = 0x80;
    pub const PERIOD_ACTIVE: u8 = 0x88;
    pub const G_MODE: u8 = 0xA4;
    pub const CHIP_ID: u8 = 0xA8;
    pub const FIRMWARE_ID: u8 = 0xA6;
}

/// Value of the CHIP_ID register
pub const FT3X67_ID: u8 = 0x11;

/// Touches tracked by the controller
pub const FT3X67_MAX_TOUCHES: u8 = 2;

/// TD_STAT touch count field
const TD_STAT_MASK: u8 = 0x0F;

/// G_MODE: interrupt line follows touch status (polling)
pub const G_MODE_POLLING: u8 = 0x00;
/// G_MODE: interrupt pulse per report (trigger)
pub const G_MODE_TRIGGER: u8 = 0x01;

/// Touch controller errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchError<E> {
    /// Bus transaction failed
    Bus(E),
    /// CHIP_ID register did not match
    WrongChipId(u8),
    /// Touch index beyond the controller's capacity
    InvalidIndex,
}

impl<E> From<TouchError<E>> for BspError {
    fn from(e: TouchError<E>) -> Self {
        match e {
            TouchError::Bus(_) => BspError::Bus,
            TouchError::WrongChipId(_) => BspError::NotPresent,
            TouchError::InvalidIndex => BspError::InvalidParameter,
        }
    }
}

fn decode_event(xh: u8) -> TouchEvent {
    match xh >> 6 {
        0 => TouchEvent::PressDown,
        1 => TouchEvent::LiftUp,
        2 => TouchEvent::Contact,
        _ => TouchEvent::NoEvent,
    }
}

fn decode_gesture(id: u8) -> Gesture {
    match id {
        0x10 => Gesture::MoveUp,
        0x14 => Gesture::MoveRight,
        0x18 => Gesture::MoveDown,
        0x1C => Gesture::MoveLeft,
        0x48 => Gesture::ZoomIn,
        0x49 => Gesture::ZoomOut,
        _ => Gesture::None,
    }
}

/// Decode one six-register touch report
pub fn decode_point(raw: &[u8; 6]) -> TouchPoint {
    TouchPoint {
        x: ((raw[0] & 0x0F) as u16) << 8 | raw[1] as u16,
        y: ((raw[2] & 0x0F) as u16) << 8 | raw[3] as u16,
        weight: raw[4],
        area: raw[5] >> 4,
        event: decode_event(raw[0]),
    }
}

/// FT3X67 driver
pub struct Ft3x67<B> {
    bus: B,
    address: u8,
}

impl<B: I2cBus> Ft3x67<B> {
    pub fn new(bus: B, address: u8) -> Self {
        Self { bus, address }
    }

    /// Release the bus
    pub fn release(self) -> B {
        self.bus
    }

    fn read(&mut self, reg: u8) -> Result<u8, TouchError<B::Error>> {
        self.bus.read_reg(self.address, reg).map_err(TouchError::Bus)
    }

    /// Check the chip id and select polling mode
    pub fn init(&mut self) -> Result<(), TouchError<B::Error>> {
        let id = self.read(reg::CHIP_ID)?;
        if id != FT3X67_ID {
            return Err(TouchError::WrongChipId(id));
        }
        self.set_interrupt_mode(false)
    }

    /// Firmware version register
    pub fn firmware_id(&mut self) -> Result<u8, TouchError<B::Error>> {
        self.read(reg::FIRMWARE_ID)
    }
}

impl<B: I2cBus> TouchController for Ft3x67<B> {
    type Error = TouchError<B::Error>;

    fn max_touches(&self) -> u8 {
        FT3X67_MAX_TOUCHES
    }

    fn chip_id(&mut self) -> Result<u8, Self::Error> {
        self.read(reg::CHIP_ID)
    }

    fn detect_touch(&mut self) -> Result<u8, Self::Error> {
        let count = self.read(reg::TD_STAT)? & TD_STAT_MASK;
        // Values above the supported count are glitches reported while the
        // controller is scanning
        Ok(if count > FT3X67_MAX_TOUCHES { 0 } else { count })
    }

    fn touch_point(&mut self, index: u8) -> Result<TouchPoint, Self::Error> {
        if index >= FT3X67_MAX_TOUCHES {
            return Err(TouchError::InvalidIndex);
        }
        let base = reg::P1_XH + index * (reg::P2_XH - reg::P1_XH);
        let mut raw = [0u8; 6];
        self.bus
            .mem_read(self.address, base as u16, MemAddressSize::Bits8, &mut raw)
            .map_err(TouchError::Bus)?;
        Ok(decode_point(&raw))
    }

    fn gesture(&mut self) -> Result<Gesture, Self::Error> {
        Ok(decode_gesture(self.read(reg::GEST_ID)?))
    }

    fn set_interrupt_mode(&mut self, enabled: bool) -> Result<(), Self::Error> {
        let mode = if enabled {
            G_MODE_TRIGGER
        } else {
            G_MODE_POLLING
        };
        self.bus
            .write_reg(self.address, reg::G_MODE, mode)
            .map_err(TouchError::Bus)
    }
}

//! IO expander trait

/// Bitmask of expander pins (bit n = pin n)
pub type PinMask = u32;

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinDirection {
    Input,
    Output,
}

/// Pin bias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    None,
    Up,
    Down,
}

/// Interrupt trigger for expander input pins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqTrigger {
    RisingEdge,
    FallingEdge,
    HighLevel,
    LowLevel,
}

/// I2C GPIO expander
pub trait IoExpander {
    /// Error type for expander operations
    type Error;

    /// Number of pins provided
    fn pin_count(&self) -> u8;

    /// Configure the direction of `pins`
    fn set_direction(&mut self, pins: PinMask, direction: PinDirection)
        -> Result<(), Self::Error>;

    /// Configure the bias of `pins`
    fn set_pull(&mut self, pins: PinMask, pull: Pull) -> Result<(), Self::Error>;

    /// Drive output `pins` high or low
    fn write_pins(&mut self, pins: PinMask, high: bool) -> Result<(), Self::Error>;

    /// Read the level of `pins` (other bits are zero)
    fn read_pins(&mut self, pins: PinMask) -> Result<PinMask, Self::Error>;

    /// Enable interrupts on `pins`
    fn enable_pin_irq(&mut self, pins: PinMask, trigger: IrqTrigger) -> Result<(), Self::Error>;

    /// Pins with a pending interrupt
    fn pending_pin_irqs(&mut self) -> Result<PinMask, Self::Error>;

    /// Acknowledge interrupts on `pins`
    fn ack_pin_irqs(&mut self, pins: PinMask) -> Result<(), Self::Error>;
}

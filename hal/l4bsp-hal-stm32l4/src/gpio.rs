//! GPIO bindings for STM32L4
//!
//! Newtypes over embassy-stm32 pins implementing the `l4bsp-hal` pin traits.

use embassy_stm32::gpio::{Input, Output};
use l4bsp_hal::gpio::{InputPin, OutputPin};

/// Push-pull output
pub struct L4Output<'d>(pub Output<'d>);

impl<'d> L4Output<'d> {
    pub fn new(pin: Output<'d>) -> Self {
        Self(pin)
    }
}

impl OutputPin for L4Output<'_> {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }

    fn toggle(&mut self) {
        self.0.toggle();
    }

    fn is_set_high(&self) -> bool {
        self.0.is_set_high()
    }
}

/// Digital input
pub struct L4Input<'d>(pub Input<'d>);

impl<'d> L4Input<'d> {
    pub fn new(pin: Input<'d>) -> Self {
        Self(pin)
    }
}

impl InputPin for L4Input<'_> {
    fn is_high(&self) -> bool {
        self.0.is_high()
    }
}

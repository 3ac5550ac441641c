//! GPIO pin abstractions
//!
//! Digital pins used by the board drivers: LEDs, the SD card detect line,
//! touch and expander interrupt lines.

/// Digital output pin
pub trait OutputPin {
    /// Drive the pin high
    fn set_high(&mut self);

    /// Drive the pin low
    fn set_low(&mut self);

    /// Toggle the pin state
    fn toggle(&mut self);

    /// Drive the pin to a specific level
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the output latch is high
    fn is_set_high(&self) -> bool;

    /// Check if the output latch is low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

/// Digital input pin
pub trait InputPin {
    /// Check if the pin reads high
    fn is_high(&self) -> bool;

    /// Check if the pin reads low
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// Electrical level at which a signal is considered asserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActiveLevel {
    High,
    Low,
}

/// Input line with an explicit active level
///
/// The SD detect switch and the MFX wakeup line are active-low on the
/// evaluation boards; the touch interrupt is active-high on some panels.
pub struct Signal<P> {
    pin: P,
    level: ActiveLevel,
}

impl<P: InputPin> Signal<P> {
    /// Wrap a pin with its active level
    pub fn new(pin: P, level: ActiveLevel) -> Self {
        Self { pin, level }
    }

    /// Returns true when the line is at its active level
    pub fn is_asserted(&self) -> bool {
        match self.level {
            ActiveLevel::High => self.pin.is_high(),
            ActiveLevel::Low => self.pin.is_low(),
        }
    }

    /// Release the underlying pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

/// Board LED driven through an output pin
pub struct Led<P> {
    pin: P,
    level: ActiveLevel,
}

impl<P: OutputPin> Led<P> {
    /// Create an LED, initially off
    pub fn new(pin: P, level: ActiveLevel) -> Self {
        let mut led = Self { pin, level };
        led.off();
        led
    }

    /// Turn the LED on
    pub fn on(&mut self) {
        self.pin.set_state(self.level == ActiveLevel::High);
    }

    /// Turn the LED off
    pub fn off(&mut self) {
        self.pin.set_state(self.level == ActiveLevel::Low);
    }

    /// Toggle the LED
    pub fn toggle(&mut self) {
        self.pin.toggle();
    }

    /// Check if the LED is lit
    pub fn is_on(&self) -> bool {
        self.pin.is_set_high() == (self.level == ActiveLevel::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePin(bool);

    impl InputPin for FakePin {
        fn is_high(&self) -> bool {
            self.0
        }
    }

    impl OutputPin for FakePin {
        fn set_high(&mut self) {
            self.0 = true;
        }
        fn set_low(&mut self) {
            self.0 = false;
        }
        fn toggle(&mut self) {
            self.0 = !self.0;
        }
        fn is_set_high(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn test_active_low_signal() {
        let signal = Signal::new(FakePin(false), ActiveLevel::Low);
        assert!(signal.is_asserted());

        let signal = Signal::new(FakePin(true), ActiveLevel::Low);
        assert!(!signal.is_asserted());
    }

    #[test]
    fn test_active_low_led() {
        let mut led = Led::new(FakePin(false), ActiveLevel::Low);
        // Starts off => pin driven high
        assert!(!led.is_on());

        led.on();
        assert!(led.is_on());
        assert!(led.pin.is_set_low());

        led.toggle();
        assert!(!led.is_on());
    }
}

//! RNG peripheral for STM32L4
//!
//! Words are read straight from the data register so seed and clock errors
//! reach the caller instead of being retried inside the driver.

use embassy_stm32::pac;
use embassy_stm32::rng::{Instance, Rng};
use embassy_time::{Duration, Instant};
use l4bsp_hal::rng::{RandomSource, RngError};

/// A word takes 42 RNG clock cycles; this is far above that
const READY_TIMEOUT: Duration = Duration::from_millis(2);

/// Hardware [`RandomSource`]
pub struct L4Rng<'d, T: Instance> {
    rng: Rng<'d, T>,
}

impl<'d, T: Instance> L4Rng<'d, T> {
    pub fn new(rng: Rng<'d, T>) -> Self {
        Self { rng }
    }

    pub fn release(self) -> Rng<'d, T> {
        self.rng
    }
}

impl<T: Instance> RandomSource for L4Rng<'_, T> {
    fn next_u32(&mut self) -> Result<u32, RngError> {
        let regs = pac::RNG;
        let deadline = Instant::now() + READY_TIMEOUT;
        loop {
            let sr = regs.sr().read();
            if sr.seis() {
                return Err(RngError::SeedError);
            }
            if sr.ceis() {
                return Err(RngError::ClockError);
            }
            if sr.drdy() {
                return Ok(regs.dr().read());
            }
            if Instant::now() >= deadline {
                return Err(RngError::Timeout);
            }
        }
    }

    /// Clear the error and restart the generator
    fn recover(&mut self) {
        self.rng.reset();
    }
}

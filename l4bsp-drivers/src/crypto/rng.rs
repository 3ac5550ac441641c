//! Random number generation with seed-error recovery

use l4bsp_core::{BspError, BspResult};
use l4bsp_hal::rng::{RandomSource, RngError};

/// Recoveries attempted after a seed error before giving up
pub const SEED_RETRIES: u8 = 3;

/// Random generator over a [`RandomSource`]
///
/// A seed error is transient: the source is restarted and the read retried.
/// A clock error means the RNG clock is misconfigured and is reported as is.
pub struct RandomGenerator<R> {
    source: R,
    retries: u8,
}

impl<R: RandomSource> RandomGenerator<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            retries: SEED_RETRIES,
        }
    }

    /// Change the number of seed-error recoveries
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    pub fn release(self) -> R {
        self.source
    }

    /// One random word
    pub fn next_u32(&mut self) -> BspResult<u32> {
        for _ in 0..=self.retries {
            match self.source.next_u32() {
                Ok(value) => return Ok(value),
                Err(RngError::SeedError) => self.source.recover(),
                Err(e) => return Err(e.into()),
            }
        }
        Err(BspError::from(RngError::SeedError))
    }

    /// Fill a word buffer
    pub fn fill_u32(&mut self, buf: &mut [u32]) -> BspResult<()> {
        for word in buf {
            *word = self.next_u32()?;
        }
        Ok(())
    }

    /// Fill a byte buffer, four bytes per word
    pub fn fill_bytes(&mut self, buf: &mut [u8]) -> BspResult<()> {
        for chunk in buf.chunks_mut(4) {
            let bytes = self.next_u32()?.to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
        Ok(())
    }
}

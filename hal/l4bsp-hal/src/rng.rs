//! True random number generator

/// Errors reported by the RNG
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RngError {
    /// Seed error (SECS): the entropy source failed its health test
    SeedError,
    /// Clock error (CECS): RNG clock too slow
    ClockError,
    /// No data ready in time
    Timeout,
}

/// Source of 32-bit random words
pub trait RandomSource {
    /// Next 32-bit random word
    fn next_u32(&mut self) -> Result<u32, RngError>;

    /// Recover from a seed error (clear SEIS, restart the generator)
    fn recover(&mut self) {}
}

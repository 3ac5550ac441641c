//! Byte-addressable EEPROM trait

/// Byte-addressable non-volatile memory
pub trait Eeprom {
    /// Error type for EEPROM operations
    type Error;

    /// Size in bytes
    fn capacity(&self) -> usize;

    /// Read `buf.len()` bytes starting at `offset`
    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write `data` starting at `offset`, waiting for completion
    fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), Self::Error>;
}

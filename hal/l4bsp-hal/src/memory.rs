//! Memory-mapped external memory
//!
//! External SRAM and PSRAM on the FMC bus appear as a 16-bit wide window in
//! the address space. Offsets are in bytes from the start of the window.
//! Accesses are plain bus cycles: a call returns once the data has moved.

/// Errors from external memory access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MemoryError {
    /// Access beyond the end of the device
    OutOfBounds,
    /// Offset not aligned to the bus width
    Misaligned,
}

/// 16-bit memory-mapped device
pub trait MemoryBus {
    /// Size of the window in bytes
    fn size_bytes(&self) -> usize;

    /// Read halfwords starting at byte `offset`
    fn read_halfwords(&mut self, offset: usize, buf: &mut [u16]) -> Result<(), MemoryError>;

    /// Write halfwords starting at byte `offset`
    fn write_halfwords(&mut self, offset: usize, data: &[u16]) -> Result<(), MemoryError>;
}

/// Check that a halfword access fits the window
pub fn check_access(size_bytes: usize, offset: usize, halfwords: usize) -> Result<(), MemoryError> {
    if offset % 2 != 0 {
        return Err(MemoryError::Misaligned);
    }
    let end = halfwords
        .checked_mul(2)
        .and_then(|len| offset.checked_add(len))
        .ok_or(MemoryError::OutOfBounds)?;
    if end > size_bytes {
        return Err(MemoryError::OutOfBounds);
    }
    Ok(())
}

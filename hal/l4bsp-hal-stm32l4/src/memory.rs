//! Memory-mapped external SRAM on the FMC
//!
//! Bank timing and pin setup are done by the firmware before the window is
//! created; this type only performs 16-bit volatile accesses inside it.

use l4bsp_hal::memory::{check_access, MemoryBus, MemoryError};

/// FMC bank 1, NOR/PSRAM subbank 1
pub const FMC_BANK1_NE1: usize = 0x6000_0000;
/// FMC bank 1, NOR/PSRAM subbank 2
pub const FMC_BANK1_NE2: usize = 0x6400_0000;

/// Volatile window onto an FMC memory bank
pub struct FmcMemory {
    base: *mut u16,
    size: usize,
}

impl FmcMemory {
    /// # Safety
    ///
    /// `base..base + size` must be a configured FMC bank that nothing else
    /// accesses for the lifetime of the window.
    pub unsafe fn new(base: usize, size: usize) -> Self {
        Self {
            base: base as *mut u16,
            size,
        }
    }
}

impl MemoryBus for FmcMemory {
    fn size_bytes(&self) -> usize {
        self.size
    }

    fn read_halfwords(&mut self, offset: usize, buf: &mut [u16]) -> Result<(), MemoryError> {
        check_access(self.size, offset, buf.len())?;
        let start = offset / 2;
        for (i, out) in buf.iter_mut().enumerate() {
            // SAFETY: in bounds by check_access, exclusive by construction
            *out = unsafe { core::ptr::read_volatile(self.base.add(start + i)) };
        }
        Ok(())
    }

    fn write_halfwords(&mut self, offset: usize, data: &[u16]) -> Result<(), MemoryError> {
        check_access(self.size, offset, data.len())?;
        let start = offset / 2;
        for (i, &value) in data.iter().enumerate() {
            // SAFETY: in bounds by check_access, exclusive by construction
            unsafe { core::ptr::write_volatile(self.base.add(start + i), value) };
        }
        Ok(())
    }
}

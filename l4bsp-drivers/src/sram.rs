//! External SRAM on the FMC bus
//!
//! The memory is accessed in 16-bit units through a [`MemoryBus`]. The CPU
//! drives every transfer, so data is in place when `write` returns and
//! there is no completion event to wait for.

use l4bsp_core::{BspError, BspResult};
use l4bsp_hal::memory::{check_access, MemoryBus};

/// Halfwords moved per chunk by [`ExternalSram::pattern_test`]
const TEST_CHUNK: usize = 64;

/// External SRAM
pub struct ExternalSram<M> {
    bus: M,
}

impl<M: MemoryBus> ExternalSram<M> {
    pub fn new(bus: M) -> Self {
        Self { bus }
    }

    /// Release the bus
    pub fn release(self) -> M {
        self.bus
    }

    /// Size in bytes
    pub fn size_bytes(&self) -> usize {
        self.bus.size_bytes()
    }

    /// Read halfwords starting at byte offset `addr`
    pub fn read(&mut self, addr: usize, buf: &mut [u16]) -> BspResult<()> {
        check_access(self.bus.size_bytes(), addr, buf.len())?;
        Ok(self.bus.read_halfwords(addr, buf)?)
    }

    /// Write halfwords starting at byte offset `addr`
    pub fn write(&mut self, addr: usize, data: &[u16]) -> BspResult<()> {
        check_access(self.bus.size_bytes(), addr, data.len())?;
        Ok(self.bus.write_halfwords(addr, data)?)
    }

    /// Write a counting pattern over `len` bytes at `addr` and read it back
    ///
    /// Returns the byte offset of the first bad halfword, if any.
    pub fn pattern_test(&mut self, addr: usize, len: usize, seed: u16) -> BspResult<Option<usize>> {
        if len % 2 != 0 {
            return Err(BspError::InvalidParameter);
        }
        check_access(self.bus.size_bytes(), addr, len / 2)?;

        let pattern = |i: usize| seed.wrapping_add(i as u16);
        let halfwords = len / 2;
        let mut chunk = [0u16; TEST_CHUNK];

        let mut i = 0;
        while i < halfwords {
            let n = TEST_CHUNK.min(halfwords - i);
            for (k, slot) in chunk[..n].iter_mut().enumerate() {
                *slot = pattern(i + k);
            }
            self.write(addr + 2 * i, &chunk[..n])?;
            i += n;
        }

        let mut i = 0;
        while i < halfwords {
            let n = TEST_CHUNK.min(halfwords - i);
            self.read(addr + 2 * i, &mut chunk[..n])?;
            if let Some(k) = (0..n).find(|&k| chunk[k] != pattern(i + k)) {
                return Ok(Some(addr + 2 * (i + k)));
            }
            i += n;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l4bsp_hal::memory::MemoryError;

    struct MockSram {
        cells: std::vec::Vec<u16>,
        /// Address line stuck low: this halfword index aliases to 0
        stuck: Option<usize>,
    }

    impl MockSram {
        fn new(halfwords: usize) -> Self {
            Self {
                cells: std::vec![0; halfwords],
                stuck: None,
            }
        }

        fn index(&self, offset: usize, i: usize) -> usize {
            let idx = offset / 2 + i;
            if Some(idx) == self.stuck {
                0
            } else {
                idx
            }
        }
    }

    impl MemoryBus for MockSram {
        fn size_bytes(&self) -> usize {
            self.cells.len() * 2
        }

        fn read_halfwords(&mut self, offset: usize, buf: &mut [u16]) -> Result<(), MemoryError> {
            for (i, out) in buf.iter_mut().enumerate() {
                *out = self.cells[self.index(offset, i)];
            }
            Ok(())
        }

        fn write_halfwords(&mut self, offset: usize, data: &[u16]) -> Result<(), MemoryError> {
            for (i, v) in data.iter().enumerate() {
                let idx = self.index(offset, i);
                self.cells[idx] = *v;
            }
            Ok(())
        }
    }

    #[test]
    fn test_read_write_and_bounds() {
        let mut sram = ExternalSram::new(MockSram::new(16));
        sram.write(4, &[1, 2, 3]).unwrap();
        let mut buf = [0u16; 3];
        sram.read(4, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);

        assert_eq!(sram.write(30, &[1, 2]), Err(BspError::InvalidParameter));
        assert_eq!(sram.read(3, &mut buf), Err(BspError::InvalidParameter));
    }

    #[test]
    fn test_pattern_test_finds_aliasing() {
        let mut sram = ExternalSram::new(MockSram::new(300));
        assert_eq!(sram.pattern_test(0, 600, 0x1234), Ok(None));

        let mut bus = sram.release();
        bus.stuck = Some(200);
        let mut sram = ExternalSram::new(bus);
        // Writing index 200 clobbers index 0, which is checked first
        assert_eq!(sram.pattern_test(0, 600, 0x1234), Ok(Some(0)));
        assert_eq!(sram.pattern_test(0, 5, 0), Err(BspError::InvalidParameter));
    }
}

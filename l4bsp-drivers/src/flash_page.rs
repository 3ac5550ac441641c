//! Read-modify-write on internal flash pages
//!
//! Flash is erased a page at a time and programmed in double-words, so an
//! arbitrary byte range is written by rewriting each page it touches:
//!
//! ```text
//! read page -> splice bytes -> unchanged? skip
//!                           -> erase -> program -> verify
//! ```

use l4bsp_core::{BspError, BspResult};
use l4bsp_hal::flash::PageFlash;

/// Largest page the helper can buffer (STM32L4R9: 8 KiB in dual-bank mode)
pub const MAX_PAGE_SIZE: usize = 8 * 1024;

/// Byte value of erased flash
pub const ERASED: u8 = 0xFF;

/// Outcome of a rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RewriteStats {
    /// Pages erased and programmed
    pub pages_written: usize,
    /// Pages whose content was already correct
    pub pages_skipped: usize,
}

/// Page rewrite helper over a [`PageFlash`]
pub struct PageWriter<F> {
    flash: F,
    page: [u8; MAX_PAGE_SIZE],
}

impl<F: PageFlash> PageWriter<F> {
    /// Fails with `NotSupported` when the flash pages exceed [`MAX_PAGE_SIZE`]
    pub fn new(flash: F) -> BspResult<Self> {
        let page_size = flash.page_size();
        let granularity = flash.program_granularity();
        if page_size > MAX_PAGE_SIZE || granularity == 0 || page_size % granularity != 0 {
            return Err(BspError::NotSupported);
        }
        Ok(Self {
            flash,
            page: [ERASED; MAX_PAGE_SIZE],
        })
    }

    pub fn release(self) -> F {
        self.flash
    }

    fn check_range(&self, offset: u32, len: usize) -> BspResult<()> {
        let end = (offset as usize)
            .checked_add(len)
            .ok_or(BspError::InvalidParameter)?;
        if end > self.flash.capacity() {
            return Err(BspError::InvalidParameter);
        }
        Ok(())
    }

    /// Write `data` at `offset`, preserving every other byte of the pages
    /// it touches
    pub fn rewrite(&mut self, offset: u32, data: &[u8]) -> BspResult<RewriteStats> {
        self.check_range(offset, data.len())?;
        let page_size = self.flash.page_size();
        let mut stats = RewriteStats::default();

        let mut pos = offset as usize;
        let mut rest = data;
        while !rest.is_empty() {
            let page = pos / page_size;
            let start = pos % page_size;
            let n = rest.len().min(page_size - start);
            let page_base = (page * page_size) as u32;

            let buf = &mut self.page[..page_size];
            self.flash.read(page_base, buf)?;

            if buf[start..start + n] == rest[..n] {
                stats.pages_skipped += 1;
            } else {
                buf[start..start + n].copy_from_slice(&rest[..n]);
                self.flash.erase_page(page)?;
                self.program_page(page_base)?;
                stats.pages_written += 1;
            }

            pos += n;
            rest = &rest[n..];
        }
        Ok(stats)
    }

    /// Program the buffered page at `page_base` and read it back
    fn program_page(&mut self, page_base: u32) -> BspResult<()> {
        let page_size = self.flash.page_size();
        let unit = self.flash.program_granularity();

        for (i, chunk) in self.page[..page_size].chunks(unit).enumerate() {
            // Erased double-words need no programming
            if chunk.iter().all(|&b| b == ERASED) {
                continue;
            }
            self.flash.program(page_base + (i * unit) as u32, chunk)?;
        }

        let mut check = [0u8; 64];
        for (i, expected) in self.page[..page_size].chunks(check.len()).enumerate() {
            let got = &mut check[..expected.len()];
            self.flash.read(page_base + (i * 64) as u32, got)?;
            if got != expected {
                return Err(BspError::Error);
            }
        }
        Ok(())
    }

    /// Erase every page overlapping `offset..offset + len`
    ///
    /// Returns the number of pages erased.
    pub fn erase_range(&mut self, offset: u32, len: usize) -> BspResult<usize> {
        self.check_range(offset, len)?;
        if len == 0 {
            return Ok(0);
        }
        let page_size = self.flash.page_size();
        let first = offset as usize / page_size;
        let last = (offset as usize + len - 1) / page_size;
        for page in first..=last {
            self.flash.erase_page(page)?;
        }
        Ok(last - first + 1)
    }

    /// Plain read through to the flash
    pub fn read(&mut self, offset: u32, buf: &mut [u8]) -> BspResult<()> {
        self.check_range(offset, buf.len())?;
        Ok(self.flash.read(offset, buf)?)
    }
}

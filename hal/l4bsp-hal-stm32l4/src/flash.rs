//! Internal flash for STM32L4
//!
//! Two views of the same flash:
//!
//! - [`L4FlashStorage`]: wear-leveled key-value storage (sequential-storage)
//!   in the pages at the end of flash
//! - [`L4PageFlash`]: raw page access to a window of flash for the
//!   read-modify-write helper
//!
//! embassy-stm32 only offers blocking flash on L4, so the async storage
//! wraps it with embassy-embedded-hal's `BlockingAsync` adapter.

use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_stm32::flash::{Blocking, Flash};
use embedded_storage::nor_flash::NorFlash as BlockingNorFlash;
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

// Re-export shared types from l4bsp-hal
pub use l4bsp_hal::flash::{FlashError, StorageKey};
use l4bsp_hal::flash::PageFlash;

/// STM32L4R9 flash: 2MB, dual-bank with 4KB pages
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
pub const FLASH_PAGE_SIZE: usize = 4 * 1024;

/// The last 4 pages hold the key-value store
pub const CONFIG_PARTITION_SIZE: usize = 4 * FLASH_PAGE_SIZE;
pub const CONFIG_PARTITION_START: usize = FLASH_SIZE - CONFIG_PARTITION_SIZE;

/// Flash range for the config partition
pub const CONFIG_RANGE: core::ops::Range<u32> =
    (CONFIG_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// Largest value stored under one key
pub const MAX_ITEM_SIZE: usize = 512;

/// Async flash as seen by sequential-storage
pub type AsyncFlash<'d> = BlockingAsync<Flash<'d, Blocking>>;

/// Key-value storage in a flash range
pub struct L4FlashStorage<F> {
    flash: F,
    range: core::ops::Range<u32>,
}

impl<'d> L4FlashStorage<AsyncFlash<'d>> {
    /// Storage in [`CONFIG_RANGE`] of the on-chip flash
    pub fn new(flash: Flash<'d, Blocking>) -> Self {
        Self::with_range(BlockingAsync::new(flash), CONFIG_RANGE)
    }
}

impl<F: NorFlash> L4FlashStorage<F> {
    /// Storage in `range`, which must be erase-aligned and span at least
    /// two pages
    pub fn with_range(flash: F, range: core::ops::Range<u32>) -> Self {
        Self { flash, range }
    }

    /// Get the raw flash for low-level access
    pub fn flash(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn range(&self) -> core::ops::Range<u32> {
        self.range.clone()
    }
}

impl<F: NorFlash> l4bsp_hal::FlashStorage for L4FlashStorage<F> {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        let mut data_buffer = [0u8; MAX_ITEM_SIZE + 8];

        let result = map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
        )
        .await;

        match result {
            Ok(Some(data)) => {
                let len = data.len();
                if buffer.len() < len {
                    return Err(FlashError::BufferTooSmall);
                }
                buffer[..len].copy_from_slice(data);
                Ok(len)
            }
            Ok(None) => Err(FlashError::NotFound),
            Err(sequential_storage::Error::Corrupted { .. }) => Err(FlashError::Corrupted),
            Err(_) => Err(FlashError::Storage),
        }
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        if data.len() > MAX_ITEM_SIZE {
            return Err(FlashError::BufferTooSmall);
        }
        let mut data_buffer = [0u8; MAX_ITEM_SIZE + 8];

        map::store_item(
            &mut self.flash,
            self.range.clone(),
            &mut NoCache::new(),
            &mut data_buffer,
            &key,
            &data,
        )
        .await
        .map_err(|e| match e {
            sequential_storage::Error::FullStorage => FlashError::Full,
            sequential_storage::Error::Corrupted { .. } => FlashError::Corrupted,
            _ => FlashError::Storage,
        })
    }

    async fn exists(&mut self, key: StorageKey) -> bool {
        let mut data_buffer = [0u8; MAX_ITEM_SIZE + 8];

        matches!(
            map::fetch_item::<StorageKey, &[u8], _>(
                &mut self.flash,
                self.range.clone(),
                &mut NoCache::new(),
                &mut data_buffer,
                &key,
            )
            .await,
            Ok(Some(_))
        )
    }

    async fn erase_all(&mut self) -> Result<(), FlashError> {
        self.flash
            .erase(self.range.start, self.range.end)
            .await
            .map_err(|_| FlashError::Flash)
    }
}

/// Page-granular window of a blocking NOR flash
///
/// Offsets passed through [`PageFlash`] are relative to the window base.
pub struct L4PageFlash<F> {
    flash: F,
    base: u32,
    page_size: usize,
    page_count: usize,
}

impl<F: BlockingNorFlash> L4PageFlash<F> {
    /// Window of `page_count` pages of `page_size` bytes starting at `base`
    ///
    /// Fails with `OutOfBounds` when the window leaves the flash or is not
    /// aligned to its erase size.
    pub fn new(flash: F, base: u32, page_size: usize, page_count: usize) -> Result<Self, FlashError> {
        let end = (base as usize)
            .checked_add(page_size * page_count)
            .ok_or(FlashError::OutOfBounds)?;
        if end > flash.capacity()
            || page_size % F::ERASE_SIZE != 0
            || base as usize % F::ERASE_SIZE != 0
        {
            return Err(FlashError::OutOfBounds);
        }
        Ok(Self {
            flash,
            base,
            page_size,
            page_count,
        })
    }

    pub fn release(self) -> F {
        self.flash
    }

    fn absolute(&self, offset: u32, len: usize) -> Result<u32, FlashError> {
        let end = (offset as usize)
            .checked_add(len)
            .ok_or(FlashError::OutOfBounds)?;
        if end > self.page_size * self.page_count {
            return Err(FlashError::OutOfBounds);
        }
        Ok(self.base + offset)
    }
}

impl<'d> L4PageFlash<Flash<'d, Blocking>> {
    /// Hand the flash over to key-value storage in `range`
    pub fn into_storage(self, range: core::ops::Range<u32>) -> L4FlashStorage<AsyncFlash<'d>> {
        L4FlashStorage::with_range(BlockingAsync::new(self.flash), range)
    }
}

impl<F: BlockingNorFlash> PageFlash for L4PageFlash<F> {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn program_granularity(&self) -> usize {
        F::WRITE_SIZE
    }

    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        let addr = self.absolute(offset, buf.len())?;
        self.flash.read(addr, buf).map_err(|_| FlashError::Flash)
    }

    fn erase_page(&mut self, page: usize) -> Result<(), FlashError> {
        if page >= self.page_count {
            return Err(FlashError::OutOfBounds);
        }
        let start = self.base + (page * self.page_size) as u32;
        self.flash
            .erase(start, start + self.page_size as u32)
            .map_err(|_| FlashError::Flash)
    }

    fn program(&mut self, offset: u32, data: &[u8]) -> Result<(), FlashError> {
        let addr = self.absolute(offset, data.len())?;
        if addr as usize % F::WRITE_SIZE != 0 || data.len() % F::WRITE_SIZE != 0 {
            return Err(FlashError::OutOfBounds);
        }
        self.flash.write(addr, data).map_err(|_| FlashError::Flash)
    }
}

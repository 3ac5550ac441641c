//! Flash abstractions
//!
//! Two views of the internal flash:
//! - [`FlashStorage`]: wear-leveled key-value storage for board settings
//!   (the touchscreen calibration record).
//! - [`PageFlash`]: raw page erase/program used by the page-rewrite helper.

/// Storage keys for persisted board data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StorageKey {
    /// Touchscreen calibration record (postcard)
    TouchCalibration = 1,
}

impl StorageKey {
    /// Get the key as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a key from a byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(StorageKey::TouchCalibration),
            _ => None,
        }
    }
}

/// Errors from flash operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Flash controller reported an error (PGSERR, WRPERR, ...)
    Flash,
    /// Storage layer failed
    Storage,
    /// Key not found
    NotFound,
    /// Buffer too small for the data
    BufferTooSmall,
    /// Data corrupted or invalid
    Corrupted,
    /// Storage is full
    Full,
    /// Address or length outside the flash, or misaligned
    OutOfBounds,
}

/// Flash storage trait
///
/// Wear-leveled key-value storage. Implementations handle wear leveling
/// and integrity.
pub trait FlashStorage {
    /// Read a value by key into the provided buffer
    ///
    /// Returns the number of bytes read.
    fn read(
        &mut self,
        key: StorageKey,
        buffer: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, FlashError>>;

    /// Write a value by key
    fn write(
        &mut self,
        key: StorageKey,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<(), FlashError>>;

    /// Check if a key exists in storage
    fn exists(&mut self, key: StorageKey) -> impl core::future::Future<Output = bool>;

    /// Erase the whole storage partition
    fn erase_all(&mut self) -> impl core::future::Future<Output = Result<(), FlashError>>;
}

/// Page-granular internal flash
///
/// Offsets are relative to the start of the flash bank. Programming must be
/// done in units of [`PageFlash::program_granularity`] on erased memory.
pub trait PageFlash {
    /// Size of one erasable page in bytes
    fn page_size(&self) -> usize;

    /// Number of pages
    fn page_count(&self) -> usize;

    /// Minimum programming unit in bytes (8 on STM32L4: one double-word)
    fn program_granularity(&self) -> usize {
        8
    }

    /// Total size in bytes
    fn capacity(&self) -> usize {
        self.page_size() * self.page_count()
    }

    /// Read bytes starting at `offset`
    fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), FlashError>;

    /// Erase one page
    fn erase_page(&mut self, page: usize) -> Result<(), FlashError>;

    /// Program `data` at `offset`
    ///
    /// `offset` and `data.len()` must be multiples of the program granularity.
    fn program(&mut self, offset: u32, data: &[u8]) -> Result<(), FlashError>;
}

// Implement the sequential-storage Key trait when the feature is enabled
#[cfg(feature = "sequential-storage")]
impl sequential_storage::map::Key for StorageKey {
    fn serialize_into(
        &self,
        buffer: &mut [u8],
    ) -> Result<usize, sequential_storage::map::SerializationError> {
        if buffer.is_empty() {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        buffer[0] = self.as_u8();
        Ok(1)
    }

    fn deserialize_from(
        buffer: &[u8],
    ) -> Result<(Self, usize), sequential_storage::map::SerializationError> {
        if buffer.is_empty() {
            return Err(sequential_storage::map::SerializationError::BufferTooSmall);
        }
        match StorageKey::from_u8(buffer[0]) {
            Some(key) => Ok((key, 1)),
            None => Err(sequential_storage::map::SerializationError::InvalidFormat),
        }
    }
}

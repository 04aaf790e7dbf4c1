//! Storage configuration.

use super::error::StorageError;
use super::page::{PAGE_HEADER_SIZE, PAGE_SIZE};

/// Smallest supported page size.
pub const MIN_PAGE_SIZE: usize = 128;

/// Largest supported page size.
///
/// Slot offsets and the free-space-start counter are stored as `u16`, so a
/// page must stay addressable with 16-bit offsets.
pub const MAX_PAGE_SIZE: usize = 32 * 1024;

/// Configuration shared by the page stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageConfig {
    /// Size of every page in bytes.
    pub page_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
        }
    }
}

impl StorageConfig {
    /// Creates a configuration with the given page size.
    pub fn with_page_size(page_size: usize) -> Self {
        Self { page_size }
    }

    /// Checks that the page size is usable by the heap page layout.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPageSize` when the size is outside
    /// `MIN_PAGE_SIZE..=MAX_PAGE_SIZE` or not a multiple of the header size.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.page_size < MIN_PAGE_SIZE
            || self.page_size > MAX_PAGE_SIZE
            || self.page_size % PAGE_HEADER_SIZE != 0
        {
            return Err(StorageError::InvalidPageSize(self.page_size));
        }
        Ok(())
    }
}

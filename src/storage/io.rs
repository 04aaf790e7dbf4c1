//! Page I/O backend implementations.
//!
//! This module provides the `Storage` trait for page-based I/O operations,
//! along with MemoryStorage and FileStorage implementations.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use super::page::PageId;
use crate::storage::error::StorageError;

/// Page I/O backend trait for page-based storage.
///
/// Reads and writes fixed-size pages using caller-owned buffers.
/// Implementations include:
/// - `io::MemoryStorage`: In-memory storage
/// - `io::FileStorage`: Disk-backed storage using tokio::fs
///
/// The store performs no caching and never interprets page contents.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Sync + Send). Page-level mutual
/// exclusion is the caller's responsibility; the heap file latches pages
/// before mutating them.
pub trait Storage: Send + Sync {
    /// Returns the fixed page size of this store in bytes.
    fn page_size(&self) -> usize;

    /// Reads a page into caller-provided buffer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PageNotFound` if the page has not been allocated
    /// or has been released.
    /// Returns `StorageError::InvalidBufferSize` if `buf.len() != page_size()`.
    fn read_page(
        &self,
        page_id: PageId,
        buf: &mut [u8],
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Writes a page from caller-provided buffer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::PageNotFound` if the page has not been allocated.
    /// Returns `StorageError::InvalidBufferSize` if `buf.len() != page_size()`.
    fn write_page(
        &self,
        page_id: PageId,
        buf: &[u8],
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Allocates a new zeroed page and returns its PageId.
    ///
    /// The first call on an empty store returns `PageId(0)`; later ids grow
    /// monotonically.
    fn allocate_page(
        &self,
    ) -> impl std::future::Future<Output = Result<PageId, StorageError>> + Send;

    /// Returns the number of page ids handed out so far, released pages
    /// included.
    fn page_count(&self) -> impl std::future::Future<Output = u64> + Send;

    /// Syncs all pending writes to physical disk (fsync).
    ///
    /// For io::MemoryStorage, this only counts the call.
    fn sync_all(&self) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;
}

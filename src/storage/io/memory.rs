//! In-memory page storage implementation.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::Storage;
use crate::storage::config::StorageConfig;
use crate::storage::error::StorageError;
use crate::storage::page::{PageData, PageId};

/// In-memory page storage for testing and development.
///
/// Stores pages in a Vec backed by aligned memory allocations. PageIds are
/// assigned sequentially as Vec indices. A released page leaves a hole that
/// reports `PageNotFound`, which models a store with missing pages.
pub struct MemoryStorage {
    page_size: usize,
    pages: Mutex<Vec<Option<PageData>>>,
    sync_count: AtomicU64,
}

impl MemoryStorage {
    /// Creates a new empty in-memory storage with the default page size.
    pub fn new() -> Self {
        Self {
            page_size: StorageConfig::default().page_size,
            pages: Mutex::new(Vec::new()),
            sync_count: AtomicU64::new(0),
        }
    }

    /// Creates a new empty in-memory storage with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPageSize` if the configuration is invalid.
    pub fn with_config(config: StorageConfig) -> Result<Self, StorageError> {
        config.validate()?;
        Ok(Self {
            page_size: config.page_size,
            pages: Mutex::new(Vec::new()),
            sync_count: AtomicU64::new(0),
        })
    }

    /// Drops a page's contents. Later reads and writes report `PageNotFound`.
    ///
    /// Returns false if the page did not exist.
    pub fn release_page(&self, page_id: PageId) -> bool {
        let mut pages = self.pages.lock();
        match pages.get_mut(page_id.page_num() as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Returns how many times `sync_all` has been called.
    pub fn sync_count(&self) -> u64 {
        self.sync_count.load(Ordering::Acquire)
    }

    fn check_buffer(&self, len: usize) -> Result<(), StorageError> {
        if len != self.page_size {
            return Err(StorageError::InvalidBufferSize {
                expected: self.page_size,
                actual: len,
            });
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        self.check_buffer(buf.len())?;

        let pages = self.pages.lock();
        let page = pages
            .get(page_id.page_num() as usize)
            .and_then(Option::as_ref)
            .ok_or(StorageError::PageNotFound(page_id))?;

        buf.copy_from_slice(page.as_slice());
        Ok(())
    }

    async fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError> {
        self.check_buffer(buf.len())?;

        let mut pages = self.pages.lock();
        let page = pages
            .get_mut(page_id.page_num() as usize)
            .and_then(Option::as_mut)
            .ok_or(StorageError::PageNotFound(page_id))?;

        page.as_mut_slice().copy_from_slice(buf);
        Ok(())
    }

    async fn allocate_page(&self) -> Result<PageId, StorageError> {
        let mut pages = self.pages.lock();
        let page_id = PageId::new(pages.len() as u64);
        pages.push(Some(PageData::new(self.page_size)));
        Ok(page_id)
    }

    async fn page_count(&self) -> u64 {
        self.pages.lock().len() as u64
    }

    async fn sync_all(&self) -> Result<(), StorageError> {
        self.sync_count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests as generic;
    use super::*;

    #[tokio::test]
    async fn test_basic_operations() {
        generic::test_basic_operations(MemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        generic::test_concurrent_access(MemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn test_buffer_size_validation() {
        generic::test_buffer_size_validation(MemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn test_page_not_found() {
        generic::test_page_not_found(MemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn test_custom_page_size() {
        let storage = MemoryStorage::with_config(StorageConfig::with_page_size(512)).unwrap();
        assert_eq!(storage.page_size(), 512);
        generic::test_basic_operations(storage).await;
    }

    #[test]
    fn test_invalid_page_size() {
        let result = MemoryStorage::with_config(StorageConfig::with_page_size(100));
        assert!(matches!(result, Err(StorageError::InvalidPageSize(100))));
    }

    #[tokio::test]
    async fn test_release_page_leaves_hole() {
        let storage = MemoryStorage::new();
        let id0 = generic::allocate_and_write(&storage, 1).await;
        let id1 = generic::allocate_and_write(&storage, 2).await;

        assert!(storage.release_page(id0));
        assert!(!storage.release_page(id0));
        assert!(!storage.release_page(PageId::new(10)));

        let mut buf = vec![0u8; storage.page_size()];
        assert!(matches!(
            storage.read_page(id0, &mut buf).await,
            Err(StorageError::PageNotFound(_))
        ));
        generic::verify_test_data(&storage, id1, 2).await;
        assert_eq!(storage.page_count().await, 2);
    }

    #[tokio::test]
    async fn test_sync_count() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.sync_count(), 0);
        storage.sync_all().await.unwrap();
        storage.sync_all().await.unwrap();
        assert_eq!(storage.sync_count(), 2);
    }
}

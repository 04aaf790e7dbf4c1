//! Single-file page store.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::{Mutex, MutexGuard};

use super::Storage;
use crate::storage::config::StorageConfig;
use crate::storage::error::StorageError;
use crate::storage::page::PageId;

/// Page store backed by one file.
///
/// Page `n` occupies bytes `[n * page_size, (n + 1) * page_size)`; the file
/// length is always a whole number of pages. Seek and transfer happen under
/// one async mutex so two tasks never interleave on the file cursor.
///
/// Nothing is durable before [`sync_all`](Storage::sync_all).
pub struct FileStorage {
    path: PathBuf,
    page_size: usize,
    file: Mutex<File>,
    page_count: AtomicU64,
}

impl FileStorage {
    /// Opens or creates `path` with the default page size.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Corrupted` if an existing file holds a partial
    /// page.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Self::open_with_config(path, StorageConfig::default()).await
    }

    /// Opens or creates `path` with the configured page size. The page count
    /// of an existing file is its length divided by the page size.
    pub async fn open_with_config(
        path: impl Into<PathBuf>,
        config: StorageConfig,
    ) -> Result<Self, StorageError> {
        config.validate()?;
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;

        let len = file.metadata().await?.len();
        let page_size = config.page_size as u64;
        if len % page_size != 0 {
            return Err(StorageError::Corrupted(format!(
                "{} is {} bytes, not a whole number of {}-byte pages",
                path.display(),
                len,
                page_size
            )));
        }

        Ok(Self {
            path,
            page_size: config.page_size,
            file: Mutex::new(file),
            page_count: AtomicU64::new(len / page_size),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Locks the file and moves its cursor to the start of `page_id`.
    async fn locate(
        &self,
        page_id: PageId,
        len: usize,
    ) -> Result<MutexGuard<'_, File>, StorageError> {
        if len != self.page_size {
            return Err(StorageError::InvalidBufferSize {
                expected: self.page_size,
                actual: len,
            });
        }
        if page_id.page_num() >= self.page_count.load(Ordering::Acquire) {
            return Err(StorageError::PageNotFound(page_id));
        }

        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(page_id.byte_offset(self.page_size)))
            .await?;
        Ok(file)
    }
}

impl Storage for FileStorage {
    fn page_size(&self) -> usize {
        self.page_size
    }

    async fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        let mut file = self.locate(page_id, buf.len()).await?;
        file.read_exact(buf).await?;
        Ok(())
    }

    async fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError> {
        let mut file = self.locate(page_id, buf.len()).await?;
        file.write_all(buf).await?;
        Ok(())
    }

    async fn allocate_page(&self) -> Result<PageId, StorageError> {
        let file = self.file.lock().await;

        // The count only moves while the file lock is held.
        let page_num = self.page_count.load(Ordering::Acquire);
        let page_id = PageId::new(page_num);
        file.set_len(page_id.byte_offset(self.page_size) + self.page_size as u64)
            .await?;
        self.page_count.store(page_num + 1, Ordering::Release);
        Ok(page_id)
    }

    async fn page_count(&self) -> u64 {
        self.page_count.load(Ordering::Acquire)
    }

    async fn sync_all(&self) -> Result<(), StorageError> {
        self.file.lock().await.sync_all().await?;
        Ok(())
    }
}

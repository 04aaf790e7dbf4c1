//! Heap file: variable-length records spread over slotted pages.
//!
//! [`HeapFile`] combines a [`Storage`] backend, the [`HeapPage`] codec and a
//! [`FreeSpaceDirectory`]. Every record is addressed by a [`RecordId`] that
//! stays valid until the record is deleted or relocated by an update.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures_util::stream::{self, Stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::directory::FreeSpaceDirectory;
use super::error::HeapError;
use super::latch::PageLatches;
use super::page::{HeapPage, RecordId, SLOT_SIZE, max_record_size};
use crate::storage::{PageId, Storage, StorageConfig, StorageError};

/// A heap of records over a page store.
///
/// All operations are async and may suspend on page I/O. Mutations latch
/// the page they touch for the whole read-modify-write cycle.
///
/// # Example
///
/// ```
/// use slotstore::heap::HeapFile;
/// use slotstore::storage::MemoryStorage;
///
/// # async fn example() -> Result<(), slotstore::heap::HeapError> {
/// let heap = HeapFile::open(MemoryStorage::new()).await?;
/// let rid = heap.write(b"hello").await?;
/// assert_eq!(&heap.read(rid).await?[..], b"hello");
/// heap.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct HeapFile<S: Storage> {
    storage: S,
    page_size: usize,
    directory: FreeSpaceDirectory,
    latches: PageLatches,
    closed: AtomicBool,
}

impl<S: Storage> HeapFile<S> {
    /// Opens a heap file over `storage`, rebuilding the free-space directory.
    ///
    /// Every page of the store is read once; pages tagged as heap pages are
    /// recorded with their free space. Pages the store reports missing are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPageSize` (wrapped) if the store's page
    /// size cannot hold the heap layout, or any other storage error.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn open(storage: S) -> Result<Self, HeapError> {
        let page_size = storage.page_size();
        StorageConfig::with_page_size(page_size).validate()?;

        let directory = FreeSpaceDirectory::new();
        let page_count = storage.page_count().await;
        let mut buf = vec![0u8; page_size];
        let mut skipped = 0usize;

        for page_num in 0..page_count {
            let page_id = PageId::new(page_num);
            match storage.read_page(page_id, &mut buf).await {
                Ok(()) => {}
                Err(StorageError::PageNotFound(_)) => {
                    debug!(page = page_num, "skipping missing page");
                    skipped += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            let page = HeapPage::new(&buf[..]);
            if page.is_heap_page() {
                directory.record(page_id, page.free_bytes());
            }
        }

        info!(
            pages = page_count,
            heap_pages = directory.len(),
            skipped,
            "heap file opened"
        );

        Ok(Self {
            storage,
            page_size,
            directory,
            latches: PageLatches::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Returns the underlying store.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the page size of the underlying store.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Largest record this heap file accepts.
    pub fn max_record_size(&self) -> usize {
        max_record_size(self.page_size)
    }

    /// Returns the free-space directory.
    pub fn free_space_directory(&self) -> &FreeSpaceDirectory {
        &self.directory
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), HeapError> {
        if self.is_closed() {
            return Err(HeapError::Closed);
        }
        Ok(())
    }

    fn new_buffer(&self) -> Vec<u8> {
        vec![0u8; self.page_size]
    }

    /// Reads a page and checks that it is a heap page.
    async fn read_heap_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), HeapError> {
        self.storage.read_page(page_id, buf).await?;
        if !HeapPage::new(&*buf).is_heap_page() {
            return Err(HeapError::NotHeapPage(page_id));
        }
        Ok(())
    }

    /// Writes a record and returns its handle.
    ///
    /// The free-space directory picks the first page with room for the
    /// record plus a slot entry; a new page is allocated when none has.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::RecordTooLarge` if the record cannot fit in an
    /// empty page, `HeapError::Closed` after close, or a storage error.
    #[tracing::instrument(level = "debug", skip_all, fields(len = data.len()))]
    pub async fn write(&self, data: &[u8]) -> Result<RecordId, HeapError> {
        self.ensure_open()?;

        let max = self.max_record_size();
        if data.len() > max {
            return Err(HeapError::RecordTooLarge {
                size: data.len(),
                max,
            });
        }

        let required = data.len() + SLOT_SIZE;
        let mut buf = self.new_buffer();

        loop {
            let Some(page_id) = self.directory.find_page(required) else {
                return self.write_to_new_page(data, &mut buf).await;
            };

            let _latch = self.latches.lock(page_id).await;
            match self.read_heap_page(page_id, &mut buf).await {
                Ok(()) => {}
                Err(e) if e.is_page_not_found() || matches!(e, HeapError::NotHeapPage(_)) => {
                    warn!(page = page_id.page_num(), error = %e, "dropping unusable page from directory");
                    self.directory.remove(page_id);
                    continue;
                }
                Err(e) => return Err(e),
            }

            let mut page = HeapPage::new(&mut buf[..]);
            if !page.can_insert(data.len()) {
                // Another writer consumed the space between lookup and latch.
                warn!(
                    page = page_id.page_num(),
                    free = page.free_bytes(),
                    required,
                    "free space changed before latch, retrying"
                );
                self.directory.record(page_id, page.free_bytes());
                continue;
            }

            let slot_id = page.insert(data)?;
            let free = page.free_bytes();
            self.storage.write_page(page_id, &buf).await?;
            self.directory.record(page_id, free);

            return Ok(RecordId::new(page_id, slot_id));
        }
    }

    async fn write_to_new_page(&self, data: &[u8], buf: &mut [u8]) -> Result<RecordId, HeapError> {
        let page_id = self.storage.allocate_page().await?;
        let _latch = self.latches.lock(page_id).await;
        debug!(page = page_id.page_num(), "allocated heap page");

        let mut page = HeapPage::new(&mut buf[..]);
        page.init();
        let slot_id = page.insert(data)?;
        let free = page.free_bytes();

        self.storage.write_page(page_id, buf).await?;
        self.directory.record(page_id, free);

        Ok(RecordId::new(page_id, slot_id))
    }

    /// Reads a record.
    ///
    /// # Errors
    ///
    /// - `HeapError::NullRecordId` for [`RecordId::NULL`]
    /// - `HeapError::SlotNotFound` if the slot is beyond the slot table
    /// - `HeapError::RecordDeleted` if the slot is tombstoned
    pub async fn read(&self, rid: RecordId) -> Result<Bytes, HeapError> {
        self.ensure_open()?;
        if rid.is_null() {
            return Err(HeapError::NullRecordId);
        }

        let mut buf = self.new_buffer();
        self.read_heap_page(rid.page_id, &mut buf).await?;

        let page = HeapPage::new(&buf[..]);
        if page.slot(rid.slot_id).is_none() {
            return Err(HeapError::SlotNotFound(rid.slot_id));
        }
        page.read(rid.slot_id)
            .map(Bytes::copy_from_slice)
            .ok_or(HeapError::RecordDeleted(rid))
    }

    /// Tombstones a record. Deleting [`RecordId::NULL`] is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::RecordDeleted` if the record is already deleted,
    /// `HeapError::SlotNotFound` for a slot beyond the slot table.
    #[tracing::instrument(level = "debug", skip_all, fields(rid = %rid))]
    pub async fn delete(&self, rid: RecordId) -> Result<(), HeapError> {
        self.ensure_open()?;
        if rid.is_null() {
            return Ok(());
        }

        let mut buf = self.new_buffer();
        let _latch = self.latches.lock(rid.page_id).await;
        self.read_heap_page(rid.page_id, &mut buf).await?;

        let mut page = HeapPage::new(&mut buf[..]);
        page.delete(rid.slot_id).map_err(|e| slot_error(e, rid))?;
        let free = page.free_bytes();

        self.storage.write_page(rid.page_id, &buf).await?;
        self.directory.record(rid.page_id, free);
        Ok(())
    }

    /// Replaces a record's contents and returns its (possibly new) handle.
    ///
    /// Data no longer than the stored record is written in place and the
    /// same handle is returned. Longer data is written like a new record
    /// while the old slot is still live, then the old slot is tombstoned; the
    /// returned handle is therefore different and the old one reads as
    /// deleted. [`RecordId::NULL`] behaves like [`write`](Self::write).
    #[tracing::instrument(level = "debug", skip_all, fields(rid = %rid, len = data.len()))]
    pub async fn update(&self, rid: RecordId, data: &[u8]) -> Result<RecordId, HeapError> {
        if rid.is_null() {
            return self.write(data).await;
        }
        self.ensure_open()?;

        let max = self.max_record_size();
        if data.len() > max {
            return Err(HeapError::RecordTooLarge {
                size: data.len(),
                max,
            });
        }

        if self.update_in_place(rid, data).await? {
            return Ok(rid);
        }

        // The old slot stays live until the new copy exists, so the write
        // cannot hand the same slot back.
        debug!(rid = %rid, "record outgrew its slot, relocating");
        let moved = self.write(data).await?;
        if let Err(e) = self.delete(rid).await {
            if let Err(undo) = self.delete(moved).await {
                warn!(rid = %moved, error = %undo, "failed to remove relocated copy");
            }
            return Err(e);
        }
        Ok(moved)
    }

    /// Overwrites a record in place if `data` is no longer than the stored
    /// record. Returns `false`, leaving the page untouched, otherwise.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::RecordDeleted` for a tombstoned record and
    /// `HeapError::SlotNotFound` for a slot beyond the slot table.
    pub async fn update_in_place(&self, rid: RecordId, data: &[u8]) -> Result<bool, HeapError> {
        self.ensure_open()?;
        if rid.is_null() {
            return Err(HeapError::NullRecordId);
        }

        let mut buf = self.new_buffer();
        let _latch = self.latches.lock(rid.page_id).await;
        self.read_heap_page(rid.page_id, &mut buf).await?;

        let mut page = HeapPage::new(&mut buf[..]);
        if !page
            .try_update(rid.slot_id, data)
            .map_err(|e| slot_error(e, rid))?
        {
            return Ok(false);
        }
        self.storage.write_page(rid.page_id, &buf).await?;
        Ok(true)
    }

    /// Compacts a page and returns the number of bytes reclaimed.
    ///
    /// Handles into the page stay valid.
    #[tracing::instrument(level = "debug", skip_all, fields(page = page_id.page_num()))]
    pub async fn compact_page(&self, page_id: PageId) -> Result<usize, HeapError> {
        self.ensure_open()?;

        let mut buf = self.new_buffer();
        let _latch = self.latches.lock(page_id).await;
        self.read_heap_page(page_id, &mut buf).await?;

        let mut page = HeapPage::new(&mut buf[..]);
        let reclaimed = page.compact();
        let free = page.free_bytes();

        if reclaimed > 0 {
            self.storage.write_page(page_id, &buf).await?;
        }
        self.directory.record(page_id, free);

        debug!(reclaimed, free, "page compacted");
        Ok(reclaimed)
    }

    /// Returns the exact free bytes of a heap page as stored.
    pub async fn page_free_bytes(&self, page_id: PageId) -> Result<usize, HeapError> {
        self.ensure_open()?;
        let mut buf = self.new_buffer();
        self.read_heap_page(page_id, &mut buf).await?;
        Ok(HeapPage::new(&buf[..]).free_bytes())
    }

    /// Reads the live records of one page in slot order.
    async fn read_live_records(&self, page_id: PageId) -> Result<Vec<(RecordId, Bytes)>, HeapError> {
        let mut buf = self.new_buffer();
        self.read_heap_page(page_id, &mut buf).await?;
        let page = HeapPage::new(&buf[..]);
        Ok(page
            .iter()
            .map(|(slot_id, data)| (RecordId::new(page_id, slot_id), Bytes::copy_from_slice(data)))
            .collect())
    }

    /// Streams every live record.
    ///
    /// The set of pages is the directory's content when the stream is
    /// created, visited in ascending page order; records come in slot order
    /// within a page. Pages that vanished from the store are skipped. The
    /// token is checked once per page and a cancelled scan ends with
    /// `HeapError::Cancelled`.
    ///
    /// The stream can be recreated at any time but not resumed.
    pub fn scan_all(
        &self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<(RecordId, Bytes), HeapError>> + Send + '_ {
        let state = ScanState {
            pages: self.directory.page_ids().into_iter(),
            pending: VecDeque::new(),
            cancel,
        };

        stream::try_unfold(state, move |mut state| async move {
            loop {
                if let Some(item) = state.pending.pop_front() {
                    return Ok(Some((item, state)));
                }
                let Some(page_id) = state.pages.next() else {
                    return Ok(None);
                };
                if state.cancel.is_cancelled() {
                    return Err(HeapError::Cancelled);
                }
                self.ensure_open()?;

                match self.read_live_records(page_id).await {
                    Ok(records) => state.pending.extend(records),
                    Err(e) if e.is_page_not_found() => {
                        debug!(page = page_id.page_num(), "page vanished during scan, skipping");
                    }
                    Err(e) => return Err(e),
                }
            }
        })
    }

    /// Flushes the store and closes the heap file.
    ///
    /// Only the first call flushes; later calls return `Ok(())`. Every other
    /// operation fails with `HeapError::Closed` afterwards.
    pub async fn close(&self) -> Result<(), HeapError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.storage.sync_all().await?;
        info!(pages = self.directory.len(), "heap file closed");
        Ok(())
    }
}

struct ScanState {
    pages: std::vec::IntoIter<PageId>,
    pending: VecDeque<(RecordId, Bytes)>,
    cancel: CancellationToken,
}

/// Lifts a slot-level codec error to the record it concerns.
fn slot_error(err: HeapError, rid: RecordId) -> HeapError {
    match err {
        HeapError::SlotDeleted(_) => HeapError::RecordDeleted(rid),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use futures_util::TryStreamExt;

    use super::*;
    use crate::heap::directory::quantize;
    use crate::storage::MemoryStorage;

    async fn create_heap() -> HeapFile<MemoryStorage> {
        HeapFile::open(MemoryStorage::new()).await.unwrap()
    }

    async fn assert_directory_accurate(heap: &HeapFile<MemoryStorage>, page_id: PageId) {
        let actual = heap.page_free_bytes(page_id).await.unwrap();
        assert_eq!(heap.free_space_directory().get(page_id), Some(quantize(actual)));
    }

    #[tokio::test]
    async fn test_hello_world_scenario() {
        let heap = create_heap().await;

        let rid = heap.write(b"hello").await.unwrap();
        assert_eq!(rid, RecordId::new(PageId::new(0), 0));
        assert_eq!(&heap.read(rid).await.unwrap()[..], b"hello");

        heap.delete(rid).await.unwrap();
        assert!(matches!(
            heap.read(rid).await,
            Err(HeapError::RecordDeleted(r)) if r == rid
        ));

        let rid2 = heap.write(b"world").await.unwrap();
        assert_eq!(rid2, rid);
        assert_eq!(&heap.read(rid2).await.unwrap()[..], b"world");
    }

    #[tokio::test]
    async fn test_null_handle() {
        let heap = create_heap().await;

        assert!(matches!(
            heap.read(RecordId::NULL).await,
            Err(HeapError::NullRecordId)
        ));
        heap.delete(RecordId::NULL).await.unwrap();

        let rid = heap.update(RecordId::NULL, b"fresh").await.unwrap();
        assert!(!rid.is_null());
        assert_eq!(&heap.read(rid).await.unwrap()[..], b"fresh");
    }

    #[tokio::test]
    async fn test_read_slot_out_of_range() {
        let heap = create_heap().await;
        let rid = heap.write(b"x").await.unwrap();

        let bogus = RecordId::new(rid.page_id, 9);
        assert!(matches!(
            heap.read(bogus).await,
            Err(HeapError::SlotNotFound(9))
        ));
        assert!(matches!(
            heap.read(RecordId::new(PageId::new(42), 0)).await,
            Err(HeapError::Storage(StorageError::PageNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_double_delete() {
        let heap = create_heap().await;
        let rid = heap.write(b"x").await.unwrap();
        heap.delete(rid).await.unwrap();
        assert!(matches!(
            heap.delete(rid).await,
            Err(HeapError::RecordDeleted(_))
        ));
    }

    #[tokio::test]
    async fn test_record_too_large() {
        let heap = create_heap().await;
        let max = heap.max_record_size();

        let rid = heap.write(&vec![1u8; max]).await.unwrap();
        assert_eq!(heap.read(rid).await.unwrap().len(), max);

        assert!(matches!(
            heap.write(&vec![1u8; max + 1]).await,
            Err(HeapError::RecordTooLarge { .. })
        ));
        // The rejected write must not allocate a page
        assert_eq!(heap.storage().page_count().await, 1);
    }

    #[tokio::test]
    async fn test_fills_pages_before_allocating() {
        let heap = create_heap().await;

        let mut rids = Vec::new();
        for i in 0..10u8 {
            rids.push(heap.write(&vec![i; 1500]).await.unwrap());
        }

        // Two 1500-byte records fit per 4096-byte page
        assert_eq!(heap.storage().page_count().await, 5);
        for (i, rid) in rids.iter().enumerate() {
            assert_eq!(rid.page_id, PageId::new(i as u64 / 2));
            assert_eq!(&heap.read(*rid).await.unwrap()[..], &vec![i as u8; 1500][..]);
        }
        for page in heap.free_space_directory().page_ids() {
            assert_directory_accurate(&heap, page).await;
        }
    }

    #[tokio::test]
    async fn test_update_in_place() {
        let heap = create_heap().await;
        let rid = heap.write(b"hello world").await.unwrap();

        let same = heap.update(rid, b"hi").await.unwrap();
        assert_eq!(same, rid);
        assert_eq!(&heap.read(rid).await.unwrap()[..], b"hi");
        assert_directory_accurate(&heap, rid.page_id).await;
    }

    #[tokio::test]
    async fn test_update_relocates() {
        let heap = create_heap().await;
        let rid = heap.write(b"hi").await.unwrap();

        let moved = heap.update(rid, b"hello world").await.unwrap();
        assert_ne!(moved, rid);
        assert!(matches!(
            heap.read(rid).await,
            Err(HeapError::RecordDeleted(_))
        ));
        assert_eq!(&heap.read(moved).await.unwrap()[..], b"hello world");
        assert_directory_accurate(&heap, moved.page_id).await;
    }

    #[tokio::test]
    async fn test_update_in_place_refuses_growth() {
        let heap = create_heap().await;
        let rid = heap.write(b"short").await.unwrap();

        assert!(!heap.update_in_place(rid, b"much longer").await.unwrap());
        assert_eq!(&heap.read(rid).await.unwrap()[..], b"short");

        assert!(heap.update_in_place(rid, b"tiny").await.unwrap());
        assert_eq!(&heap.read(rid).await.unwrap()[..], b"tiny");
        assert!(matches!(
            heap.update_in_place(RecordId::NULL, b"x").await,
            Err(HeapError::NullRecordId)
        ));
    }

    #[tokio::test]
    async fn test_update_deleted_record() {
        let heap = create_heap().await;
        let rid = heap.write(b"gone").await.unwrap();
        heap.delete(rid).await.unwrap();
        assert!(matches!(
            heap.update(rid, b"x").await,
            Err(HeapError::RecordDeleted(_))
        ));
    }

    #[tokio::test]
    async fn test_compact_page() {
        let heap = create_heap().await;
        let a = heap.write(&[1u8; 100]).await.unwrap();
        let b = heap.write(&[2u8; 200]).await.unwrap();
        let c = heap.write(&[3u8; 300]).await.unwrap();

        heap.delete(b).await.unwrap();
        assert_eq!(heap.compact_page(a.page_id).await.unwrap(), 200);
        assert_eq!(heap.compact_page(a.page_id).await.unwrap(), 0);

        assert_eq!(&heap.read(a).await.unwrap()[..], &[1u8; 100][..]);
        assert_eq!(&heap.read(c).await.unwrap()[..], &[3u8; 300][..]);
        assert_directory_accurate(&heap, a.page_id).await;
    }

    #[tokio::test]
    async fn test_scan_all() {
        let heap = create_heap().await;
        let mut expected = Vec::new();
        for i in 0..20u8 {
            let data = vec![i; 700];
            let rid = heap.write(&data).await.unwrap();
            expected.push((rid, data));
        }
        for (rid, _) in expected.iter().step_by(3) {
            heap.delete(*rid).await.unwrap();
        }
        let expected: Vec<_> = expected
            .into_iter()
            .enumerate()
            .filter(|(i, _)| i % 3 != 0)
            .map(|(_, e)| e)
            .collect();

        let scanned: Vec<(RecordId, Bytes)> = heap
            .scan_all(CancellationToken::new())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(scanned.len(), expected.len());
        for ((rid, data), (erid, edata)) in scanned.iter().zip(expected.iter()) {
            assert_eq!(rid, erid);
            assert_eq!(&data[..], &edata[..]);
        }
    }

    #[tokio::test]
    async fn test_scan_cancelled() {
        let heap = create_heap().await;
        heap.write(b"a").await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<Vec<_>, _> = heap.scan_all(cancel).try_collect().await;
        assert!(matches!(result, Err(HeapError::Cancelled)));
    }

    #[tokio::test]
    async fn test_scan_skips_missing_pages() {
        let heap = create_heap().await;
        let a = heap.write(&[1u8; 3000]).await.unwrap();
        let b = heap.write(&[2u8; 3000]).await.unwrap();
        assert_ne!(a.page_id, b.page_id);

        heap.storage().release_page(a.page_id);

        let scanned: Vec<_> = heap
            .scan_all(CancellationToken::new())
            .try_collect()
            .await
            .unwrap();
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].0, b);
    }

    #[tokio::test]
    async fn test_write_drops_missing_page_from_directory() {
        let heap = create_heap().await;
        let a = heap.write(b"first").await.unwrap();
        heap.storage().release_page(a.page_id);

        let b = heap.write(b"second").await.unwrap();
        assert_ne!(b.page_id, a.page_id);
        assert_eq!(heap.free_space_directory().get(a.page_id), None);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let heap = create_heap().await;
        let rid = heap.write(b"data").await.unwrap();

        heap.close().await.unwrap();
        heap.close().await.unwrap();
        assert_eq!(heap.storage().sync_count(), 1);
        assert!(heap.is_closed());

        assert!(matches!(heap.read(rid).await, Err(HeapError::Closed)));
        assert!(matches!(heap.write(b"x").await, Err(HeapError::Closed)));
        assert!(matches!(heap.delete(rid).await, Err(HeapError::Closed)));
        assert!(matches!(heap.update(rid, b"y").await, Err(HeapError::Closed)));
        assert!(matches!(
            heap.compact_page(rid.page_id).await,
            Err(HeapError::Closed)
        ));
        let scan: Result<Vec<_>, _> = heap
            .scan_all(CancellationToken::new())
            .try_collect()
            .await;
        assert!(matches!(scan, Err(HeapError::Closed)));
    }

    #[tokio::test]
    async fn test_open_rebuilds_directory() {
        let storage = MemoryStorage::new();

        // A non-heap page that must be ignored
        let foreign = storage.allocate_page().await.unwrap();
        let mut buf = vec![0u8; storage.page_size()];
        buf[12] = 0x02;
        storage.write_page(foreign, &buf).await.unwrap();

        let heap = HeapFile::open(storage).await.unwrap();
        let rid = heap.write(b"persisted").await.unwrap();
        assert_eq!(rid.page_id, PageId::new(1));

        let storage = heap.storage;
        let reopened = HeapFile::open(storage).await.unwrap();
        assert_eq!(reopened.free_space_directory().page_ids(), vec![PageId::new(1)]);
        assert_directory_accurate(&reopened, PageId::new(1)).await;
        assert_eq!(&reopened.read(rid).await.unwrap()[..], b"persisted");
        assert!(matches!(
            reopened.read(RecordId::new(foreign, 0)).await,
            Err(HeapError::NotHeapPage(_))
        ));
    }

    #[tokio::test]
    async fn test_open_skips_missing_pages() {
        let heap = create_heap().await;
        let mut rids = Vec::new();
        for i in 0..3u8 {
            rids.push(heap.write(&[i; 3000]).await.unwrap());
        }
        let released = rids[1].page_id;
        assert!(heap.storage().release_page(released));

        let reopened = HeapFile::open(heap.storage).await.unwrap();
        let mut page_ids = reopened.free_space_directory().page_ids();
        page_ids.sort();
        assert_eq!(page_ids, vec![rids[0].page_id, rids[2].page_id]);
        for rid in [rids[0], rids[2]] {
            assert_directory_accurate(&reopened, rid.page_id).await;
        }
        assert_eq!(&reopened.read(rids[2]).await.unwrap()[..], &[2u8; 3000][..]);
    }
}

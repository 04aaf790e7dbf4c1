//! Heap page implementation using slotted page structure.
//!
//! A heap page manages variable-length records within one fixed-size page.
//! The page layout consists of:
//!
//! ```text
//! +------------------+ offset 0
//! | PageHeader (32B) |
//! +------------------+ offset 32
//! | Slot Array       | (5 bytes per slot, grows toward the end)
//! +------------------+
//! | Free Space       |
//! +------------------+ page_size - free_space_start
//! | Records          | (grows toward the header)
//! +------------------+ page_size
//! ```
//!
//! Records are written from the end of the page backward while the slot
//! array grows forward from the header, so both allocators converge on the
//! free space in the middle.

use std::cmp::Ordering;
use std::fmt;

use super::error::HeapError;
use crate::storage::{PAGE_HEADER_SIZE, PageHeader, PageId};

/// Size of each slot entry in bytes.
pub const SLOT_SIZE: usize = 5;

/// Slot flag for a live record.
pub const SLOT_LIVE: u8 = 0;

/// Slot flag for a tombstoned record.
pub const SLOT_DELETED: u8 = 1;

/// Slot identifier within a page.
pub type SlotId = u16;

/// Largest record a freshly initialized page of `page_size` bytes accepts.
pub const fn max_record_size(page_size: usize) -> usize {
    page_size - PAGE_HEADER_SIZE - SLOT_SIZE
}

/// A slot entry in the slot array.
///
/// Layout (5 bytes):
/// - `offset`: u16 LE, start of the record from the beginning of the page
/// - `length`: u16 LE, record length
/// - `flag`: u8, `SLOT_LIVE` or `SLOT_DELETED`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotEntry {
    /// Offset to record data from start of page.
    pub offset: u16,
    /// Length of record in bytes.
    pub length: u16,
    /// Live/deleted flag.
    pub flag: u8,
}

impl SlotEntry {
    /// Creates a slot entry for a live record.
    pub const fn live(offset: u16, length: u16) -> Self {
        Self {
            offset,
            length,
            flag: SLOT_LIVE,
        }
    }

    /// Returns true if this slot is tombstoned.
    pub fn is_deleted(&self) -> bool {
        self.flag == SLOT_DELETED
    }

    /// Reads a slot entry from bytes.
    pub fn read_from(data: &[u8]) -> Self {
        Self {
            offset: u16::from_le_bytes([data[0], data[1]]),
            length: u16::from_le_bytes([data[2], data[3]]),
            flag: data[4],
        }
    }

    /// Writes a slot entry to bytes.
    pub fn write_to(&self, data: &mut [u8]) {
        data[0..2].copy_from_slice(&self.offset.to_le_bytes());
        data[2..4].copy_from_slice(&self.length.to_le_bytes());
        data[4] = self.flag;
    }
}

/// Stable address of a record: page plus slot.
///
/// Ordered by `(page_id, slot_id)`. [`RecordId::NULL`] sorts before every
/// other handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    /// Page containing the record.
    pub page_id: PageId,
    /// Slot within the page.
    pub slot_id: SlotId,
}

impl RecordId {
    /// The handle that references no record.
    pub const NULL: RecordId = RecordId {
        page_id: PageId::INVALID,
        slot_id: 0,
    };

    /// Creates a new record identifier.
    pub const fn new(page_id: PageId, slot_id: SlotId) -> Self {
        Self { page_id, slot_id }
    }

    /// Returns true for [`RecordId::NULL`].
    pub fn is_null(&self) -> bool {
        self.page_id == PageId::INVALID
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::NULL
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .is_null()
            .cmp(&self.is_null())
            .then_with(|| self.page_id.cmp(&other.page_id))
            .then_with(|| self.slot_id.cmp(&other.slot_id))
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "(null)")
        } else {
            write!(f, "({}, {})", self.page_id.page_num(), self.slot_id)
        }
    }
}

/// A slotted heap page view over a page buffer.
///
/// The type parameter `T` allows this to wrap:
/// - `&[u8]` - read-only view
/// - `&mut [u8]` - mutable view
/// - `Vec<u8>` - owned data
///
/// The page size is the buffer length.
///
/// # Example
///
/// ```
/// use slotstore::heap::HeapPage;
///
/// let mut data = vec![0u8; 4096];
/// let mut page = HeapPage::new(&mut data[..]);
/// page.init();
///
/// let slot_id = page.insert(b"hello world").unwrap();
/// assert_eq!(page.read(slot_id), Some(b"hello world".as_slice()));
/// ```
pub struct HeapPage<T> {
    data: T,
}

// Read-only methods (available for any T: AsRef<[u8]>)
impl<T: AsRef<[u8]>> HeapPage<T> {
    /// Creates a heap page view over the given data.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is too small to hold the header and one slot.
    pub fn new(data: T) -> Self {
        let len = data.as_ref().len();
        assert!(
            len > PAGE_HEADER_SIZE + SLOT_SIZE && len <= u16::MAX as usize,
            "HeapPage requires between {} and {} bytes, got {}",
            PAGE_HEADER_SIZE + SLOT_SIZE + 1,
            u16::MAX,
            len
        );
        Self { data }
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// Returns the page size.
    pub fn page_size(&self) -> usize {
        self.data().len()
    }

    /// Returns the page header.
    pub fn header(&self) -> PageHeader {
        PageHeader::read_from(&self.data()[..PAGE_HEADER_SIZE])
    }

    /// Returns true if the header carries the heap page tag.
    pub fn is_heap_page(&self) -> bool {
        self.header().is_heap_page()
    }

    /// Number of slots, tombstones included.
    pub fn slot_count(&self) -> u16 {
        self.header().slot_count
    }

    /// Number of live records.
    pub fn live_count(&self) -> u16 {
        self.header().live_count
    }

    /// Returns the slot entry, or `None` beyond the slot table.
    pub fn slot(&self, slot_id: SlotId) -> Option<SlotEntry> {
        if slot_id >= self.slot_count() {
            return None;
        }
        Some(self.get_slot(slot_id))
    }

    fn get_slot(&self, slot_id: SlotId) -> SlotEntry {
        let offset = PAGE_HEADER_SIZE + (slot_id as usize) * SLOT_SIZE;
        SlotEntry::read_from(&self.data()[offset..offset + SLOT_SIZE])
    }

    /// Bytes between the end of the slot table and the start of the record
    /// area.
    pub fn free_bytes(&self) -> usize {
        let header = self.header();
        (self.page_size() - PAGE_HEADER_SIZE)
            .saturating_sub(header.free_space_start as usize)
            .saturating_sub(header.slot_count as usize * SLOT_SIZE)
    }

    /// Returns the first tombstoned slot, scanning from slot 0.
    pub fn first_deleted_slot(&self) -> Option<SlotId> {
        (0..self.slot_count()).find(|&slot_id| self.get_slot(slot_id).is_deleted())
    }

    /// Checks if a record of given size can be inserted.
    pub fn can_insert(&self, record_size: usize) -> bool {
        record_size + self.slot_overhead() <= self.free_bytes()
    }

    fn slot_overhead(&self) -> usize {
        if self.first_deleted_slot().is_some() {
            0
        } else {
            SLOT_SIZE
        }
    }

    /// Reads a record by slot ID.
    ///
    /// Returns `None` if the slot is out of bounds or tombstoned.
    pub fn read(&self, slot_id: SlotId) -> Option<&[u8]> {
        let slot = self.slot(slot_id)?;
        if slot.is_deleted() {
            return None;
        }
        let start = slot.offset as usize;
        Some(&self.data()[start..start + slot.length as usize])
    }

    /// Returns an iterator over all live records in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &[u8])> {
        (0..self.slot_count())
            .filter_map(move |slot_id| self.read(slot_id).map(|data| (slot_id, data)))
    }

    /// Returns the fragmentation ratio (0.0 = none, 1.0 = all garbage).
    ///
    /// Fragmentation is the share of the record area not referenced by a
    /// live slot.
    pub fn fragmentation(&self) -> f32 {
        let total = self.header().free_space_start as usize;
        if total == 0 {
            return 0.0;
        }
        let used: usize = self.iter().map(|(_, data)| data.len()).sum();
        total.saturating_sub(used) as f32 / total as f32
    }
}

// Mutable methods (available for T: AsRef<[u8]> + AsMut<[u8]>)
impl<T: AsRef<[u8]> + AsMut<[u8]>> HeapPage<T> {
    fn data_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }

    /// Initializes this page as an empty heap page.
    ///
    /// This zeroes the page and writes an empty heap page header.
    pub fn init(&mut self) {
        self.data_mut().fill(0);
        PageHeader::new_heap_page().write_to(&mut self.data_mut()[..PAGE_HEADER_SIZE]);
    }

    fn set_header(&mut self, header: &PageHeader) {
        header.write_to(&mut self.data_mut()[..PAGE_HEADER_SIZE]);
    }

    fn set_slot(&mut self, slot_id: SlotId, entry: &SlotEntry) {
        let offset = PAGE_HEADER_SIZE + (slot_id as usize) * SLOT_SIZE;
        entry.write_to(&mut self.data_mut()[offset..offset + SLOT_SIZE]);
    }

    /// Inserts a record and returns its slot ID.
    ///
    /// The first tombstoned slot is reused if there is one; otherwise a new
    /// slot is appended.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::PageFull` if there is not enough space.
    pub fn insert(&mut self, record_data: &[u8]) -> Result<SlotId, HeapError> {
        let record_size = record_data.len();
        let reuse = self.first_deleted_slot();
        let required = record_size + if reuse.is_some() { 0 } else { SLOT_SIZE };
        let available = self.free_bytes();
        if required > available {
            return Err(HeapError::PageFull {
                required,
                available,
            });
        }

        let mut header = self.header();
        let slot_id = match reuse {
            Some(slot_id) => slot_id,
            None => {
                header.slot_count += 1;
                header.slot_count - 1
            }
        };

        header.free_space_start += record_size as u16;
        header.live_count += 1;
        let start = self.page_size() - header.free_space_start as usize;
        self.data_mut()[start..start + record_size].copy_from_slice(record_data);

        self.set_slot(slot_id, &SlotEntry::live(start as u16, record_size as u16));
        self.set_header(&header);

        Ok(slot_id)
    }

    /// Tombstones a record.
    ///
    /// The record bytes stay in place until the slot is reused or the page
    /// is compacted.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::SlotNotFound` beyond the slot table and
    /// `HeapError::SlotDeleted` for an existing tombstone.
    pub fn delete(&mut self, slot_id: SlotId) -> Result<(), HeapError> {
        let mut slot = self.slot(slot_id).ok_or(HeapError::SlotNotFound(slot_id))?;
        if slot.is_deleted() {
            return Err(HeapError::SlotDeleted(slot_id));
        }

        slot.flag = SLOT_DELETED;
        self.set_slot(slot_id, &slot);

        let mut header = self.header();
        header.live_count -= 1;
        self.set_header(&header);
        Ok(())
    }

    /// Overwrites a record in place if the new data is not longer than the
    /// stored record.
    ///
    /// Returns `Ok(false)` without touching the page when the data does not
    /// fit; the caller then deletes and rewrites elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `HeapError::SlotNotFound` or `HeapError::SlotDeleted` if the
    /// slot does not hold a live record.
    pub fn try_update(&mut self, slot_id: SlotId, new_data: &[u8]) -> Result<bool, HeapError> {
        let slot = self.slot(slot_id).ok_or(HeapError::SlotNotFound(slot_id))?;
        if slot.is_deleted() {
            return Err(HeapError::SlotDeleted(slot_id));
        }
        if new_data.len() > slot.length as usize {
            return Ok(false);
        }

        let start = slot.offset as usize;
        self.data_mut()[start..start + new_data.len()].copy_from_slice(new_data);
        self.set_slot(slot_id, &SlotEntry::live(slot.offset, new_data.len() as u16));
        Ok(true)
    }

    /// Moves all live records against the end of the page and returns the
    /// number of bytes reclaimed.
    ///
    /// Slot indices are unchanged, as is the physical order of live records.
    /// Tombstoned slots keep their flag with a zero offset and length.
    pub fn compact(&mut self) -> usize {
        let header = self.header();
        let page_size = self.page_size();

        let mut live: Vec<(SlotId, SlotEntry)> = Vec::with_capacity(header.live_count as usize);
        for slot_id in 0..header.slot_count {
            let slot = self.get_slot(slot_id);
            if slot.is_deleted() {
                self.set_slot(
                    slot_id,
                    &SlotEntry {
                        offset: 0,
                        length: 0,
                        flag: SLOT_DELETED,
                    },
                );
            } else {
                live.push((slot_id, slot));
            }
        }

        // Nearest to the page end first, so every move goes toward the end
        // and never overwrites a record that has not been moved yet.
        live.sort_by(|a, b| b.1.offset.cmp(&a.1.offset));

        let mut end = page_size;
        for (slot_id, slot) in live {
            let len = slot.length as usize;
            let src = slot.offset as usize;
            let dst = end - len;
            if src != dst {
                self.data_mut().copy_within(src..src + len, dst);
            }
            self.set_slot(slot_id, &SlotEntry::live(dst as u16, slot.length));
            end = dst;
        }

        let new_start = (page_size - end) as u16;
        let reclaimed = (header.free_space_start - new_start) as usize;

        let mut header = self.header();
        header.free_space_start = new_start;
        self.set_header(&header);

        reclaimed
    }
}

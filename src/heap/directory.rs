//! In-memory free-space directory.
//!
//! Maps each known heap page to the number of free bytes it reported at its
//! last mutation, rounded down to [`FREE_SPACE_QUANTUM`]. The heap file uses
//! it to pick a write target without reading pages. The directory is not
//! persisted; it is rebuilt by scanning the store when a heap file opens.

use dashmap::DashMap;

use crate::storage::PageId;

/// Granularity of recorded free space in bytes.
pub const FREE_SPACE_QUANTUM: usize = 32;

/// Thread-safe `PageId -> free bytes` map with first-fit lookup.
///
/// A page absent from the directory is unknown to the heap file, not full.
#[derive(Debug, Default)]
pub struct FreeSpaceDirectory {
    pages: DashMap<PageId, usize>,
}

impl FreeSpaceDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the free space of a page, rounded down to the quantum.
    pub fn record(&self, page_id: PageId, free_bytes: usize) {
        self.pages.insert(page_id, quantize(free_bytes));
    }

    /// Returns the first page with at least `required` recorded free bytes.
    ///
    /// This is first-fit in map iteration order, which is not stable across
    /// mutations.
    pub fn find_page(&self, required: usize) -> Option<PageId> {
        self.pages
            .iter()
            .find(|entry| *entry.value() >= required)
            .map(|entry| *entry.key())
    }

    /// Returns the recorded free bytes for a page.
    pub fn get(&self, page_id: PageId) -> Option<usize> {
        self.pages.get(&page_id).map(|entry| *entry.value())
    }

    /// Forgets a page. Returns the recorded free bytes if it was known.
    pub fn remove(&self, page_id: PageId) -> Option<usize> {
        self.pages.remove(&page_id).map(|(_, free)| free)
    }

    /// Returns the ids of all known pages, sorted ascending.
    pub fn page_ids(&self) -> Vec<PageId> {
        let mut ids: Vec<PageId> = self.pages.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of known pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns true if no page is known.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Rounds `free_bytes` down to a multiple of [`FREE_SPACE_QUANTUM`].
pub fn quantize(free_bytes: usize) -> usize {
    free_bytes / FREE_SPACE_QUANTUM * FREE_SPACE_QUANTUM
}

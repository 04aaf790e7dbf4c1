//! Page identifier, size constants and the common page header.

mod data;
mod header;

pub use data::PageData;
pub use header::{PAGE_HEADER_SIZE, PAGE_VERSION, PageHeader, PageType};

/// Default page size (4KB).
pub const PAGE_SIZE: usize = 4096;

/// Identifier of a page within a page store.
///
/// The value is the page number; `FileStorage` derives the byte offset from
/// it and the configured page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u64);

impl PageId {
    /// Sentinel used by the null record handle. Never returned by a store.
    pub const INVALID: PageId = PageId(u64::MAX);

    /// Creates a new PageId from a page number.
    pub const fn new(page_num: u64) -> Self {
        Self(page_num)
    }

    /// Returns the page number.
    pub const fn page_num(&self) -> u64 {
        self.0
    }

    /// Calculates the byte offset of this page in a single-file store.
    pub const fn byte_offset(&self, page_size: usize) -> u64 {
        self.0 * page_size as u64
    }
}

//! Heap storage for variable-length records.
//!
//! This module provides the heap file implementation, which stores opaque
//! byte records in slotted pages. The term "heap" refers to an unordered
//! collection of records, as opposed to indexed structures like B+trees.
//!
//! - [`HeapPage`]: Page-level record storage using slotted page structure
//! - [`RecordId`]: Stable `(page, slot)` address of a record
//! - [`FreeSpaceDirectory`]: In-memory free space per page, first-fit lookup
//! - [`HeapFile`]: Write/read/update/delete/compact/scan over a page store

mod directory;
mod error;
mod file;
mod latch;
mod page;

pub use directory::{FREE_SPACE_QUANTUM, FreeSpaceDirectory, quantize};
pub use error::HeapError;
pub use file::HeapFile;
pub use latch::{PageLatchGuard, PageLatches};
pub use page::{
    HeapPage, RecordId, SLOT_DELETED, SLOT_LIVE, SLOT_SIZE, SlotEntry, SlotId, max_record_size,
};

// Re-export page header types from storage for convenience
pub use crate::storage::{PAGE_HEADER_SIZE, PageHeader, PageType};

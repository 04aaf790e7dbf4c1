//! Error types for the heap module.

use thiserror::Error;

use super::page::{RecordId, SlotId};
use crate::storage::{PageId, StorageError};

/// Errors from heap page and heap file operations.
#[derive(Debug, Error)]
pub enum HeapError {
    /// The page cannot hold the record.
    ///
    /// From the heap file this means the free-space directory and the page
    /// disagree, since the directory is consulted before every insert.
    #[error("page full: need {required} bytes, have {available} available")]
    PageFull {
        /// Bytes required for the data and, if appended, a new slot.
        required: usize,
        /// Bytes available in the page.
        available: usize,
    },

    /// The record can never fit in a single page.
    #[error("record of {size} bytes exceeds the maximum record size of {max} bytes")]
    RecordTooLarge {
        /// Size of the rejected record.
        size: usize,
        /// Largest record an empty page accepts.
        max: usize,
    },

    /// Slot index is beyond the page's slot table.
    #[error("slot {0} not found")]
    SlotNotFound(SlotId),

    /// Slot exists but is tombstoned.
    #[error("slot {0} is deleted")]
    SlotDeleted(SlotId),

    /// The record existed but has been deleted.
    #[error("record {0} has been deleted")]
    RecordDeleted(RecordId),

    /// The null record handle was passed where a real one is required.
    #[error("null record id")]
    NullRecordId,

    /// The page does not carry the heap page tag.
    #[error("page {0:?} is not a heap page")]
    NotHeapPage(PageId),

    /// The heap file has been closed.
    #[error("heap file is closed")]
    Closed,

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Underlying storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl HeapError {
    /// Returns true if the error reports a page missing from the store.
    pub fn is_page_not_found(&self) -> bool {
        matches!(self, HeapError::Storage(StorageError::PageNotFound(_)))
    }
}

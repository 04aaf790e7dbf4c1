//! Storage layer errors.

use thiserror::Error;

use crate::storage::PageId;

/// Storage layer errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Page not found in storage.
    ///
    /// Raised for pages that were never allocated or have been released.
    /// The heap file treats this as a skippable gap while rebuilding its
    /// free-space directory and while scanning.
    #[error("page not found: {0:?}")]
    PageNotFound(PageId),

    /// Buffer passed to `read_page`/`write_page` does not match the page size.
    #[error("invalid buffer size: expected {expected}, got {actual}")]
    InvalidBufferSize {
        /// Configured page size.
        expected: usize,
        /// Actual buffer size provided.
        actual: usize,
    },

    /// Configured page size cannot hold the heap page layout.
    #[error("invalid page size: {0}")]
    InvalidPageSize(usize),

    /// I/O error from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The storage file has an invalid format or size.
    #[error("data corruption: {0}")]
    Corrupted(String),
}

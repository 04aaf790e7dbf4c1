//! Fixed-size page stores.
//!
//! A [`Storage`] moves whole pages between the store and caller-owned
//! buffers and never looks inside them. [`MemoryStorage`] keeps pages in a
//! vector and can release individual pages to model holes;
//! [`FileStorage`] lays them out back to back in one file. Page size comes
//! from [`StorageConfig`] and is fixed for the life of a store.
//!
//! [`page`] holds the page id type and the 32-byte page header codec shared
//! by every page kind.

pub mod config;
pub mod error;
pub mod io;
pub mod page;

pub use config::{MAX_PAGE_SIZE, MIN_PAGE_SIZE, StorageConfig};
pub use error::StorageError;
pub use io::{FileStorage, MemoryStorage, Storage};
pub use page::{PAGE_HEADER_SIZE, PAGE_SIZE, PageData, PageHeader, PageId, PageType};

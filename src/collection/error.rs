//! Collection errors.

use thiserror::Error;

use crate::heap::HeapError;
use crate::index::{DocumentId, IndexError, TreeError};

/// Errors from collection operations.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// A document with the id already exists.
    #[error("document {0} already exists")]
    DuplicateKey(DocumentId),

    /// No document with the id exists.
    #[error("document {0} not found")]
    NotFound(DocumentId),

    /// A document could not be encoded or decoded.
    #[error("document encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error(transparent)]
    Heap(#[from] HeapError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl From<TreeError> for CollectionError {
    fn from(e: TreeError) -> Self {
        CollectionError::Index(IndexError::Tree(e))
    }
}

//! Index errors.

use thiserror::Error;

use super::definition::FieldType;
use crate::storage::StorageError;

/// Errors raised by an ordered tree implementation.
#[derive(Debug, Error)]
pub enum TreeError {
    /// Underlying page storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The tree structure is inconsistent.
    #[error("tree corrupted: {0}")]
    Corrupted(String),
}

/// Errors from index maintenance and lookups.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A unique index already holds the value.
    #[error("unique index \"{index}\" already contains value {value}")]
    UniqueViolation {
        /// Index name.
        index: String,
        /// Offending value, debug-formatted.
        value: String,
    },

    /// An open-ended range scan was requested on a key type without a
    /// known maximum value.
    #[error("index \"{index}\" cannot scan an open-ended range over {field_type} keys")]
    UnboundedRange {
        /// Index name.
        index: String,
        /// Declared key type.
        field_type: FieldType,
    },

    /// No index is registered for the field.
    #[error("no index registered for field \"{0}\"")]
    IndexNotFound(String),

    /// An index is already registered for the field.
    #[error("an index is already registered for field \"{0}\"")]
    DuplicateIndex(String),

    /// The requested key type does not match the registered index.
    #[error("index on field \"{field}\" is declared as {declared}, requested {requested}")]
    KeyTypeMismatch {
        /// Field name.
        field: String,
        /// Declared key type.
        declared: FieldType,
        /// Requested key type.
        requested: FieldType,
    },

    /// The definition does not fit the registration call.
    #[error("invalid index definition \"{index}\": {reason}")]
    InvalidDefinition {
        /// Index name.
        index: String,
        /// What is wrong.
        reason: String,
    },

    /// The backing tree failed.
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),
}

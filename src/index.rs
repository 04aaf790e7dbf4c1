//! Secondary and unique index maintenance over document fields.
//!
//! Indexes map field values to [`DocumentId`]s and live in an
//! [`OrderedTree`]. For each document type a [`DocumentIndexRegistry`]
//! keeps every index in step with inserts, updates and deletes and hands
//! out typed [`IndexExecutor`]s for lookups.
//!
//! - [`IndexKey`], [`CompositeKey`], [`StringKey`]: key types
//! - [`IndexDefinition`]: index metadata
//! - [`SecondaryIndexUpdater`], [`UniqueIndexUpdater`]: maintenance
//! - [`CompositeIndexExecutor`], [`UniqueIndexExecutor`]: lookups

mod definition;
mod error;
mod executor;
mod key;
mod registry;
mod string_key;
mod tree;
mod updater;

pub use definition::{FieldType, IndexDefinition, IndexKind};
pub use error::{IndexError, TreeError};
pub use executor::{CompositeIndexExecutor, IndexExecutor, UniqueIndexExecutor};
pub use key::{CompositeKey, Document, DocumentId, IndexKey};
pub use registry::DocumentIndexRegistry;
pub use string_key::{StringKey, StringKey32, StringKey64, StringKey128, StringKey256};
pub use tree::{MemoryTree, OrderedTree};
pub use updater::{IndexUpdater, SecondaryIndexUpdater, UniqueIndexUpdater};

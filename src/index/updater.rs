//! Index maintenance.
//!
//! An updater is told about every document insert, update and delete and
//! applies the matching change to its index tree. The indexed value is
//! pulled out of the document with an extractor closure.

use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tracing::warn;

use super::definition::IndexDefinition;
use super::error::IndexError;
use super::key::{CompositeKey, Document, DocumentId, IndexKey};
use super::tree::OrderedTree;

/// Object-safe maintenance interface over one index.
pub trait IndexUpdater<D>: Send + Sync {
    /// Definition of the index this updater writes.
    fn definition(&self) -> &IndexDefinition;

    /// Adds the entry for a new document.
    fn on_insert<'a>(&'a self, doc: &'a D) -> BoxFuture<'a, Result<(), IndexError>>;

    /// Moves the entry of a document whose field may have changed.
    fn on_update<'a>(&'a self, old: &'a D, new: &'a D) -> BoxFuture<'a, Result<(), IndexError>>;

    /// Removes the entry of a deleted document.
    fn on_delete<'a>(&'a self, doc: &'a D) -> BoxFuture<'a, Result<(), IndexError>>;
}

/// Maintains a non-unique index over `(value, id)` keys.
///
/// Any number of documents may share a value.
pub struct SecondaryIndexUpdater<D, K, T, F> {
    definition: IndexDefinition,
    tree: Arc<T>,
    extract: F,
    _doc: PhantomData<fn(&D) -> K>,
}

impl<D, K, T, F> SecondaryIndexUpdater<D, K, T, F>
where
    D: Document,
    K: IndexKey,
    T: OrderedTree<CompositeKey<K>, DocumentId>,
    F: Fn(&D) -> K + Send + Sync,
{
    /// Creates an updater that indexes the value `extract` returns.
    pub fn new(definition: IndexDefinition, tree: Arc<T>, extract: F) -> Self {
        Self {
            definition,
            tree,
            extract,
            _doc: PhantomData,
        }
    }

    fn key_of(&self, doc: &D) -> CompositeKey<K> {
        CompositeKey::new((self.extract)(doc), doc.id())
    }
}

impl<D, K, T, F> IndexUpdater<D> for SecondaryIndexUpdater<D, K, T, F>
where
    D: Document,
    K: IndexKey,
    T: OrderedTree<CompositeKey<K>, DocumentId>,
    F: Fn(&D) -> K + Send + Sync,
{
    fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    fn on_insert<'a>(&'a self, doc: &'a D) -> BoxFuture<'a, Result<(), IndexError>> {
        Box::pin(async move {
            self.tree.insert(self.key_of(doc), doc.id()).await?;
            Ok(())
        })
    }

    fn on_update<'a>(&'a self, old: &'a D, new: &'a D) -> BoxFuture<'a, Result<(), IndexError>> {
        Box::pin(async move {
            let old_key = self.key_of(old);
            let new_key = self.key_of(new);
            if old_key == new_key {
                return Ok(());
            }

            self.tree.delete(old_key).await?;
            self.tree.insert(new_key, new.id()).await?;
            Ok(())
        })
    }

    fn on_delete<'a>(&'a self, doc: &'a D) -> BoxFuture<'a, Result<(), IndexError>> {
        Box::pin(async move {
            self.tree.delete(self.key_of(doc)).await?;
            Ok(())
        })
    }
}

/// Maintains a unique index mapping each value to one document id.
///
/// The contains-then-insert pair is not atomic; callers serialize writes to
/// the same index.
pub struct UniqueIndexUpdater<D, K, T, F> {
    definition: IndexDefinition,
    tree: Arc<T>,
    extract: F,
    _doc: PhantomData<fn(&D) -> K>,
}

impl<D, K, T, F> UniqueIndexUpdater<D, K, T, F>
where
    D: Document,
    K: IndexKey,
    T: OrderedTree<K, DocumentId>,
    F: Fn(&D) -> K + Send + Sync,
{
    /// Creates an updater that indexes the value `extract` returns.
    pub fn new(definition: IndexDefinition, tree: Arc<T>, extract: F) -> Self {
        Self {
            definition,
            tree,
            extract,
            _doc: PhantomData,
        }
    }

    async fn ensure_absent(&self, value: K) -> Result<(), IndexError> {
        if self.tree.contains(value).await? {
            warn!(index = self.definition.name(), value = ?value, "unique index violation");
            return Err(IndexError::UniqueViolation {
                index: self.definition.name().to_string(),
                value: format!("{value:?}"),
            });
        }
        Ok(())
    }
}

impl<D, K, T, F> IndexUpdater<D> for UniqueIndexUpdater<D, K, T, F>
where
    D: Document,
    K: IndexKey,
    T: OrderedTree<K, DocumentId>,
    F: Fn(&D) -> K + Send + Sync,
{
    fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    fn on_insert<'a>(&'a self, doc: &'a D) -> BoxFuture<'a, Result<(), IndexError>> {
        Box::pin(async move {
            let value = (self.extract)(doc);
            self.ensure_absent(value).await?;
            self.tree.insert(value, doc.id()).await?;
            Ok(())
        })
    }

    fn on_update<'a>(&'a self, old: &'a D, new: &'a D) -> BoxFuture<'a, Result<(), IndexError>> {
        Box::pin(async move {
            let old_value = (self.extract)(old);
            let new_value = (self.extract)(new);
            if old_value == new_value {
                if old.id() != new.id() {
                    self.tree.insert(new_value, new.id()).await?;
                }
                return Ok(());
            }

            self.ensure_absent(new_value).await?;
            self.tree.delete(old_value).await?;
            self.tree.insert(new_value, new.id()).await?;
            Ok(())
        })
    }

    fn on_delete<'a>(&'a self, doc: &'a D) -> BoxFuture<'a, Result<(), IndexError>> {
        Box::pin(async move {
            self.tree.delete((self.extract)(doc)).await?;
            Ok(())
        })
    }
}

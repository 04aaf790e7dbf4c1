//! Index lookups.
//!
//! An executor answers "which documents have this field value" and "which
//! documents have a value in this range" against one index tree.
//!
//! - [`CompositeIndexExecutor`]: secondary indexes keyed by
//!   [`CompositeKey`], several ids per value
//! - [`UniqueIndexExecutor`]: unique indexes keyed by the value itself

use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::TryStreamExt;
use futures_util::future::BoxFuture;
use tracing::trace;

use super::definition::IndexDefinition;
use super::error::IndexError;
use super::key::{CompositeKey, DocumentId, IndexKey};
use super::tree::OrderedTree;

/// Object-safe lookup interface over one index.
///
/// Results come back in key order, reversed when the definition is
/// descending. A `scan_range` bound of `None` means open-ended: the lower
/// end defaults to `K::default()`, the upper end to
/// [`IndexKey::upper_bound`].
pub trait IndexExecutor<K>: Send + Sync {
    /// Definition of the index this executor reads.
    fn definition(&self) -> &IndexDefinition;

    /// Ids of the documents whose field equals `value`.
    fn lookup(&self, value: K) -> BoxFuture<'_, Result<Vec<DocumentId>, IndexError>>;

    /// Ids of the documents whose field lies in `[from, to]`.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::UnboundedRange` if `to` is `None` and `K` has no
    /// upper bound.
    fn scan_range(
        &self,
        from: Option<K>,
        to: Option<K>,
    ) -> BoxFuture<'_, Result<Vec<DocumentId>, IndexError>>;
}

fn resolve_upper<K: IndexKey>(
    definition: &IndexDefinition,
    to: Option<K>,
) -> Result<K, IndexError> {
    match to {
        Some(to) => Ok(to),
        None => K::upper_bound().ok_or_else(|| IndexError::UnboundedRange {
            index: definition.name().to_string(),
            field_type: definition.field_type(),
        }),
    }
}

fn in_index_order(definition: &IndexDefinition, mut ids: Vec<DocumentId>) -> Vec<DocumentId> {
    if definition.is_descending() {
        ids.reverse();
    }
    ids
}

/// Executor for a secondary index over `(value, id)` keys.
pub struct CompositeIndexExecutor<K, T> {
    definition: IndexDefinition,
    tree: Arc<T>,
    _key: PhantomData<fn() -> K>,
}

impl<K, T> CompositeIndexExecutor<K, T>
where
    K: IndexKey,
    T: OrderedTree<CompositeKey<K>, DocumentId>,
{
    /// Creates an executor reading `tree` under `definition`.
    pub fn new(definition: IndexDefinition, tree: Arc<T>) -> Self {
        Self {
            definition,
            tree,
            _key: PhantomData,
        }
    }

    async fn ids_between(
        &self,
        from: CompositeKey<K>,
        to: CompositeKey<K>,
    ) -> Result<Vec<DocumentId>, IndexError> {
        let keys: Vec<CompositeKey<K>> = self.tree.scan(from, to).try_collect().await?;
        trace!(index = self.definition.name(), matches = keys.len(), "composite scan");
        Ok(in_index_order(
            &self.definition,
            keys.into_iter().map(|key| key.id).collect(),
        ))
    }
}

impl<K, T> IndexExecutor<K> for CompositeIndexExecutor<K, T>
where
    K: IndexKey,
    T: OrderedTree<CompositeKey<K>, DocumentId>,
{
    fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    fn lookup(&self, value: K) -> BoxFuture<'_, Result<Vec<DocumentId>, IndexError>> {
        Box::pin(self.ids_between(CompositeKey::range_lo(value), CompositeKey::range_hi(value)))
    }

    fn scan_range(
        &self,
        from: Option<K>,
        to: Option<K>,
    ) -> BoxFuture<'_, Result<Vec<DocumentId>, IndexError>> {
        Box::pin(async move {
            let to = resolve_upper(&self.definition, to)?;
            let from = from.unwrap_or_default();
            self.ids_between(CompositeKey::range_lo(from), CompositeKey::range_hi(to))
                .await
        })
    }
}

/// Executor for a unique index mapping each value to one id.
pub struct UniqueIndexExecutor<K, T> {
    definition: IndexDefinition,
    tree: Arc<T>,
    _key: PhantomData<fn() -> K>,
}

impl<K, T> UniqueIndexExecutor<K, T>
where
    K: IndexKey,
    T: OrderedTree<K, DocumentId>,
{
    /// Creates an executor reading `tree` under `definition`.
    pub fn new(definition: IndexDefinition, tree: Arc<T>) -> Self {
        Self {
            definition,
            tree,
            _key: PhantomData,
        }
    }
}

impl<K, T> IndexExecutor<K> for UniqueIndexExecutor<K, T>
where
    K: IndexKey,
    T: OrderedTree<K, DocumentId>,
{
    fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    fn lookup(&self, value: K) -> BoxFuture<'_, Result<Vec<DocumentId>, IndexError>> {
        Box::pin(async move {
            let id = self.tree.try_get(value).await?;
            Ok(id.into_iter().collect())
        })
    }

    fn scan_range(
        &self,
        from: Option<K>,
        to: Option<K>,
    ) -> BoxFuture<'_, Result<Vec<DocumentId>, IndexError>> {
        Box::pin(async move {
            let to = resolve_upper(&self.definition, to)?;
            let from = from.unwrap_or_default();
            let keys: Vec<K> = self.tree.scan(from, to).try_collect().await?;

            // A key deleted between the scan and the fetch is skipped.
            let mut ids = Vec::with_capacity(keys.len());
            for key in keys {
                if let Some(id) = self.tree.try_get(key).await? {
                    ids.push(id);
                }
            }
            trace!(index = self.definition.name(), matches = ids.len(), "unique scan");
            Ok(in_index_order(&self.definition, ids))
        })
    }
}

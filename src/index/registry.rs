//! Per-document-type index catalog.
//!
//! The registry owns one executor and one updater per indexed field.
//! Updaters are driven together on every document mutation; executors are
//! handed out by field name with their key type restored.

use std::any::Any;
use std::sync::Arc;

use tracing::{debug, warn};

use super::definition::IndexDefinition;
use super::error::IndexError;
use super::executor::{CompositeIndexExecutor, IndexExecutor, UniqueIndexExecutor};
use super::key::{CompositeKey, Document, DocumentId, IndexKey};
use super::tree::OrderedTree;
use super::updater::{IndexUpdater, SecondaryIndexUpdater, UniqueIndexUpdater};

struct RegisteredIndex<D> {
    definition: IndexDefinition,
    updater: Arc<dyn IndexUpdater<D>>,
    /// Holds an `Arc<dyn IndexExecutor<K>>` for the registered `K`.
    executor: Arc<dyn Any + Send + Sync>,
}

/// Index catalog for documents of type `D`, keyed by field name.
///
/// Updaters run in registration order. When one fails, the updaters that
/// already ran for the same mutation are reverted before the error is
/// returned, so a rejected insert or update leaves every index as it was.
pub struct DocumentIndexRegistry<D> {
    indexes: Vec<RegisteredIndex<D>>,
}

impl<D: Document> DocumentIndexRegistry<D> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            indexes: Vec::new(),
        }
    }

    /// Registers a secondary index over `(value, id)` keys.
    ///
    /// # Errors
    ///
    /// - `IndexError::DuplicateIndex` if the field is already indexed
    /// - `IndexError::KeyTypeMismatch` if the definition was built for
    ///   another key type
    /// - `IndexError::InvalidDefinition` if the definition is unique
    pub fn register<K, T, F>(
        &mut self,
        definition: IndexDefinition,
        tree: Arc<T>,
        extract: F,
    ) -> Result<(), IndexError>
    where
        K: IndexKey,
        T: OrderedTree<CompositeKey<K>, DocumentId> + 'static,
        F: Fn(&D) -> K + Send + Sync + 'static,
    {
        self.check_definition::<K>(&definition, false)?;

        let executor: Arc<dyn IndexExecutor<K>> = Arc::new(CompositeIndexExecutor::new(
            definition.clone(),
            tree.clone(),
        ));
        let updater = Arc::new(SecondaryIndexUpdater::new(definition.clone(), tree, extract));
        self.push(definition, updater, executor);
        Ok(())
    }

    /// Registers a unique index mapping each value to one document.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register), with `InvalidDefinition` when
    /// the definition is not unique.
    pub fn register_unique<K, T, F>(
        &mut self,
        definition: IndexDefinition,
        tree: Arc<T>,
        extract: F,
    ) -> Result<(), IndexError>
    where
        K: IndexKey,
        T: OrderedTree<K, DocumentId> + 'static,
        F: Fn(&D) -> K + Send + Sync + 'static,
    {
        self.check_definition::<K>(&definition, true)?;

        let executor: Arc<dyn IndexExecutor<K>> =
            Arc::new(UniqueIndexExecutor::new(definition.clone(), tree.clone()));
        let updater = Arc::new(UniqueIndexUpdater::new(definition.clone(), tree, extract));
        self.push(definition, updater, executor);
        Ok(())
    }

    fn check_definition<K: IndexKey>(
        &self,
        definition: &IndexDefinition,
        unique: bool,
    ) -> Result<(), IndexError> {
        let field = definition.field_name();
        if self.contains(field) {
            return Err(IndexError::DuplicateIndex(field.to_string()));
        }
        if definition.field_type() != K::FIELD_TYPE {
            return Err(IndexError::KeyTypeMismatch {
                field: field.to_string(),
                declared: definition.field_type(),
                requested: K::FIELD_TYPE,
            });
        }
        if definition.string_key_width() != K::STRING_WIDTH {
            return Err(IndexError::InvalidDefinition {
                index: definition.name().to_string(),
                reason: format!(
                    "string key width {} does not match key type width {}",
                    definition.string_key_width(),
                    K::STRING_WIDTH
                ),
            });
        }
        if definition.is_unique() != unique {
            let reason = if unique {
                "unique index registered from a non-unique definition"
            } else {
                "secondary index registered from a unique definition"
            };
            return Err(IndexError::InvalidDefinition {
                index: definition.name().to_string(),
                reason: reason.to_string(),
            });
        }
        Ok(())
    }

    fn push<K: IndexKey>(
        &mut self,
        definition: IndexDefinition,
        updater: Arc<dyn IndexUpdater<D>>,
        executor: Arc<dyn IndexExecutor<K>>,
    ) {
        debug!(
            index = definition.name(),
            field = definition.field_name(),
            kind = ?definition.kind(),
            "index registered"
        );
        self.indexes.push(RegisteredIndex {
            definition,
            updater,
            executor: Arc::new(executor),
        });
    }

    fn find(&self, field: &str) -> Option<&RegisteredIndex<D>> {
        self.indexes
            .iter()
            .find(|index| index.definition.field_name() == field)
    }

    /// Returns the executor of the index on `field`.
    ///
    /// # Errors
    ///
    /// - `IndexError::IndexNotFound` if no index is registered for `field`
    /// - `IndexError::KeyTypeMismatch` if it was registered with another
    ///   key type
    pub fn executor<K: IndexKey>(
        &self,
        field: &str,
    ) -> Result<Arc<dyn IndexExecutor<K>>, IndexError> {
        let index = self
            .find(field)
            .ok_or_else(|| IndexError::IndexNotFound(field.to_string()))?;

        index
            .executor
            .downcast_ref::<Arc<dyn IndexExecutor<K>>>()
            .cloned()
            .ok_or_else(|| IndexError::KeyTypeMismatch {
                field: field.to_string(),
                declared: index.definition.field_type(),
                requested: K::FIELD_TYPE,
            })
    }

    /// Definition of the index on `field`.
    pub fn definition(&self, field: &str) -> Option<&IndexDefinition> {
        self.find(field).map(|index| &index.definition)
    }

    /// All definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &IndexDefinition> {
        self.indexes.iter().map(|index| &index.definition)
    }

    /// Returns `true` if `field` has an index.
    pub fn contains(&self, field: &str) -> bool {
        self.find(field).is_some()
    }

    /// Number of registered indexes.
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    /// Returns `true` if no index is registered.
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Adds `doc` to every index.
    #[tracing::instrument(level = "debug", skip_all, fields(id = %doc.id()))]
    pub async fn on_insert(&self, doc: &D) -> Result<(), IndexError> {
        for (applied, index) in self.indexes.iter().enumerate() {
            if let Err(e) = index.updater.on_insert(doc).await {
                for done in self.indexes[..applied].iter().rev() {
                    if let Err(undo) = done.updater.on_delete(doc).await {
                        warn!(index = done.definition.name(), error = %undo, "failed to revert index insert");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Moves the entries of a document from `old` to `new`.
    #[tracing::instrument(level = "debug", skip_all, fields(id = %new.id()))]
    pub async fn on_update(&self, old: &D, new: &D) -> Result<(), IndexError> {
        for (applied, index) in self.indexes.iter().enumerate() {
            if let Err(e) = index.updater.on_update(old, new).await {
                for done in self.indexes[..applied].iter().rev() {
                    if let Err(undo) = done.updater.on_update(new, old).await {
                        warn!(index = done.definition.name(), error = %undo, "failed to revert index update");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Removes `doc` from every index, stopping at the first error.
    #[tracing::instrument(level = "debug", skip_all, fields(id = %doc.id()))]
    pub async fn on_delete(&self, doc: &D) -> Result<(), IndexError> {
        for index in &self.indexes {
            index.updater.on_delete(doc).await?;
        }
        Ok(())
    }
}

impl<D: Document> Default for DocumentIndexRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

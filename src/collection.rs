//! Document collections.
//!
//! A [`Collection`] stores serialized documents in a [`HeapFile`], maps
//! document ids to record handles through a primary [`OrderedTree`] and
//! keeps the field indexes of a [`DocumentIndexRegistry`] in step with
//! every mutation.
//!
//! Mutations are serialized by a collection-wide write lock. Reads do not
//! take it; a read racing a delete sees either the document or nothing.

mod error;

use std::pin::pin;
use std::sync::Arc;

use futures_util::stream::{Stream, StreamExt, TryStreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use error::CollectionError;

pub use crate::index::Document;
use crate::heap::{HeapError, HeapFile, RecordId};
use crate::index::{DocumentId, DocumentIndexRegistry, IndexKey, MemoryTree, OrderedTree};
use crate::storage::Storage;

/// Documents of type `D` stored in a heap file over `S`, with primary index
/// `P` and the secondary and unique indexes of a registry.
pub struct Collection<D, S: Storage, P = MemoryTree<DocumentId, RecordId>> {
    heap: HeapFile<S>,
    primary: Arc<P>,
    indexes: DocumentIndexRegistry<D>,
    write_lock: Mutex<()>,
}

impl<D, S, P> Collection<D, S, P>
where
    D: Document + Serialize + DeserializeOwned,
    S: Storage,
    P: OrderedTree<DocumentId, RecordId>,
{
    /// Creates a collection over an open heap file.
    ///
    /// The primary tree and the registry's trees must already describe the
    /// heap's contents; see [`rebuild_indexes`](Self::rebuild_indexes).
    pub fn new(heap: HeapFile<S>, primary: Arc<P>, indexes: DocumentIndexRegistry<D>) -> Self {
        Self {
            heap,
            primary,
            indexes,
            write_lock: Mutex::new(()),
        }
    }

    /// Opens the heap file over `storage` and creates a collection on it.
    pub async fn open(
        storage: S,
        primary: Arc<P>,
        indexes: DocumentIndexRegistry<D>,
    ) -> Result<Self, CollectionError> {
        let heap = HeapFile::open(storage).await?;
        Ok(Self::new(heap, primary, indexes))
    }

    /// The underlying heap file.
    pub fn heap(&self) -> &HeapFile<S> {
        &self.heap
    }

    /// The id-to-handle tree.
    pub fn primary(&self) -> &P {
        &self.primary
    }

    /// The field indexes kept in step with this collection.
    pub fn indexes(&self) -> &DocumentIndexRegistry<D> {
        &self.indexes
    }

    fn encode(doc: &D) -> Result<Vec<u8>, CollectionError> {
        Ok(bincode::serialize(doc)?)
    }

    fn decode(bytes: &[u8]) -> Result<D, CollectionError> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Stores a new document and returns its record handle.
    ///
    /// Index updaters run before the heap write, so a document rejected by
    /// a unique index leaves neither a record nor index entries behind.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::DuplicateKey` if the id is taken and
    /// `IndexError::UniqueViolation` (wrapped) if a unique field is.
    #[tracing::instrument(level = "debug", skip_all, fields(id = %doc.id()))]
    pub async fn insert(&self, doc: &D) -> Result<RecordId, CollectionError> {
        let id = doc.id();
        let data = Self::encode(doc)?;
        let _guard = self.write_lock.lock().await;

        if self.primary.contains(id).await? {
            return Err(CollectionError::DuplicateKey(id));
        }

        self.indexes.on_insert(doc).await?;
        let rid = match self.heap.write(&data).await {
            Ok(rid) => rid,
            Err(e) => {
                self.revert_index_insert(doc).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.primary.insert(id, rid).await {
            self.discard_record(rid).await;
            self.revert_index_insert(doc).await;
            return Err(e.into());
        }
        Ok(rid)
    }

    async fn revert_index_insert(&self, doc: &D) {
        if let Err(e) = self.indexes.on_delete(doc).await {
            warn!(id = %doc.id(), error = %e, "failed to revert index entries");
        }
    }

    /// Fetches a document by id.
    pub async fn get(&self, id: DocumentId) -> Result<Option<D>, CollectionError> {
        let Some(rid) = self.primary.try_get(id).await? else {
            return Ok(None);
        };
        match self.heap.read(rid).await {
            Ok(bytes) => Ok(Some(Self::decode(&bytes)?)),
            Err(HeapError::RecordDeleted(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetches the document stored at a record handle.
    pub async fn get_by_record(&self, rid: RecordId) -> Result<D, CollectionError> {
        let bytes = self.heap.read(rid).await?;
        Self::decode(&bytes)
    }

    /// Replaces a stored document and returns its (possibly new) handle.
    ///
    /// A document that outgrows its record is written to a new record and
    /// the primary tree is re-pointed before the old record is tombstoned.
    /// If any step fails the indexes, the primary tree and the heap are
    /// put back as they were.
    ///
    /// # Errors
    ///
    /// Returns `CollectionError::NotFound` if no document has the id.
    #[tracing::instrument(level = "debug", skip_all, fields(id = %doc.id()))]
    pub async fn update(&self, doc: &D) -> Result<RecordId, CollectionError> {
        let id = doc.id();
        let data = Self::encode(doc)?;
        let _guard = self.write_lock.lock().await;

        let rid = self
            .primary
            .try_get(id)
            .await?
            .ok_or(CollectionError::NotFound(id))?;
        let old = self.get_by_record(rid).await?;

        self.indexes.on_update(&old, doc).await?;
        match self.heap.update_in_place(rid, &data).await {
            Ok(true) => return Ok(rid),
            Ok(false) => {}
            Err(e) => {
                self.revert_index_update(doc, &old).await;
                return Err(e.into());
            }
        }

        let new_rid = match self.heap.write(&data).await {
            Ok(new_rid) => new_rid,
            Err(e) => {
                self.revert_index_update(doc, &old).await;
                return Err(e.into());
            }
        };
        debug!(%id, from = %rid, to = %new_rid, "document relocated");

        if let Err(e) = self.primary.insert(id, new_rid).await {
            self.discard_record(new_rid).await;
            self.revert_index_update(doc, &old).await;
            return Err(e.into());
        }
        if let Err(e) = self.heap.delete(rid).await {
            if let Err(undo) = self.primary.insert(id, rid).await {
                warn!(%id, error = %undo, "failed to restore primary entry");
            }
            self.discard_record(new_rid).await;
            self.revert_index_update(doc, &old).await;
            return Err(e.into());
        }
        Ok(new_rid)
    }

    async fn revert_index_update(&self, new: &D, old: &D) {
        if let Err(e) = self.indexes.on_update(new, old).await {
            warn!(id = %old.id(), error = %e, "failed to revert index entries");
        }
    }

    async fn discard_record(&self, rid: RecordId) {
        if let Err(e) = self.heap.delete(rid).await {
            warn!(%rid, error = %e, "failed to remove orphaned record");
        }
    }

    /// Deletes a document. Returns `false` if it did not exist.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn delete(&self, id: DocumentId) -> Result<bool, CollectionError> {
        let _guard = self.write_lock.lock().await;

        let Some(rid) = self.primary.try_get(id).await? else {
            return Ok(false);
        };
        let old = self.get_by_record(rid).await?;

        self.indexes.on_delete(&old).await?;
        if let Err(e) = self.primary.delete(id).await {
            self.restore_index_entries(&old).await;
            return Err(e.into());
        }
        if let Err(e) = self.heap.delete(rid).await {
            if let Err(undo) = self.primary.insert(id, rid).await {
                warn!(%id, error = %undo, "failed to restore primary entry");
            }
            self.restore_index_entries(&old).await;
            return Err(e.into());
        }
        Ok(true)
    }

    async fn restore_index_entries(&self, doc: &D) {
        if let Err(e) = self.indexes.on_insert(doc).await {
            warn!(id = %doc.id(), error = %e, "failed to restore index entries");
        }
    }

    /// Documents whose indexed `field` equals `value`.
    pub async fn find<K: IndexKey>(
        &self,
        field: &str,
        value: K,
    ) -> Result<Vec<D>, CollectionError> {
        let executor = self.indexes.executor::<K>(field)?;
        let ids = executor.lookup(value).await?;
        self.fetch_all(ids).await
    }

    /// Documents whose indexed `field` lies in `[from, to]`.
    ///
    /// `None` bounds are open-ended; see
    /// [`IndexExecutor::scan_range`](crate::index::IndexExecutor::scan_range).
    pub async fn find_range<K: IndexKey>(
        &self,
        field: &str,
        from: Option<K>,
        to: Option<K>,
    ) -> Result<Vec<D>, CollectionError> {
        let executor = self.indexes.executor::<K>(field)?;
        let ids = executor.scan_range(from, to).await?;
        self.fetch_all(ids).await
    }

    async fn fetch_all(&self, ids: Vec<DocumentId>) -> Result<Vec<D>, CollectionError> {
        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.get(id).await? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    /// Streams every stored document in heap order.
    pub fn scan(
        &self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<D, CollectionError>> + Send + '_ {
        self.heap.scan_all(cancel).map(|item| {
            let (_, bytes) = item?;
            Self::decode(&bytes)
        })
    }

    /// Repopulates the primary tree and every registered index from the
    /// heap. The trees are expected to be empty, as after a restart with
    /// in-memory trees.
    ///
    /// Returns the number of documents indexed.
    pub async fn rebuild_indexes(
        &self,
        cancel: CancellationToken,
    ) -> Result<usize, CollectionError> {
        let _guard = self.write_lock.lock().await;

        let mut records = pin!(self.heap.scan_all(cancel));
        let mut count = 0;
        while let Some((rid, bytes)) = records.try_next().await? {
            let doc = Self::decode(&bytes)?;
            self.primary.insert(doc.id(), rid).await?;
            self.indexes.on_insert(&doc).await?;
            count += 1;
        }

        info!(documents = count, indexes = self.indexes.len(), "indexes rebuilt");
        Ok(count)
    }

    /// Closes the underlying heap file.
    pub async fn close(&self) -> Result<(), CollectionError> {
        self.heap.close().await?;
        Ok(())
    }
}

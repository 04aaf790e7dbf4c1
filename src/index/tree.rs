//! Ordered key-value tree contract.
//!
//! Index executors and updaters only need point operations plus an
//! inclusive, ascending range scan. [`OrderedTree`] captures that so a paged
//! B+tree can back an index as well as the in-memory [`MemoryTree`].

use std::collections::BTreeMap;
use std::future::Future;

use futures_util::stream::{self, Stream};
use parking_lot::RwLock;

use super::error::TreeError;

/// An ordered map from `K` to `V`.
///
/// # Thread Safety
///
/// Implementations must be safe to share between tasks. Each call is atomic
/// on its own; callers that need several calls to appear atomic (check then
/// insert) must serialize them.
pub trait OrderedTree<K, V>: Send + Sync {
    /// Inserts `key`, replacing any existing value.
    fn insert(&self, key: K, value: V) -> impl Future<Output = Result<(), TreeError>> + Send;

    /// Removes `key`. Returns `false` if it was absent.
    fn delete(&self, key: K) -> impl Future<Output = Result<bool, TreeError>> + Send;

    /// Returns the value stored under `key`.
    fn try_get(&self, key: K) -> impl Future<Output = Result<Option<V>, TreeError>> + Send;

    /// Returns `true` if `key` is present.
    fn contains(&self, key: K) -> impl Future<Output = Result<bool, TreeError>> + Send;

    /// Streams the keys in `[from, to]` in ascending order.
    ///
    /// An empty stream is returned when `from > to`.
    fn scan(&self, from: K, to: K) -> impl Stream<Item = Result<K, TreeError>> + Send + '_;
}

/// [`OrderedTree`] over a `BTreeMap` behind a read-write lock.
///
/// `scan` copies the matching keys at call time, so later mutations do not
/// show up in a stream that is already open.
#[derive(Debug)]
pub struct MemoryTree<K, V> {
    map: RwLock<BTreeMap<K, V>>,
}

impl<K: Ord, V> MemoryTree<K, V> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            map: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Returns `true` if the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl<K: Ord, V> Default for MemoryTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> OrderedTree<K, V> for MemoryTree<K, V>
where
    K: Ord + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn insert(&self, key: K, value: V) -> Result<(), TreeError> {
        self.map.write().insert(key, value);
        Ok(())
    }

    async fn delete(&self, key: K) -> Result<bool, TreeError> {
        Ok(self.map.write().remove(&key).is_some())
    }

    async fn try_get(&self, key: K) -> Result<Option<V>, TreeError> {
        Ok(self.map.read().get(&key).cloned())
    }

    async fn contains(&self, key: K) -> Result<bool, TreeError> {
        Ok(self.map.read().contains_key(&key))
    }

    fn scan(&self, from: K, to: K) -> impl Stream<Item = Result<K, TreeError>> + Send + '_ {
        let keys: Vec<K> = if from > to {
            Vec::new()
        } else {
            self.map.read().range(from..=to).map(|(k, _)| k.clone()).collect()
        };
        stream::iter(keys.into_iter().map(Ok))
    }
}

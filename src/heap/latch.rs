//! Per-page write latches for the heap file.
//!
//! Every page mutation holds the page's latch across read, modify, persist
//! and free-space-directory update, so two writers that picked the same page
//! from the directory cannot interleave on its slot table.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::storage::PageId;

/// Guard returned by [`PageLatches::lock`]. Releases the latch on drop.
pub type PageLatchGuard = OwnedMutexGuard<()>;

/// Lazily created async mutex per page.
///
/// Entries are never removed; there is at most one per heap page.
#[derive(Default)]
pub struct PageLatches {
    latches: Mutex<HashMap<PageId, Arc<AsyncMutex<()>>>>,
}

impl PageLatches {
    /// Creates an empty latch table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to a page.
    pub async fn lock(&self, page_id: PageId) -> PageLatchGuard {
        let latch = {
            let mut latches = self.latches.lock();
            latches
                .entry(page_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        latch.lock_owned().await
    }
}

//! Snapshot cache of the flattened bookmark list
//!
//! Reads are served from the last loaded snapshot. Whoever issues a
//! mutation owns the cache and must call [`BookmarkCache::invalidate`]
//! afterwards; a read may see a stale snapshot but never a torn one.

use std::sync::{Arc, PoisonError, RwLock};

use crate::models::FlatBookmark;

/// Shared, replaceable snapshot of all bookmarks
pub type Snapshot = Arc<Vec<FlatBookmark>>;

#[derive(Debug, Default)]
pub struct BookmarkCache {
    snapshot: RwLock<Option<Snapshot>>,
}

impl BookmarkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached snapshot, loading it on a miss
    ///
    /// A failed load leaves the cache empty.
    pub fn get_or_load<E>(
        &self,
        load: impl FnOnce() -> Result<Vec<FlatBookmark>, E>,
    ) -> Result<Snapshot, E> {
        if let Some(snapshot) = self
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(snapshot));
        }

        let mut slot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(snapshot) = slot.as_ref() {
            return Ok(Arc::clone(snapshot));
        }
        let snapshot = Arc::new(load()?);
        *slot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Drop the snapshot; the next read reloads
    pub fn invalidate(&self) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

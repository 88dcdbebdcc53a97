//! Process-wide document locks
//!
//! Every mutation runs load, mutate and write against the file while
//! holding the lock for that document path. Paths are canonicalised so two
//! spellings of the same file share one lock.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

/// Handle on the lock for one document path
#[derive(Debug, Clone)]
pub struct DocumentLock {
    inner: Arc<Mutex<()>>,
}

impl DocumentLock {
    /// Get the shared lock for `path`
    pub fn for_path(path: &Path) -> Self {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut registry = LOCKS
            .get_or_init(Default::default)
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let inner = registry.entry(key).or_default().clone();
        Self { inner }
    }

    /// Block until the lock is held; released when the guard drops
    ///
    /// A lock poisoned by a panicking holder is taken over as is.
    pub fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn same_as(&self, other: &DocumentLock) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_same_path_shares_lock() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Bookmarks");
        fs::write(&path, "{}").unwrap();

        let direct = DocumentLock::for_path(&path);
        let dotted = DocumentLock::for_path(&temp_dir.path().join(".").join("Bookmarks"));
        assert!(direct.same_as(&dotted));
    }

    #[test]
    fn test_different_paths_do_not_share() {
        let temp_dir = TempDir::new().unwrap();
        let a = DocumentLock::for_path(&temp_dir.path().join("a"));
        let b = DocumentLock::for_path(&temp_dir.path().join("b"));
        assert!(!a.same_as(&b));
    }

    #[test]
    fn test_lock_serialises_holders() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Bookmarks");
        let inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                let inside = Arc::clone(&inside);
                thread::spawn(move || {
                    let lock = DocumentLock::for_path(&path);
                    let _guard = lock.acquire();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    thread::sleep(std::time::Duration::from_millis(5));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}

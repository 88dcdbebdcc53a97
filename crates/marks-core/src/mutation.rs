//! Direct-file mutation engine
//!
//! Every operation runs, under the document lock:
//!
//! ```text
//! backup -> load -> validate -> locate/resolve -> mutate -> write_atomic
//! ```
//!
//! Preconditions are checked against the in-memory tree before anything is
//! written, so a failed operation leaves the document untouched (only the
//! backup is refreshed).

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tracing::{debug, warn};

use crate::backend::{
    Added, BookmarkBackend, BulkMoved, Deleted, MoveRequest, Moved, MutationError,
    MutationResult, Renamed, SkippedMove,
};
use crate::document::Forest;
use crate::locate::find_by_url;
use crate::models::{FolderNode, Node, UrlNode};
use crate::path::{join, resolve_folder, resolve_folder_mut};
use crate::storage::{BookmarkFile, DocumentLock};

/// Last id handed out in this process
static LAST_ID: AtomicU64 = AtomicU64::new(0);

/// Mint a node id: current time in microseconds, strictly increasing within
/// the process and never equal to an id already in `forest`.
pub fn next_id(forest: &Forest) -> String {
    loop {
        let now = u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0);
        let prev = match LAST_ID.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        }) {
            Ok(prev) | Err(prev) => prev,
        };
        let id = now.max(prev + 1).to_string();
        if !forest.contains_id(&id) {
            return id;
        }
    }
}

/// Result of an edit closure; `dirty` decides whether the file is rewritten
struct Edited<T> {
    value: T,
    dirty: bool,
}

impl<T> Edited<T> {
    fn write(value: T) -> Self {
        Self { value, dirty: true }
    }
}

/// Edits the browser's bookmark file in place
pub struct FileBackend {
    file: BookmarkFile,
    lock: DocumentLock,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let file = BookmarkFile::new(path);
        let lock = DocumentLock::for_path(file.path());
        Self { file, lock }
    }

    pub fn file(&self) -> &BookmarkFile {
        &self.file
    }

    fn edit<T>(
        &self,
        op: impl FnOnce(&mut Forest) -> MutationResult<Edited<T>>,
    ) -> MutationResult<T> {
        let _guard = self.lock.acquire();

        self.file.backup()?;
        let mut doc = self.file.load()?;
        doc.roots.validate()?;

        let edited = op(&mut doc.roots)?;
        if edited.dirty {
            self.file.write_atomic(&doc)?;
        } else {
            debug!("Nothing changed, skipping write of {:?}", self.file.path());
        }
        Ok(edited.value)
    }
}

fn require(value: &str, what: &str) -> MutationResult<()> {
    if value.trim().is_empty() {
        return Err(MutationError::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(())
}

/// Move one bookmark inside an already loaded forest
fn move_in(forest: &mut Forest, url: &str, target: &str) -> MutationResult<Moved> {
    let located = find_by_url(forest, url).ok_or_else(|| MutationError::BookmarkNotFound {
        url: url.to_string(),
    })?;
    if located.is_root() {
        return Err(MutationError::CannotMoveRoot {
            url: url.to_string(),
        });
    }
    let from_folder = located.folder.clone().unwrap_or_default();
    let address = located.address.clone();

    if resolve_folder(forest, target).is_none() {
        return Err(MutationError::TargetFolderNotFound {
            path: target.to_string(),
        });
    }

    let node = forest
        .remove_at(&address)
        .ok_or_else(|| MutationError::BookmarkNotFound {
            url: url.to_string(),
        })?;
    resolve_folder_mut(forest, target)
        .ok_or_else(|| MutationError::TargetFolderNotFound {
            path: target.to_string(),
        })?
        .children
        .push(node);

    Ok(Moved {
        url: url.to_string(),
        from_folder,
        to_folder: target.trim_matches('/').to_string(),
    })
}

impl BookmarkBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    fn add_bookmark(&self, url: &str, title: &str, folder: &str) -> MutationResult<Added> {
        require(url, "url")?;
        self.edit(|forest| {
            let id = next_id(forest);
            let target = resolve_folder_mut(forest, folder).ok_or_else(|| {
                MutationError::FolderNotFound {
                    path: folder.to_string(),
                }
            })?;
            target
                .children
                .push(Node::Url(UrlNode::new(id.clone(), title, url)));
            debug!("Added bookmark {} ({}) to {}", id, url, folder);
            Ok(Edited::write(Added { id }))
        })
    }

    fn create_folder(&self, name: &str, parent: &str) -> MutationResult<Added> {
        require(name, "folder name")?;
        if name.contains('/') {
            return Err(MutationError::InvalidInput(format!(
                "folder name '{}' must not contain '/'",
                name
            )));
        }
        self.edit(|forest| {
            let id = next_id(forest);
            let target = resolve_folder_mut(forest, parent).ok_or_else(|| {
                MutationError::FolderNotFound {
                    path: parent.to_string(),
                }
            })?;
            target
                .children
                .push(Node::Folder(FolderNode::new(id.clone(), name)));
            debug!("Created folder {}", join(parent, name));
            Ok(Edited::write(Added { id }))
        })
    }

    fn move_bookmark(&self, url: &str, target: &str) -> MutationResult<Moved> {
        self.edit(|forest| move_in(forest, url, target).map(Edited::write))
    }

    fn rename_bookmark(&self, url: &str, title: &str) -> MutationResult<Renamed> {
        self.edit(|forest| {
            let address = find_by_url(forest, url)
                .map(|located| located.address)
                .ok_or_else(|| MutationError::BookmarkNotFound {
                    url: url.to_string(),
                })?;
            let node = forest
                .node_at_mut(&address)
                .ok_or_else(|| MutationError::BookmarkNotFound {
                    url: url.to_string(),
                })?;
            let old_title = node.name().to_string();
            node.set_name(title);
            Ok(Edited::write(Renamed {
                old_title,
                new_title: title.to_string(),
            }))
        })
    }

    fn delete_bookmark(&self, url: &str) -> MutationResult<Deleted> {
        self.edit(|forest| {
            let located =
                find_by_url(forest, url).ok_or_else(|| MutationError::BookmarkNotFound {
                    url: url.to_string(),
                })?;
            if located.is_root() {
                return Err(MutationError::CannotDeleteRoot {
                    url: url.to_string(),
                });
            }
            let folder = located.folder.clone().unwrap_or_default();
            let address = located.address.clone();

            let node = forest
                .remove_at(&address)
                .ok_or_else(|| MutationError::BookmarkNotFound {
                    url: url.to_string(),
                })?;
            Ok(Edited::write(Deleted {
                title: node.name().to_string(),
                folder,
            }))
        })
    }

    fn bulk_move(&self, moves: &[MoveRequest]) -> MutationResult<BulkMoved> {
        self.edit(|forest| {
            let mut result = BulkMoved {
                requested: moves.len(),
                ..BulkMoved::default()
            };
            for request in moves {
                match move_in(forest, &request.url, &request.target_folder) {
                    Ok(moved) => result.moved.push(moved),
                    Err(e) => {
                        warn!("Skipping move of {}: {}", request.url, e);
                        result.skipped.push(SkippedMove {
                            url: request.url.clone(),
                            target_folder: request.target_folder.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
            let dirty = !result.moved.is_empty();
            Ok(Edited {
                value: result,
                dirty,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ErrorKind;
    use crate::fixtures::{sample_bookmarks_file, SAMPLE_BOOKMARKS};
    use crate::locate::find_by_id;
    use crate::storage::StorageError;
    use std::fs;
    use std::sync::Arc;
    use std::thread;

    fn load(backend: &FileBackend) -> Forest {
        backend.file().load().unwrap().roots
    }

    #[test]
    fn test_add_then_find() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);

        let added = backend
            .add_bookmark("https://rust-lang.org", "Rust", "bookmark_bar/Work")
            .unwrap();

        let forest = load(&backend);
        let found = find_by_url(&forest, "https://rust-lang.org").unwrap();
        assert_eq!(found.node.id(), added.id);
        assert_eq!(found.node.name(), "Rust");
        assert_eq!(found.folder.as_deref(), Some("bookmark_bar/Work"));
        assert_eq!(found.index, Some(2));
    }

    #[test]
    fn test_add_is_not_idempotent() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);

        let first = backend.add_bookmark("https://a.com", "A", "other").unwrap();
        let second = backend.add_bookmark("https://a.com", "A", "other").unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(load(&backend).folder_structure()["other"].bookmarks, 3);
    }

    #[test]
    fn test_add_to_missing_folder_leaves_file_untouched() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);

        let err = backend
            .add_bookmark("https://a.com", "A", "bookmark_bar/Nope")
            .unwrap_err();

        assert!(matches!(err, MutationError::FolderNotFound { ref path } if path == "bookmark_bar/Nope"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE_BOOKMARKS);
    }

    #[test]
    fn test_add_rejects_empty_url() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);

        let err = backend.add_bookmark("  ", "A", "other").unwrap_err();
        assert!(matches!(err, MutationError::InvalidInput(_)));
        assert!(!backend.file().backup_path().exists());
    }

    #[test]
    fn test_create_folder_under_missing_parent() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);

        let err = backend
            .create_folder("X", "bookmark_bar/NoSuchFolder")
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE_BOOKMARKS);
        assert_eq!(
            fs::read_to_string(backend.file().backup_path()).unwrap(),
            SAMPLE_BOOKMARKS
        );
    }

    #[test]
    fn test_create_folder_rejects_slash_in_name() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);

        let err = backend.create_folder("a/b", "other").unwrap_err();

        assert!(matches!(err, MutationError::InvalidInput(ref msg) if msg.contains("a/b")));
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE_BOOKMARKS);
        assert!(!backend.file().backup_path().exists());
    }

    #[test]
    fn test_failed_backup_aborts_mutation() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);
        fs::create_dir(backend.file().backup_path()).unwrap();

        let err = backend
            .add_bookmark("https://a.com", "A", "bookmark_bar")
            .unwrap_err();

        assert!(matches!(
            err,
            MutationError::Storage(StorageError::BackupFailed { .. })
        ));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE_BOOKMARKS);
    }

    #[test]
    fn test_create_folder() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);

        let added = backend.create_folder("Reading", "other").unwrap();

        let forest = load(&backend);
        let folder = resolve_folder(&forest, "other/Reading").unwrap();
        assert_eq!(folder.id, added.id);
        assert!(folder.children.is_empty());
        assert_eq!(forest.folder_structure()["other"].subfolders, 1);
    }

    #[test]
    fn test_move_to_root() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);

        let moved = backend
            .move_bookmark("https://sqlite.org/guide", "bookmark_bar")
            .unwrap();
        assert_eq!(moved.from_folder, "bookmark_bar/Tutorials");
        assert_eq!(moved.to_folder, "bookmark_bar");

        let structure = load(&backend).folder_structure();
        assert_eq!(structure["bookmark_bar"].bookmarks, 2);
        assert_eq!(structure["bookmark_bar/Tutorials"].bookmarks, 0);
    }

    #[test]
    fn test_move_preserves_node() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);

        backend.move_bookmark("https://stackoverflow.com", "synced").unwrap();

        let forest = load(&backend);
        let found = find_by_id(&forest, "7").unwrap();
        assert_eq!(found.folder.as_deref(), Some("synced"));
        assert_eq!(found.node.name(), "Stack Overflow");
    }

    #[test]
    fn test_move_failures() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);

        assert!(matches!(
            backend.move_bookmark("https://missing.example", "other"),
            Err(MutationError::BookmarkNotFound { .. })
        ));
        assert!(matches!(
            backend.move_bookmark("https://docs.python.org", "other/Nope"),
            Err(MutationError::TargetFolderNotFound { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE_BOOKMARKS);
    }

    #[test]
    fn test_move_cycle_restores_counts() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);
        let before = load(&backend).folder_structure();

        let url = "https://jira.example.com/board";
        for target in ["other", "bookmark_bar/Tutorials", "synced", "bookmark_bar/Work"] {
            backend.move_bookmark(url, target).unwrap();
        }

        let forest = load(&backend);
        assert_eq!(
            find_by_url(&forest, url).unwrap().folder.as_deref(),
            Some("bookmark_bar/Work")
        );
        assert_eq!(forest.folder_structure(), before);
    }

    #[test]
    fn test_rename() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);

        let renamed = backend
            .rename_bookmark("https://confluence.example.com", "Wiki")
            .unwrap();
        assert_eq!(renamed.old_title, "Confluence");
        assert_eq!(renamed.new_title, "Wiki");

        let forest = load(&backend);
        assert_eq!(
            find_by_url(&forest, "https://confluence.example.com")
                .unwrap()
                .node
                .name(),
            "Wiki"
        );
    }

    #[test]
    fn test_delete() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);

        let deleted = backend.delete_bookmark("https://docs.python.org").unwrap();
        assert_eq!(deleted.title, "Python Docs");
        assert_eq!(deleted.folder, "bookmark_bar");

        let forest = load(&backend);
        assert!(find_by_url(&forest, "https://docs.python.org").is_none());
        assert!(matches!(
            backend.delete_bookmark("https://docs.python.org"),
            Err(MutationError::BookmarkNotFound { .. })
        ));
    }

    #[test]
    fn test_bulk_move_with_invalid_items() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);

        let moves = vec![
            MoveRequest::new("https://docs.python.org", "other"),
            MoveRequest::new("https://missing-one.example", "other"),
            MoveRequest::new("https://jira.example.com/board", "synced"),
            MoveRequest::new("https://missing-two.example", "synced"),
            MoveRequest::new("https://sqlite.org/guide", "bookmark_bar/Nope"),
        ];
        let result = backend.bulk_move(&moves).unwrap();

        assert_eq!(result.requested, 5);
        assert_eq!(result.success_count(), 2);
        assert_eq!(result.skipped.len(), 3);
        assert_eq!(result.moved[0].from_folder, "bookmark_bar");

        let forest = load(&backend);
        let structure = forest.folder_structure();
        assert_eq!(structure["other"].bookmarks, 2);
        assert_eq!(structure["synced"].bookmarks, 1);
        assert_eq!(
            find_by_url(&forest, "https://sqlite.org/guide")
                .unwrap()
                .folder
                .as_deref(),
            Some("bookmark_bar/Tutorials")
        );
    }

    #[test]
    fn test_bulk_move_all_invalid_skips_write() {
        let (_dir, path) = sample_bookmarks_file();
        let backend = FileBackend::new(&path);

        let result = backend
            .bulk_move(&[MoveRequest::new("https://missing.example", "other")])
            .unwrap();

        assert_eq!(result.success_count(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE_BOOKMARKS);
    }

    #[test]
    fn test_duplicate_ids_are_rejected_before_write() {
        let (_dir, path) = sample_bookmarks_file();
        let broken = SAMPLE_BOOKMARKS.replace(r#""id": "7""#, r#""id": "3""#);
        fs::write(&path, &broken).unwrap();
        let backend = FileBackend::new(&path);

        let err = backend.add_bookmark("https://a.com", "A", "other").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
        assert_eq!(fs::read_to_string(&path).unwrap(), broken);
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("Bookmarks"));

        let err = backend.delete_bookmark("https://a.com").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_next_id_is_increasing_and_unique() {
        let forest = crate::fixtures::sample_document().roots;
        let a: u64 = next_id(&forest).parse().unwrap();
        let b: u64 = next_id(&forest).parse().unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_concurrent_adds_are_serialised() {
        let (_dir, path) = sample_bookmarks_file();
        let path = Arc::new(path);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = Arc::clone(&path);
                thread::spawn(move || {
                    let backend = FileBackend::new(path.as_path());
                    backend
                        .add_bookmark(&format!("https://site{}.example", i), "Site", "other")
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let backend = FileBackend::new(path.as_path());
        let forest = load(&backend);
        assert_eq!(forest.flatten().len(), 13);
        assert!(forest.validate().is_ok());
    }
}

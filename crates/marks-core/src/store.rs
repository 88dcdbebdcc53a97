//! Unified bookmark interface
//!
//! `Bookmarks` ties together:
//! - a mutation backend (the bookmark file itself, or a live-edit relay)
//! - the change log (history and undo)
//! - the snapshot cache used for listing
//!
//! Every successful mutation is recorded in the change log, and the cache
//! is invalidated after every mutation or revert attempt.
//!
//! ## Usage
//!
//! ```ignore
//! let bookmarks = Bookmarks::open()?;
//!
//! bookmarks.add_bookmark("https://example.com", "Example", "bookmark_bar")?;
//! bookmarks.move_bookmark("https://example.com", "other")?;
//!
//! // Undo the move
//! bookmarks.revert_last_change()?;
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{
    Added, BookmarkBackend, BulkMoved, Deleted, MoveRequest, Moved, MutationError, Renamed,
};
use crate::cache::BookmarkCache;
use crate::changes::{BulkMoveEntry, ChangeDetails, ChangeLog, ChangeRecord};
use crate::config::Config;
use crate::document::FolderStructure;
use crate::models::FlatBookmark;
use crate::mutation::FileBackend;
use crate::path::join;
use crate::storage::BookmarkFile;

/// Reason reported when undo meets a folder creation
pub const CREATE_FOLDER_NOT_REVERTIBLE: &str =
    "Folder creation cannot be automatically undone. Delete the folder manually if needed.";

/// What `revert_last_change` did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RevertOutcome {
    /// No open change records
    NothingToRevert,
    /// The inverse was applied and the record closed
    Reverted { change: ChangeRecord },
    /// The record was closed without touching the tree
    Skipped { change: ChangeRecord, reason: String },
    /// The inverse could not be applied; the record stays open
    Failed { change: ChangeRecord, reason: String },
}

/// Entry point for reading and editing a bookmark file
pub struct Bookmarks {
    backend: Box<dyn BookmarkBackend>,
    file: BookmarkFile,
    changes: ChangeLog,
    cache: BookmarkCache,
    config: Config,
}

impl Bookmarks {
    /// Open using the configuration from the default location
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config)
    }

    /// Open with a specific configuration, editing the file directly
    pub fn open_with_config(config: Config) -> Result<Self> {
        let changes_path = config.changes_db_path();
        let changes = ChangeLog::open(&changes_path)
            .with_context(|| format!("Failed to open change log at {:?}", changes_path))?;
        let backend = Box::new(FileBackend::new(config.bookmarks_path()));
        Ok(Self::with_backend(config, backend, changes))
    }

    /// Assemble from parts, e.g. with a relay backend
    pub fn with_backend(
        config: Config,
        backend: Box<dyn BookmarkBackend>,
        changes: ChangeLog,
    ) -> Self {
        Self {
            file: BookmarkFile::new(config.bookmarks_path()),
            backend,
            changes,
            cache: BookmarkCache::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path of the bookmark document
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn backup_path(&self) -> PathBuf {
        self.file.backup_path()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn change_log(&self) -> &ChangeLog {
        &self.changes
    }

    // ==================== Reads ====================

    /// All bookmarks, optionally only those directly inside `folder`
    pub fn list_bookmarks(&self, folder: Option<&str>) -> Result<Vec<FlatBookmark>> {
        let snapshot = self.cache.get_or_load(|| self.load_flat())?;
        let bookmarks = match folder.map(|f| f.trim_matches('/')) {
            Some(folder) => snapshot
                .iter()
                .filter(|b| b.folder == folder)
                .cloned()
                .collect(),
            None => snapshot.to_vec(),
        };
        Ok(bookmarks)
    }

    /// Immediate-child tallies for every folder
    pub fn folder_structure(&self) -> Result<FolderStructure> {
        let doc = self
            .file
            .load()
            .with_context(|| format!("Failed to load {:?}", self.path()))?;
        Ok(doc.roots.folder_structure())
    }

    /// Change records, most recent first
    pub fn history(&self, limit: usize) -> Result<Vec<ChangeRecord>> {
        self.changes
            .get_history(limit)
            .context("Failed to read change history")
    }

    fn load_flat(&self) -> Result<Vec<FlatBookmark>> {
        let doc = self
            .file
            .load()
            .with_context(|| format!("Failed to load {:?}", self.path()))?;
        doc.roots
            .validate()
            .with_context(|| format!("Invalid bookmark tree in {:?}", self.path()))?;
        Ok(doc.roots.flatten())
    }

    // ==================== Mutations ====================

    fn record(&self, url: Option<&str>, details: ChangeDetails) -> Result<i64> {
        let id = self
            .changes
            .record_change(url, &details)
            .context("Failed to record change")?;
        info!(
            "{} {} (change {})",
            details.action(),
            url.unwrap_or("-"),
            id
        );
        Ok(id)
    }

    fn after<T>(&self, result: Result<T, MutationError>) -> Result<T, MutationError> {
        self.cache.invalidate();
        result
    }

    pub fn add_bookmark(&self, url: &str, title: &str, folder: &str) -> Result<Added> {
        let added = self
            .after(self.backend.add_bookmark(url, title, folder))
            .with_context(|| format!("Failed to add bookmark {}", url))?;
        self.record(
            Some(url),
            ChangeDetails::Add {
                title: title.to_string(),
                folder: folder.trim_matches('/').to_string(),
            },
        )?;
        Ok(added)
    }

    pub fn create_folder(&self, name: &str, parent: &str) -> Result<Added> {
        let added = self
            .after(self.backend.create_folder(name, parent))
            .with_context(|| format!("Failed to create folder '{}' in {}", name, parent))?;
        let parent = parent.trim_matches('/');
        self.record(
            None,
            ChangeDetails::CreateFolder {
                folder_name: name.to_string(),
                parent_folder: parent.to_string(),
                full_path: join(parent, name),
            },
        )?;
        Ok(added)
    }

    pub fn move_bookmark(&self, url: &str, target: &str) -> Result<Moved> {
        let moved = self
            .after(self.backend.move_bookmark(url, target))
            .with_context(|| format!("Failed to move {} to {}", url, target))?;
        self.record(
            Some(url),
            ChangeDetails::Move {
                from_folder: moved.from_folder.clone(),
                to_folder: moved.to_folder.clone(),
            },
        )?;
        Ok(moved)
    }

    pub fn rename_bookmark(&self, url: &str, title: &str) -> Result<Renamed> {
        let renamed = self
            .after(self.backend.rename_bookmark(url, title))
            .with_context(|| format!("Failed to rename {}", url))?;
        self.record(
            Some(url),
            ChangeDetails::Rename {
                old_title: renamed.old_title.clone(),
                new_title: renamed.new_title.clone(),
            },
        )?;
        Ok(renamed)
    }

    pub fn delete_bookmark(&self, url: &str) -> Result<Deleted> {
        let deleted = self
            .after(self.backend.delete_bookmark(url))
            .with_context(|| format!("Failed to delete {}", url))?;
        self.record(
            Some(url),
            ChangeDetails::Delete {
                title: deleted.title.clone(),
                folder: deleted.folder.clone(),
            },
        )?;
        Ok(deleted)
    }

    /// Move many bookmarks at once; only the moves that happened are recorded
    pub fn bulk_move(&self, moves: &[MoveRequest]) -> Result<BulkMoved> {
        let result = self
            .after(self.backend.bulk_move(moves))
            .context("Failed to apply bulk move")?;

        if result.success_count() > 0 {
            self.record(
                None,
                ChangeDetails::BulkMove {
                    moves: result
                        .moved
                        .iter()
                        .map(|m| BulkMoveEntry {
                            url: m.url.clone(),
                            original_folder: m.from_folder.clone(),
                            target_folder: m.to_folder.clone(),
                        })
                        .collect(),
                    success_count: result.success_count(),
                    total_requested: result.requested,
                },
            )?;
        }
        Ok(result)
    }

    // ==================== Undo ====================

    /// Undo the newest open change
    ///
    /// Failures of the inverse mutation are reported as
    /// [`RevertOutcome::Failed`] and leave the record open for a retry.
    /// Errors reading or updating the change log itself are returned as `Err`.
    pub fn revert_last_change(&self) -> Result<RevertOutcome> {
        let Some(change) = self
            .changes
            .get_last_revertable()
            .context("Failed to read change log")?
        else {
            return Ok(RevertOutcome::NothingToRevert);
        };

        if let ChangeDetails::CreateFolder { .. } = change.details {
            self.close(&change)?;
            return Ok(RevertOutcome::Skipped {
                change,
                reason: CREATE_FOLDER_NOT_REVERTIBLE.to_string(),
            });
        }

        let result = self.apply_inverse(&change);
        self.cache.invalidate();

        match result {
            Ok(()) => {
                self.close(&change)?;
                info!("Reverted {} change {}", change.action(), change.id);
                Ok(RevertOutcome::Reverted { change })
            }
            Err(reason) => {
                warn!("Could not revert change {}: {}", change.id, reason);
                Ok(RevertOutcome::Failed { change, reason })
            }
        }
    }

    fn close(&self, change: &ChangeRecord) -> Result<()> {
        self.changes
            .mark_reverted(change.id)
            .with_context(|| format!("Failed to mark change {} as reverted", change.id))?;
        Ok(())
    }

    fn apply_inverse(&self, change: &ChangeRecord) -> Result<(), String> {
        let url = change.url.as_deref();
        let require_url = || url.ok_or_else(|| format!("change {} has no url", change.id));
        let backend = &self.backend;

        match &change.details {
            ChangeDetails::Move { from_folder, .. } => backend
                .move_bookmark(require_url()?, from_folder)
                .map(drop)
                .map_err(|e| e.to_string()),
            ChangeDetails::Rename { old_title, .. } => backend
                .rename_bookmark(require_url()?, old_title)
                .map(drop)
                .map_err(|e| e.to_string()),
            ChangeDetails::Delete { title, folder } => backend
                .add_bookmark(require_url()?, title, folder)
                .map(drop)
                .map_err(|e| e.to_string()),
            ChangeDetails::Add { .. } => backend
                .delete_bookmark(require_url()?)
                .map(drop)
                .map_err(|e| e.to_string()),
            ChangeDetails::BulkMove { moves, .. } => {
                let inverse: Vec<MoveRequest> = moves
                    .iter()
                    .map(|m| MoveRequest::new(m.url.clone(), m.original_folder.clone()))
                    .collect();
                let result = backend.bulk_move(&inverse).map_err(|e| e.to_string())?;
                if result.success_count() == 0 {
                    return Err(format!(
                        "none of the {} moves could be reverted",
                        inverse.len()
                    ));
                }
                Ok(())
            }
            ChangeDetails::CreateFolder { .. } => Err(CREATE_FOLDER_NOT_REVERTIBLE.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ErrorKind;
    use crate::changes::ChangeAction;
    use crate::fixtures::{sample_bookmarks_file, SAMPLE_BOOKMARKS};
    use crate::locate::find_by_url;
    use crate::storage::StorageError;
    use std::fs;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir, bookmarks: &Path) -> Config {
        Config {
            bookmarks_file: Some(bookmarks.to_path_buf()),
            data_dir: temp_dir.path().join("data"),
            ..Config::default()
        }
    }

    fn open_sample() -> (TempDir, Bookmarks) {
        let (temp_dir, path) = sample_bookmarks_file();
        let bookmarks = Bookmarks::open_with_config(test_config(&temp_dir, &path)).unwrap();
        (temp_dir, bookmarks)
    }

    fn folder_of(bookmarks: &Bookmarks, url: &str) -> Option<String> {
        let doc = BookmarkFile::new(bookmarks.path()).load().unwrap();
        find_by_url(&doc.roots, url).and_then(|found| found.folder)
    }

    #[test]
    fn test_open_creates_change_log() {
        let (temp_dir, bookmarks) = open_sample();
        assert!(temp_dir.path().join("data").join("changes.db").exists());
        assert_eq!(bookmarks.backend_name(), "file");
        assert!(bookmarks.history(10).unwrap().is_empty());
    }

    #[test]
    fn test_move_out_of_only_child_folder() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Bookmarks");
        let doc = serde_json::json!({
            "roots": {
                "bookmark_bar": {
                    "children": [{
                        "children": [
                            {"id": "3", "name": "A", "type": "url", "url": "https://a.com"}
                        ],
                        "id": "2", "name": "Work", "type": "folder"
                    }],
                    "id": "1", "name": "Bookmarks Bar", "type": "folder"
                },
                "other": {"children": [], "id": "4", "name": "Other Bookmarks", "type": "folder"},
                "synced": {"children": [], "id": "5", "name": "Mobile Bookmarks", "type": "folder"}
            },
            "version": 1
        });
        fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();
        let bookmarks = Bookmarks::open_with_config(test_config(&temp_dir, &path)).unwrap();

        bookmarks.move_bookmark("https://a.com", "bookmark_bar").unwrap();

        let structure = bookmarks.folder_structure().unwrap();
        assert_eq!(structure["bookmark_bar"].bookmarks, 1);
        assert_eq!(structure["bookmark_bar/Work"].bookmarks, 0);
    }

    #[test]
    fn test_failed_mutation_records_nothing() {
        let (_temp_dir, bookmarks) = open_sample();

        let err = bookmarks
            .create_folder("X", "bookmark_bar/NoSuchFolder")
            .unwrap_err();

        let mutation = err.downcast_ref::<MutationError>().unwrap();
        assert_eq!(mutation.kind(), ErrorKind::NotFound);
        assert_eq!(fs::read_to_string(bookmarks.path()).unwrap(), SAMPLE_BOOKMARKS);
        assert!(bookmarks.backup_path().exists());
        assert_eq!(bookmarks.change_log().count().unwrap(), 0);
    }

    #[test]
    fn test_failed_backup_records_nothing() {
        let (_temp_dir, bookmarks) = open_sample();
        fs::create_dir(bookmarks.backup_path()).unwrap();

        let err = bookmarks
            .add_bookmark("https://a.com", "A", "bookmark_bar")
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<MutationError>(),
            Some(MutationError::Storage(StorageError::BackupFailed { .. }))
        ));
        assert_eq!(fs::read_to_string(bookmarks.path()).unwrap(), SAMPLE_BOOKMARKS);
        assert_eq!(bookmarks.change_log().count().unwrap(), 0);
    }

    #[test]
    fn test_add_then_list() {
        let (_temp_dir, bookmarks) = open_sample();
        assert_eq!(bookmarks.list_bookmarks(None).unwrap().len(), 5);

        bookmarks
            .add_bookmark("https://rust-lang.org", "Rust", "bookmark_bar/Tutorials")
            .unwrap();

        let tutorials = bookmarks
            .list_bookmarks(Some("bookmark_bar/Tutorials"))
            .unwrap();
        assert_eq!(tutorials.len(), 2);
        assert_eq!(tutorials[1].title, "Rust");
        assert_eq!(bookmarks.list_bookmarks(None).unwrap().len(), 6);

        let history = bookmarks.history(10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action(), ChangeAction::Add);
        assert_eq!(history[0].url.as_deref(), Some("https://rust-lang.org"));
    }

    #[test]
    fn test_list_folder_filter_is_exact() {
        let (_temp_dir, bookmarks) = open_sample();

        let bar = bookmarks.list_bookmarks(Some("/bookmark_bar/")).unwrap();
        assert_eq!(bar.len(), 1);
        assert_eq!(bar[0].url, "https://docs.python.org");
        assert!(bookmarks.list_bookmarks(Some("bookmark")).unwrap().is_empty());
    }

    #[test]
    fn test_revert_in_reverse_order() {
        let (_temp_dir, bookmarks) = open_sample();
        let url = "https://confluence.example.com";

        bookmarks.rename_bookmark(url, "Wiki").unwrap();
        bookmarks.move_bookmark(url, "other").unwrap();

        let first = bookmarks.revert_last_change().unwrap();
        let RevertOutcome::Reverted { change } = first else {
            panic!("expected a revert, got {:?}", first);
        };
        assert_eq!(change.action(), ChangeAction::Move);
        assert_eq!(folder_of(&bookmarks, url).as_deref(), Some("bookmark_bar/Work"));
        assert_eq!(bookmarks.history(10).unwrap().iter().filter(|c| c.reverted).count(), 1);

        let second = bookmarks.revert_last_change().unwrap();
        let RevertOutcome::Reverted { change } = second else {
            panic!("expected a revert, got {:?}", second);
        };
        assert_eq!(change.action(), ChangeAction::Rename);

        let listed = bookmarks.list_bookmarks(Some("bookmark_bar/Work")).unwrap();
        assert!(listed.iter().any(|b| b.url == url && b.title == "Confluence"));

        assert_eq!(
            bookmarks.revert_last_change().unwrap(),
            RevertOutcome::NothingToRevert
        );
    }

    #[test]
    fn test_revert_delete_restores_bookmark() {
        let (_temp_dir, bookmarks) = open_sample();
        let url = "https://stackoverflow.com";

        bookmarks.delete_bookmark(url).unwrap();
        assert!(folder_of(&bookmarks, url).is_none());

        assert!(matches!(
            bookmarks.revert_last_change().unwrap(),
            RevertOutcome::Reverted { .. }
        ));

        let restored = bookmarks.list_bookmarks(Some("other")).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].url, url);
        assert_eq!(restored[0].title, "Stack Overflow");
        assert_ne!(restored[0].id, "7");
    }

    #[test]
    fn test_revert_add_deletes_bookmark() {
        let (_temp_dir, bookmarks) = open_sample();

        bookmarks
            .add_bookmark("https://new.example", "New", "synced")
            .unwrap();
        bookmarks.revert_last_change().unwrap();

        assert!(folder_of(&bookmarks, "https://new.example").is_none());
        assert_eq!(fs::read_to_string(bookmarks.path()).unwrap(), SAMPLE_BOOKMARKS);
    }

    #[test]
    fn test_revert_create_folder_is_skipped() {
        let (_temp_dir, bookmarks) = open_sample();

        bookmarks.create_folder("Reading", "other").unwrap();
        let history = bookmarks.history(1).unwrap();
        assert_eq!(
            history[0].details,
            ChangeDetails::CreateFolder {
                folder_name: "Reading".into(),
                parent_folder: "other".into(),
                full_path: "other/Reading".into(),
            }
        );

        match bookmarks.revert_last_change().unwrap() {
            RevertOutcome::Skipped { reason, .. } => {
                assert_eq!(reason, CREATE_FOLDER_NOT_REVERTIBLE)
            }
            other => panic!("expected skip, got {:?}", other),
        }

        assert!(bookmarks.folder_structure().unwrap().contains_key("other/Reading"));
        assert_eq!(
            bookmarks.revert_last_change().unwrap(),
            RevertOutcome::NothingToRevert
        );
    }

    #[test]
    fn test_failed_revert_keeps_record_open() {
        let (_temp_dir, bookmarks) = open_sample();
        let url = "https://docs.python.org";

        let renamed = bookmarks.rename_bookmark(url, "Docs").unwrap();
        assert_eq!(renamed.old_title, "Python Docs");

        // Removed behind the change log's back
        FileBackend::new(bookmarks.path())
            .delete_bookmark(url)
            .unwrap();

        let outcome = bookmarks.revert_last_change().unwrap();
        let RevertOutcome::Failed { change, reason } = outcome else {
            panic!("expected failure, got {:?}", outcome);
        };
        assert!(reason.contains(url));

        let still_open = bookmarks.change_log().get_last_revertable().unwrap().unwrap();
        assert_eq!(still_open.id, change.id);
    }

    #[test]
    fn test_bulk_move_records_successes_only() {
        let (_temp_dir, bookmarks) = open_sample();

        let moves = vec![
            MoveRequest::new("https://docs.python.org", "synced"),
            MoveRequest::new("https://nope-1.example", "synced"),
            MoveRequest::new("https://jira.example.com/board", "other"),
            MoveRequest::new("https://nope-2.example", "other"),
        ];
        let result = bookmarks.bulk_move(&moves).unwrap();
        assert_eq!(result.success_count(), 2);

        let history = bookmarks.history(1).unwrap();
        let ChangeDetails::BulkMove {
            moves: recorded,
            success_count,
            total_requested,
        } = &history[0].details
        else {
            panic!("expected bulk move record");
        };
        assert_eq!(recorded.len(), 2);
        assert_eq!(*success_count, 2);
        assert_eq!(*total_requested, 4);
        assert_eq!(recorded[1].original_folder, "bookmark_bar/Work");

        assert!(matches!(
            bookmarks.revert_last_change().unwrap(),
            RevertOutcome::Reverted { .. }
        ));
        assert_eq!(
            folder_of(&bookmarks, "https://docs.python.org").as_deref(),
            Some("bookmark_bar")
        );
        assert_eq!(
            folder_of(&bookmarks, "https://jira.example.com/board").as_deref(),
            Some("bookmark_bar/Work")
        );
    }

    #[test]
    fn test_bulk_move_without_successes_is_not_recorded() {
        let (_temp_dir, bookmarks) = open_sample();

        let result = bookmarks
            .bulk_move(&[MoveRequest::new("https://nope.example", "other")])
            .unwrap();

        assert_eq!(result.success_count(), 0);
        assert_eq!(bookmarks.change_log().count().unwrap(), 0);
    }

    #[test]
    fn test_history_persists_across_reopens() {
        let (temp_dir, path) = sample_bookmarks_file();
        let config = test_config(&temp_dir, &path);

        {
            let bookmarks = Bookmarks::open_with_config(config.clone()).unwrap();
            bookmarks
                .move_bookmark("https://stackoverflow.com", "synced")
                .unwrap();
        }

        let bookmarks = Bookmarks::open_with_config(config).unwrap();
        assert_eq!(bookmarks.history(10).unwrap().len(), 1);
        bookmarks.revert_last_change().unwrap();
        assert_eq!(
            folder_of(&bookmarks, "https://stackoverflow.com").as_deref(),
            Some("other")
        );
    }
}

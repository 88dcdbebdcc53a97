//! marks core library
//!
//! This crate reads and edits a Chromium-family browser's `Bookmarks` file:
//! a forest of folders under the fixed roots `bookmark_bar`, `other` and
//! `synced`, addressed by `/`-joined folder paths.
//!
//! # Architecture
//!
//! - **Bookmarks file**: source of truth. Backed up and atomically replaced
//!   on every mutation, with unknown fields preserved verbatim.
//! - **SQLite**: change log of committed mutations, used for history and
//!   single-step undo.
//!
//! # Quick Start
//!
//! ```text
//! let bookmarks = Bookmarks::open()?;
//!
//! bookmarks.add_bookmark("https://example.com", "Example", "bookmark_bar/Work")?;
//! let work = bookmarks.list_bookmarks(Some("bookmark_bar/Work"))?;
//!
//! bookmarks.revert_last_change()?;
//! ```
//!
//! # Modules
//!
//! - `store`: `Bookmarks` facade (main entry point)
//! - `models`: node types and root keys
//! - `document`: the whole document and its forest of roots
//! - `path`: folder path resolution
//! - `locate`: lookup by URL or id
//! - `backend`: mutation capability and its outcomes
//! - `mutation`: direct-file backend
//! - `changes`: change log
//! - `cache`: listing snapshot cache
//! - `storage`: file persistence, locking and the change log schema
//! - `config`: application configuration

pub mod backend;
pub mod cache;
pub mod changes;
pub mod config;
pub mod document;
pub mod locate;
pub mod models;
pub mod mutation;
pub mod path;
pub mod storage;
pub mod store;

#[cfg(test)]
pub(crate) mod fixtures;

pub use backend::{
    Added, BookmarkBackend, BulkMoved, Deleted, ErrorKind, MoveRequest, Moved, MutationError,
    MutationResult, Renamed, SkippedMove,
};
pub use cache::BookmarkCache;
pub use changes::{BulkMoveEntry, ChangeAction, ChangeDetails, ChangeLog, ChangeRecord};
pub use config::Config;
pub use document::{BookmarkDocument, FolderStructure, Forest};
pub use locate::{find_by_id, find_by_url, Located, NodeAddress, NodeRef};
pub use models::{FlatBookmark, FolderNode, FolderSummary, Node, RootKey, TreeError, UrlNode};
pub use mutation::FileBackend;
pub use path::resolve_folder;
pub use storage::{BookmarkFile, StorageError};
pub use store::{Bookmarks, RevertOutcome};

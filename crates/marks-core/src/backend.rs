//! Mutation capability
//!
//! The six structural mutations are exposed as a trait so callers do not
//! care whether the direct-file engine or a live-edit relay inside the
//! browser carried out the write. Every outcome carries the before-state
//! needed to undo it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::TreeError;
use crate::storage::error::StorageError;

/// Coarse classification of a mutation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// File, folder or bookmark absent
    NotFound,
    /// Document or input cannot be interpreted
    Malformed,
    /// Attempt to detach a root, or duplicate ids in the tree
    InvariantViolation,
    /// Filesystem or database failure
    Io,
}

/// Errors from the mutation engine
///
/// All precondition failures are detected before anything is written.
#[derive(Error, Debug)]
pub enum MutationError {
    #[error("Folder not found: '{path}'")]
    FolderNotFound { path: String },

    #[error("Bookmark not found: '{url}'")]
    BookmarkNotFound { url: String },

    #[error("Target folder not found: '{path}'")]
    TargetFolderNotFound { path: String },

    #[error("Cannot move root folder '{url}'")]
    CannotMoveRoot { url: String },

    #[error("Cannot delete root folder '{url}'")]
    CannotDeleteRoot { url: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl MutationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MutationError::FolderNotFound { .. }
            | MutationError::BookmarkNotFound { .. }
            | MutationError::TargetFolderNotFound { .. } => ErrorKind::NotFound,
            MutationError::CannotMoveRoot { .. } | MutationError::CannotDeleteRoot { .. } => {
                ErrorKind::InvariantViolation
            }
            MutationError::InvalidInput(_) => ErrorKind::Malformed,
            MutationError::Tree(TreeError::InvalidNode { .. }) => ErrorKind::Malformed,
            MutationError::Tree(_) => ErrorKind::InvariantViolation,
            MutationError::Storage(StorageError::NotFound { .. }) => ErrorKind::NotFound,
            MutationError::Storage(StorageError::Malformed { .. }) => ErrorKind::Malformed,
            MutationError::Storage(_) => ErrorKind::Io,
        }
    }
}

pub type MutationResult<T> = Result<T, MutationError>;

/// A node was created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Added {
    pub id: String,
}

/// A bookmark changed folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moved {
    pub url: String,
    pub from_folder: String,
    pub to_folder: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renamed {
    pub old_title: String,
    pub new_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    pub title: String,
    pub folder: String,
}

/// One item of a bulk move request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub url: String,
    pub target_folder: String,
}

impl MoveRequest {
    pub fn new(url: impl Into<String>, target_folder: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            target_folder: target_folder.into(),
        }
    }
}

/// A bulk move item that was not applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedMove {
    pub url: String,
    pub target_folder: String,
    pub reason: String,
}

/// Result of a bulk move; partial failure is not an error
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BulkMoved {
    pub moved: Vec<Moved>,
    pub skipped: Vec<SkippedMove>,
    pub requested: usize,
}

impl BulkMoved {
    pub fn success_count(&self) -> usize {
        self.moved.len()
    }
}

/// Something that can apply structural edits to a bookmark document
pub trait BookmarkBackend: Send + Sync {
    /// Short name for diagnostics
    fn name(&self) -> &str;

    /// Append a new bookmark to the folder at `folder`
    fn add_bookmark(&self, url: &str, title: &str, folder: &str) -> MutationResult<Added>;

    /// Append a new empty folder under `parent`
    fn create_folder(&self, name: &str, parent: &str) -> MutationResult<Added>;

    /// Detach the first bookmark with `url` and append it to `target`
    fn move_bookmark(&self, url: &str, target: &str) -> MutationResult<Moved>;

    fn rename_bookmark(&self, url: &str, title: &str) -> MutationResult<Renamed>;

    fn delete_bookmark(&self, url: &str) -> MutationResult<Deleted>;

    /// Move each valid item, skipping invalid ones
    fn bulk_move(&self, moves: &[MoveRequest]) -> MutationResult<BulkMoved>;
}

//! Bookmark file persistence
//!
//! Loads the browser's `Bookmarks` JSON file and writes it back with atomic
//! writes (write to a temp sibling, then rename) so a concurrent reader,
//! including the browser itself, never sees a half-written file.
//!
//! Files next to the document:
//! - `Bookmarks.bak` - copy of the document taken before every mutation
//! - `Bookmarks.tmp` - transient, exists only during a write

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::debug;

use super::error::{StorageError, StorageResult};
use crate::document::BookmarkDocument;

/// Suffix of the pre-mutation backup
pub const BACKUP_SUFFIX: &str = ".bak";

/// Suffix of the temp file used by atomic writes
pub const TEMP_SUFFIX: &str = ".tmp";

/// Indentation the browser uses for its own writes
const INDENT: &[u8] = b"   ";

/// A bookmark document on disk
#[derive(Debug, Clone)]
pub struct BookmarkFile {
    path: PathBuf,
}

impl BookmarkFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where [`BookmarkFile::backup`] copies the document
    pub fn backup_path(&self) -> PathBuf {
        sibling(&self.path, BACKUP_SUFFIX)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load and parse the document
    ///
    /// Fails with `NotFound` if the file is absent and `Malformed` if the
    /// content is not a bookmark document.
    pub fn load(&self) -> StorageResult<BookmarkDocument> {
        let bytes =
            fs::read(&self.path).map_err(|e| StorageError::from_read(e, self.path.clone()))?;

        let mut doc: BookmarkDocument =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::Malformed {
                path: self.path.clone(),
                details: e.to_string(),
            })?;
        doc.trailing_newline = bytes.ends_with(b"\n");
        Ok(doc)
    }

    /// Copy the current document to its backup sibling
    ///
    /// The backup is overwritten on every call.
    pub fn backup(&self) -> StorageResult<PathBuf> {
        let backup_path = self.backup_path();

        fs::copy(&self.path, &backup_path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound if !self.path.exists() => StorageError::NotFound {
                path: self.path.clone(),
            },
            _ => StorageError::BackupFailed {
                path: self.path.clone(),
                backup_path: backup_path.clone(),
                source,
            },
        })?;

        debug!("Backed up {:?} to {:?}", self.path, backup_path);
        Ok(backup_path)
    }

    /// Serialize the document and atomically replace the file
    pub fn write_atomic(&self, doc: &BookmarkDocument) -> StorageResult<()> {
        let bytes = to_json_bytes(doc)?;
        atomic_write(&self.path, &bytes)?;
        debug!("Wrote {} bytes to {:?}", bytes.len(), self.path);
        Ok(())
    }
}

/// Serialize a document the way the browser does: sorted keys, three-space indent
///
/// A trailing newline is written back only if the loaded file had one.
pub fn to_json_bytes(doc: &BookmarkDocument) -> StorageResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(INDENT));
    doc.serialize(&mut serializer)?;
    if doc.trailing_newline {
        out.push(b'\n');
    }
    Ok(out)
}

/// `path` with `suffix` appended to its file name
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// This ensures the target file is never left in a partially-written state.
pub fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = sibling(path, TEMP_SUFFIX);

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    drop(file);

    if let Err(source) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(StorageError::AtomicWriteFailed {
            from: temp_path,
            to: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}

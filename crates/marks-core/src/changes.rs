//! Change log and undo state
//!
//! Every committed mutation appends one [`ChangeRecord`] carrying enough
//! before-state to compute its inverse. A record starts open
//! (`reverted = false`) and is closed for good by
//! [`ChangeLog::mark_reverted`]. Records are totally ordered by id; undo
//! always targets the newest open one.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{init_schema, needs_init};

/// Kind of mutation a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Add,
    Move,
    Rename,
    Delete,
    CreateFolder,
    BulkMove,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Add => "add",
            ChangeAction::Move => "move",
            ChangeAction::Rename => "rename",
            ChangeAction::Delete => "delete",
            ChangeAction::CreateFolder => "create_folder",
            ChangeAction::BulkMove => "bulk_move",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(ChangeAction::Add),
            "move" => Ok(ChangeAction::Move),
            "rename" => Ok(ChangeAction::Rename),
            "delete" => Ok(ChangeAction::Delete),
            "create_folder" => Ok(ChangeAction::CreateFolder),
            "bulk_move" => Ok(ChangeAction::BulkMove),
            other => Err(format!("unknown change action '{}'", other)),
        }
    }
}

/// One item of a committed bulk move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkMoveEntry {
    pub url: String,
    pub original_folder: String,
    pub target_folder: String,
}

/// Before/after state of a mutation, stored as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChangeDetails {
    Add {
        title: String,
        folder: String,
    },
    Move {
        from_folder: String,
        to_folder: String,
    },
    Rename {
        old_title: String,
        new_title: String,
    },
    Delete {
        title: String,
        folder: String,
    },
    CreateFolder {
        folder_name: String,
        parent_folder: String,
        full_path: String,
    },
    BulkMove {
        moves: Vec<BulkMoveEntry>,
        success_count: usize,
        total_requested: usize,
    },
}

impl ChangeDetails {
    pub fn action(&self) -> ChangeAction {
        match self {
            ChangeDetails::Add { .. } => ChangeAction::Add,
            ChangeDetails::Move { .. } => ChangeAction::Move,
            ChangeDetails::Rename { .. } => ChangeAction::Rename,
            ChangeDetails::Delete { .. } => ChangeAction::Delete,
            ChangeDetails::CreateFolder { .. } => ChangeAction::CreateFolder,
            ChangeDetails::BulkMove { .. } => ChangeAction::BulkMove,
        }
    }
}

/// A row of the change log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    /// Subject bookmark, absent for folder creation and bulk moves
    pub url: Option<String>,
    pub details: ChangeDetails,
    pub reverted: bool,
}

impl ChangeRecord {
    pub fn action(&self) -> ChangeAction {
        self.details.action()
    }

    /// One-line human description
    pub fn summary(&self) -> String {
        let url = self.url.as_deref().unwrap_or("-");
        match &self.details {
            ChangeDetails::Add { title, folder } => {
                format!("Added '{}' ({}) to {}", title, url, folder)
            }
            ChangeDetails::Move {
                from_folder,
                to_folder,
            } => format!("Moved {} from {} to {}", url, from_folder, to_folder),
            ChangeDetails::Rename {
                old_title,
                new_title,
            } => format!("Renamed {} from '{}' to '{}'", url, old_title, new_title),
            ChangeDetails::Delete { title, folder } => {
                format!("Deleted '{}' ({}) from {}", title, url, folder)
            }
            ChangeDetails::CreateFolder { full_path, .. } => {
                format!("Created folder {}", full_path)
            }
            ChangeDetails::BulkMove {
                success_count,
                total_requested,
                ..
            } => format!(
                "Moved {} of {} bookmarks",
                success_count, total_requested
            ),
        }
    }
}

/// SQLite-backed change log
pub struct ChangeLog {
    conn: Connection,
}

impl ChangeLog {
    /// Open or create the change log database
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        if needs_init(&conn) {
            init_schema(&conn)?;
        }

        debug!("Opened change log at {:?}", path);
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Append a record; returns its id
    pub fn record_change(&self, url: Option<&str>, details: &ChangeDetails) -> StorageResult<i64> {
        let json = serde_json::to_string(details)?;
        self.conn.execute(
            "INSERT INTO bookmark_changes (timestamp, action, url, details) VALUES (?, ?, ?, ?)",
            params![
                Utc::now().to_rfc3339(),
                details.action().as_str(),
                url,
                json
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent records first
    pub fn get_history(&self, limit: usize) -> StorageResult<Vec<ChangeRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, url, details, reverted FROM bookmark_changes ORDER BY id DESC LIMIT ?",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![limit], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// The newest record that has not been reverted
    pub fn get_last_revertable(&self) -> StorageResult<Option<ChangeRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, timestamp, url, details, reverted FROM bookmark_changes \
                 WHERE reverted = 0 ORDER BY id DESC LIMIT 1",
                [],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Close a record; false if the id is unknown
    pub fn mark_reverted(&self, id: i64) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE bookmark_changes SET reverted = 1 WHERE id = ?",
            params![id],
        )?;
        Ok(changed > 0)
    }

    /// Total number of records
    pub fn count(&self) -> StorageResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM bookmark_changes", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn conversion_error(
    column: usize,
    error: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(error))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ChangeRecord> {
    let timestamp: String = row.get(1)?;
    let details: String = row.get(3)?;

    Ok(ChangeRecord {
        id: row.get(0)?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| conversion_error(1, e))?
            .with_timezone(&Utc),
        url: row.get(2)?,
        details: serde_json::from_str(&details).map_err(|e| conversion_error(3, e))?,
        reverted: row.get(4)?,
    })
}

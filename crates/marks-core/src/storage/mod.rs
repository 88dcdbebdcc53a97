//! Storage layer
//!
//! ## Architecture
//!
//! - **Bookmarks file**: the browser's JSON document, source of truth for
//!   the tree. Backed up before and replaced atomically on every mutation.
//! - **SQLite**: the change log used for history and undo.

pub mod error;
pub mod lock;
pub mod persistence;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use lock::DocumentLock;
pub use persistence::{atomic_write, BookmarkFile};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};

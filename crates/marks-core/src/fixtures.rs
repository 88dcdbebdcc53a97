//! Shared test fixtures

use std::path::PathBuf;

use tempfile::TempDir;

use crate::document::BookmarkDocument;

/// A small bookmark file: a URL and two folders on the bar, one URL under
/// "Other Bookmarks" and an empty mobile root.
pub const SAMPLE_BOOKMARKS: &str = r#"{
   "checksum": "test",
   "roots": {
      "bookmark_bar": {
         "children": [
            {
               "id": "1",
               "name": "Python Docs",
               "type": "url",
               "url": "https://docs.python.org"
            },
            {
               "children": [
                  {
                     "id": "3",
                     "name": "Jira Board",
                     "type": "url",
                     "url": "https://jira.example.com/board"
                  },
                  {
                     "id": "4",
                     "name": "Confluence",
                     "type": "url",
                     "url": "https://confluence.example.com"
                  }
               ],
               "id": "2",
               "name": "Work",
               "type": "folder"
            },
            {
               "children": [
                  {
                     "id": "6",
                     "name": "SQLite Guide",
                     "type": "url",
                     "url": "https://sqlite.org/guide"
                  }
               ],
               "id": "5",
               "name": "Tutorials",
               "type": "folder"
            }
         ],
         "id": "0",
         "name": "Bookmarks Bar",
         "type": "folder"
      },
      "other": {
         "children": [
            {
               "id": "7",
               "name": "Stack Overflow",
               "type": "url",
               "url": "https://stackoverflow.com"
            }
         ],
         "id": "100",
         "name": "Other Bookmarks",
         "type": "folder"
      },
      "synced": {
         "children": [],
         "id": "200",
         "name": "Mobile Bookmarks",
         "type": "folder"
      }
   },
   "version": 1
}"#;

pub fn sample_document() -> BookmarkDocument {
    serde_json::from_str(SAMPLE_BOOKMARKS).unwrap()
}

/// Write the sample file into a fresh temp dir
pub fn sample_bookmarks_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("Bookmarks");
    std::fs::write(&path, SAMPLE_BOOKMARKS).unwrap();
    (temp_dir, path)
}

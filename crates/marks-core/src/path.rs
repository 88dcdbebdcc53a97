//! Folder path resolution
//!
//! A folder path is `/`-joined: the first segment is a root key
//! (`bookmark_bar`, `other`, `synced`), each following segment is the exact,
//! case-sensitive name of a child folder. Leading and trailing slashes are
//! ignored. Missing segments are never created.
//!
//! Sibling folders may share a name; the first one in document order wins.

use crate::document::Forest;
use crate::models::{FolderNode, RootKey};

/// Split a path into its root key and the folder names below it
fn split<'p>(path: &'p str) -> Option<(RootKey, impl Iterator<Item = &'p str> + 'p)> {
    let mut segments = path.trim_matches('/').split('/');
    let root = segments.next()?.parse::<RootKey>().ok()?;
    Some((root, segments))
}

/// Resolve a folder path to its folder node
pub fn resolve_folder<'a>(forest: &'a Forest, path: &str) -> Option<&'a FolderNode> {
    let (root, segments) = split(path)?;
    let mut current = forest.find_root(root)?;
    for segment in segments {
        current = current.subfolder(segment)?;
    }
    Some(current)
}

/// Mutable variant of [`resolve_folder`]
pub fn resolve_folder_mut<'a>(forest: &'a mut Forest, path: &str) -> Option<&'a mut FolderNode> {
    let (root, segments) = split(path)?;
    let mut current = forest.find_root_mut(root)?;
    for segment in segments {
        current = current.subfolder_mut(segment)?;
    }
    Some(current)
}

/// Join a parent folder path and a child name
pub fn join(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name)
}

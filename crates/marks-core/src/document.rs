//! Bookmark document handling
//!
//! The document is the browser's `Bookmarks` JSON file:
//!
//! ```text
//! { "checksum": "...", "roots": { "bookmark_bar": {...}, "other": {...}, "synced": {...} }, "version": 1 }
//! ```
//!
//! Only the `roots` forest is interpreted. Top-level fields and any unknown
//! root entries are carried through unchanged.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::locate::NodeAddress;
use crate::models::{keys, FlatBookmark, FolderNode, FolderSummary, Node, RootKey, TreeError};

/// Folder path -> immediate-child tallies
pub type FolderStructure = BTreeMap<String, FolderSummary>;

/// The whole bookmark file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct BookmarkDocument {
    pub roots: Forest,
    /// Top-level fields other than `roots` (checksum, version, ...)
    pub extra: Map<String, Value>,
    /// Whether the file on disk ended with a newline
    pub trailing_newline: bool,
}

/// The set of root folders
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Forest {
    roots: BTreeMap<RootKey, FolderNode>,
    /// Root entries with keys we do not know about
    extra: Map<String, Value>,
}

impl Forest {
    /// Build a forest from root folders
    pub fn new(roots: impl IntoIterator<Item = (RootKey, FolderNode)>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
            extra: Map::new(),
        }
    }

    /// Look up a root folder by key
    pub fn find_root(&self, key: RootKey) -> Option<&FolderNode> {
        self.roots.get(&key)
    }

    pub fn find_root_mut(&mut self, key: RootKey) -> Option<&mut FolderNode> {
        self.roots.get_mut(&key)
    }

    /// Iterate present roots in traversal order
    pub fn roots(&self) -> impl Iterator<Item = (RootKey, &FolderNode)> {
        self.roots.iter().map(|(key, folder)| (*key, folder))
    }

    /// Check tree invariants: every id is unique across the forest
    pub fn validate(&self) -> Result<(), TreeError> {
        let mut seen = HashSet::new();
        for (_, root) in self.roots() {
            check_unique(root, &mut seen)?;
        }
        Ok(())
    }

    /// True if any node in the forest carries this id
    pub fn contains_id(&self, id: &str) -> bool {
        self.roots()
            .any(|(_, root)| root.id == id || subtree_contains_id(root, id))
    }

    /// Flatten every URL bookmark with its derived folder path
    ///
    /// Order is root order, then document order (pre-order) within a root.
    pub fn flatten(&self) -> Vec<FlatBookmark> {
        let mut out = Vec::new();
        for (key, root) in self.roots() {
            flatten_into(root, key.as_str(), &mut out);
        }
        out
    }

    /// Immediate-child tallies for every folder, keyed by folder path
    pub fn folder_structure(&self) -> FolderStructure {
        let mut out = FolderStructure::new();
        for (key, root) in self.roots() {
            summarize_into(root, key.as_str().to_string(), &mut out);
        }
        out
    }

    /// Folder path of the node at `address`'s parent
    ///
    /// Returns `None` for a root address or one that no longer resolves.
    pub fn parent_path(&self, address: &NodeAddress) -> Option<String> {
        let (_, parent_indices) = address.path.split_last()?;
        let mut current = self.find_root(address.root)?;
        let mut path = address.root.as_str().to_string();
        for &index in parent_indices {
            current = current.children.get(index)?.as_folder().ok()?;
            path.push('/');
            path.push_str(&current.name);
        }
        Some(path)
    }

    /// Folder reached by following child indices from a root
    pub fn folder_at_mut(&mut self, root: RootKey, indices: &[usize]) -> Option<&mut FolderNode> {
        let mut current = self.find_root_mut(root)?;
        for &index in indices {
            current = current.children.get_mut(index)?.as_folder_mut().ok()?;
        }
        Some(current)
    }

    /// Non-root node at `address`
    pub fn node_at_mut(&mut self, address: &NodeAddress) -> Option<&mut Node> {
        let (&index, parent) = address.path.split_last()?;
        self.folder_at_mut(address.root, parent)?
            .children
            .get_mut(index)
    }

    /// Detach the non-root node at `address` from its parent
    pub fn remove_at(&mut self, address: &NodeAddress) -> Option<Node> {
        let (&index, parent) = address.path.split_last()?;
        let folder = self.folder_at_mut(address.root, parent)?;
        (index < folder.children.len()).then(|| folder.children.remove(index))
    }
}

fn check_unique<'a>(folder: &'a FolderNode, seen: &mut HashSet<&'a str>) -> Result<(), TreeError> {
    if !seen.insert(folder.id.as_str()) {
        return Err(TreeError::DuplicateId {
            id: folder.id.clone(),
        });
    }
    for child in &folder.children {
        match child {
            Node::Folder(sub) => check_unique(sub, seen)?,
            Node::Url(url) => {
                if !seen.insert(url.id.as_str()) {
                    return Err(TreeError::DuplicateId { id: url.id.clone() });
                }
            }
        }
    }
    Ok(())
}

fn subtree_contains_id(folder: &FolderNode, id: &str) -> bool {
    folder.children.iter().any(|child| {
        child.id() == id
            || matches!(child, Node::Folder(sub) if subtree_contains_id(sub, id))
    })
}

fn flatten_into(folder: &FolderNode, path: &str, out: &mut Vec<FlatBookmark>) {
    for child in &folder.children {
        match child {
            Node::Url(url) => out.push(FlatBookmark {
                id: url.id.clone(),
                url: url.url.clone(),
                title: url.name.clone(),
                folder: path.to_string(),
            }),
            Node::Folder(sub) => flatten_into(sub, &format!("{}/{}", path, sub.name), out),
        }
    }
}

fn summarize_into(folder: &FolderNode, path: String, out: &mut FolderStructure) {
    out.entry(path.clone()).or_insert(FolderSummary {
        bookmarks: folder.bookmark_count(),
        subfolders: folder.subfolder_count(),
    });
    // Only the first of several same-named siblings is reachable by path,
    // so later ones (and everything below them) are left out.
    let mut seen = HashSet::new();
    for child in &folder.children {
        if let Node::Folder(sub) = child {
            if seen.insert(sub.name.as_str()) {
                summarize_into(sub, format!("{}/{}", path, sub.name), out);
            }
        }
    }
}

// ==================== JSON mapping ====================

fn folder_from_value(key: &str, value: Value) -> Result<FolderNode, TreeError> {
    match value {
        Value::Object(map) => FolderNode::try_from(map),
        _ => Err(TreeError::InvalidNode {
            details: format!("root '{}' is not an object", key),
        }),
    }
}

impl TryFrom<Map<String, Value>> for Forest {
    type Error = TreeError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut forest = Forest::default();
        for (key, value) in map {
            match key.parse::<RootKey>() {
                Ok(root) => {
                    let folder = folder_from_value(&key, value)?;
                    forest.roots.insert(root, folder);
                }
                Err(_) => {
                    forest.extra.insert(key, value);
                }
            }
        }
        Ok(forest)
    }
}

impl From<Forest> for Map<String, Value> {
    fn from(forest: Forest) -> Self {
        let mut map = forest.extra;
        for (key, folder) in forest.roots {
            map.insert(key.as_str().to_string(), Value::Object(folder.into()));
        }
        map
    }
}

impl TryFrom<Map<String, Value>> for BookmarkDocument {
    type Error = TreeError;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        let roots = match map.remove(keys::ROOTS) {
            Some(Value::Object(roots)) => Forest::try_from(roots)?,
            Some(_) => {
                return Err(TreeError::InvalidNode {
                    details: "'roots' must be an object".into(),
                })
            }
            None => {
                return Err(TreeError::InvalidNode {
                    details: "document has no 'roots'".into(),
                })
            }
        };
        Ok(Self {
            roots,
            extra: map,
            trailing_newline: false,
        })
    }
}

impl From<BookmarkDocument> for Map<String, Value> {
    fn from(doc: BookmarkDocument) -> Self {
        let mut map = doc.extra;
        map.insert(keys::ROOTS.to_string(), Value::Object(doc.roots.into()));
        map
    }
}

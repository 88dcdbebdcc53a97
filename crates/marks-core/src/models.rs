//! Data models for the bookmark tree
//!
//! A bookmark document is a forest of folders keyed by a fixed set of
//! root keys. Every node is either a URL bookmark or a folder holding an
//! ordered list of children.
//!
//! Only `id`, `name`, `type`, `url` and `children` are interpreted. Every
//! other field the browser writes (timestamps, guids, `meta_info`, ...) is
//! kept in `extra` and written back untouched.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while building or validating the tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("Node '{id}' is not a folder")]
    NotAFolder { id: String },

    #[error("Duplicate node id '{id}' in bookmark tree")]
    DuplicateId { id: String },

    #[error("Invalid bookmark node: {details}")]
    InvalidNode { details: String },
}

impl TreeError {
    fn invalid(details: impl Into<String>) -> Self {
        TreeError::InvalidNode {
            details: details.into(),
        }
    }
}

/// Keys used in the browser's bookmark JSON
pub(crate) mod keys {
    pub const ROOTS: &str = "roots";
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const URL: &str = "url";
    pub const CHILDREN: &str = "children";
    pub const DATE_ADDED: &str = "date_added";
    pub const DATE_MODIFIED: &str = "date_modified";
    pub const DATE_LAST_USED: &str = "date_last_used";

    pub const TYPE_URL: &str = "url";
    pub const TYPE_FOLDER: &str = "folder";
}

/// Microseconds between 1601-01-01 and the Unix epoch
const BROWSER_EPOCH_OFFSET_MICROS: i64 = 11_644_473_600_000_000;

/// Encode a timestamp the way the browser stores `date_added`
pub fn browser_timestamp(at: DateTime<Utc>) -> String {
    (at.timestamp_micros() + BROWSER_EPOCH_OFFSET_MICROS).to_string()
}

/// One of the fixed top-level folders of the forest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RootKey {
    BookmarkBar,
    Other,
    Synced,
}

impl RootKey {
    /// All roots, in traversal order
    pub const ALL: [RootKey; 3] = [RootKey::BookmarkBar, RootKey::Other, RootKey::Synced];

    pub fn as_str(&self) -> &'static str {
        match self {
            RootKey::BookmarkBar => "bookmark_bar",
            RootKey::Other => "other",
            RootKey::Synced => "synced",
        }
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RootKey {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RootKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| TreeError::invalid(format!("unknown root key '{}'", s)))
    }
}

/// A bookmark pointing at a URL
#[derive(Debug, Clone, PartialEq)]
pub struct UrlNode {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Browser-owned fields, preserved verbatim
    pub extra: Map<String, Value>,
}

impl UrlNode {
    /// Create a fresh bookmark stamped with the current time
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        let mut extra = Map::new();
        extra.insert(
            keys::DATE_ADDED.to_string(),
            Value::String(browser_timestamp(Utc::now())),
        );
        extra.insert(keys::DATE_LAST_USED.to_string(), Value::String("0".into()));
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            extra,
        }
    }
}

/// A folder with ordered children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct FolderNode {
    pub id: String,
    pub name: String,
    pub children: Vec<Node>,
    /// Browser-owned fields, preserved verbatim
    pub extra: Map<String, Value>,
}

impl FolderNode {
    /// Create an empty folder stamped with the current time
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let stamp = browser_timestamp(Utc::now());
        let mut extra = Map::new();
        extra.insert(keys::DATE_ADDED.to_string(), Value::String(stamp.clone()));
        extra.insert(keys::DATE_LAST_USED.to_string(), Value::String("0".into()));
        extra.insert(keys::DATE_MODIFIED.to_string(), Value::String(stamp));
        Self {
            id: id.into(),
            name: name.into(),
            children: Vec::new(),
            extra,
        }
    }

    /// Count immediate children matching a predicate
    pub fn child_count(&self, predicate: impl Fn(&Node) -> bool) -> usize {
        self.children.iter().filter(|child| predicate(*child)).count()
    }

    /// Number of URL bookmarks directly inside this folder
    pub fn bookmark_count(&self) -> usize {
        self.child_count(Node::is_url)
    }

    /// Number of folders directly inside this folder
    pub fn subfolder_count(&self) -> usize {
        self.child_count(Node::is_folder)
    }

    /// Find an immediate child folder by exact name (first match wins)
    pub fn subfolder(&self, name: &str) -> Option<&FolderNode> {
        self.children.iter().find_map(|child| match child {
            Node::Folder(folder) if folder.name == name => Some(folder),
            _ => None,
        })
    }

    /// Mutable variant of [`FolderNode::subfolder`]
    pub fn subfolder_mut(&mut self, name: &str) -> Option<&mut FolderNode> {
        self.children.iter_mut().find_map(|child| match child {
            Node::Folder(folder) if folder.name == name => Some(folder),
            _ => None,
        })
    }
}

/// A node in the bookmark tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub enum Node {
    Url(UrlNode),
    Folder(FolderNode),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Url(node) => &node.id,
            Node::Folder(node) => &node.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Url(node) => &node.name,
            Node::Folder(node) => &node.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        match self {
            Node::Url(node) => node.name = name.into(),
            Node::Folder(node) => node.name = name.into(),
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, Node::Url(_))
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Node::Folder(_))
    }

    /// The URL of a bookmark node, `None` for folders
    pub fn url(&self) -> Option<&str> {
        match self {
            Node::Url(node) => Some(&node.url),
            Node::Folder(_) => None,
        }
    }

    /// Borrow as a folder, failing for URL nodes
    pub fn as_folder(&self) -> Result<&FolderNode, TreeError> {
        match self {
            Node::Folder(folder) => Ok(folder),
            Node::Url(node) => Err(TreeError::NotAFolder {
                id: node.id.clone(),
            }),
        }
    }

    /// Mutably borrow as a folder, failing for URL nodes
    pub fn as_folder_mut(&mut self) -> Result<&mut FolderNode, TreeError> {
        match self {
            Node::Folder(folder) => Ok(folder),
            Node::Url(node) => Err(TreeError::NotAFolder {
                id: node.id.clone(),
            }),
        }
    }
}

// ==================== JSON mapping ====================

fn take_string(map: &mut Map<String, Value>, key: &str) -> Result<Option<String>, TreeError> {
    match map.remove(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(TreeError::invalid(format!(
            "field '{}' must be a string, got {}",
            key, other
        ))),
    }
}

fn node_kind(map: &Map<String, Value>) -> Result<&str, TreeError> {
    map.get(keys::TYPE)
        .and_then(Value::as_str)
        .ok_or_else(|| TreeError::invalid("missing 'type' field"))
}

impl TryFrom<Map<String, Value>> for UrlNode {
    type Error = TreeError;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        map.remove(keys::TYPE);
        let id = take_string(&mut map, keys::ID)?
            .ok_or_else(|| TreeError::invalid("bookmark without 'id'"))?;
        let name = take_string(&mut map, keys::NAME)?.unwrap_or_default();
        let url = take_string(&mut map, keys::URL)?
            .filter(|url| !url.is_empty())
            .ok_or_else(|| TreeError::invalid(format!("bookmark '{}' has no url", id)))?;
        Ok(Self {
            id,
            name,
            url,
            extra: map,
        })
    }
}

impl TryFrom<Map<String, Value>> for FolderNode {
    type Error = TreeError;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        if let Some(kind) = map.get(keys::TYPE).and_then(Value::as_str) {
            if kind != keys::TYPE_FOLDER {
                return Err(TreeError::invalid(format!(
                    "expected a folder, got type '{}'",
                    kind
                )));
            }
        }
        map.remove(keys::TYPE);
        let id = take_string(&mut map, keys::ID)?
            .ok_or_else(|| TreeError::invalid("folder without 'id'"))?;
        let name = take_string(&mut map, keys::NAME)?.unwrap_or_default();
        let children = match map.remove(keys::CHILDREN) {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(Node::try_from_value)
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(TreeError::invalid(format!(
                    "children of folder '{}' must be an array",
                    id
                )))
            }
        };
        Ok(Self {
            id,
            name,
            children,
            extra: map,
        })
    }
}

impl Node {
    fn try_from_value(value: Value) -> Result<Self, TreeError> {
        match value {
            Value::Object(map) => Node::try_from(map),
            other => Err(TreeError::invalid(format!(
                "expected an object node, got {}",
                other
            ))),
        }
    }
}

impl TryFrom<Map<String, Value>> for Node {
    type Error = TreeError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let kind = node_kind(&map)?.to_string();
        match kind.as_str() {
            keys::TYPE_URL => UrlNode::try_from(map).map(Node::Url),
            keys::TYPE_FOLDER => FolderNode::try_from(map).map(Node::Folder),
            other => Err(TreeError::invalid(format!("unknown node type '{}'", other))),
        }
    }
}

impl From<UrlNode> for Map<String, Value> {
    fn from(node: UrlNode) -> Self {
        let mut map = node.extra;
        map.insert(keys::ID.to_string(), Value::String(node.id));
        map.insert(keys::NAME.to_string(), Value::String(node.name));
        map.insert(keys::TYPE.to_string(), Value::String(keys::TYPE_URL.into()));
        map.insert(keys::URL.to_string(), Value::String(node.url));
        map
    }
}

impl From<FolderNode> for Map<String, Value> {
    fn from(node: FolderNode) -> Self {
        let mut map = node.extra;
        let children = node
            .children
            .into_iter()
            .map(|child| Value::Object(child.into()))
            .collect();
        map.insert(keys::CHILDREN.to_string(), Value::Array(children));
        map.insert(keys::ID.to_string(), Value::String(node.id));
        map.insert(keys::NAME.to_string(), Value::String(node.name));
        map.insert(
            keys::TYPE.to_string(),
            Value::String(keys::TYPE_FOLDER.into()),
        );
        map
    }
}

impl From<Node> for Map<String, Value> {
    fn from(node: Node) -> Self {
        match node {
            Node::Url(node) => node.into(),
            Node::Folder(node) => node.into(),
        }
    }
}

/// Flattened view of a single bookmark, as consumed by search and listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatBookmark {
    pub id: String,
    pub url: String,
    pub title: String,
    /// Derived folder path, e.g. `bookmark_bar/Work`
    pub folder: String,
}

/// Immediate-child tallies for one folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSummary {
    pub bookmarks: usize,
    pub subfolders: usize,
}

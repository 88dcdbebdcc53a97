//! Node lookup across the whole forest
//!
//! Searches walk the roots in key order and each root in document order
//! (pre-order). The first match wins.
//!
//! A hit is returned as a [`Located`] triple of node, parent and index,
//! plus a [`NodeAddress`] that can be replayed against a mutable forest.

use crate::document::Forest;
use crate::models::{FolderNode, Node, RootKey, UrlNode};

/// Child-index path from a root down to a node
///
/// An empty `path` addresses the root folder itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAddress {
    pub root: RootKey,
    pub path: Vec<usize>,
}

impl NodeAddress {
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }
}

/// A node found by the locator
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Root(&'a FolderNode),
    Child(&'a Node),
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            NodeRef::Root(folder) => &folder.id,
            NodeRef::Child(node) => node.id(),
        }
    }

    pub fn name(&self) -> &'a str {
        match self {
            NodeRef::Root(folder) => &folder.name,
            NodeRef::Child(node) => node.name(),
        }
    }

    pub fn as_url(&self) -> Option<&'a UrlNode> {
        match self {
            NodeRef::Child(Node::Url(url)) => Some(url),
            _ => None,
        }
    }
}

/// Result of a lookup: the node, its parent and its position
#[derive(Debug, Clone)]
pub struct Located<'a> {
    pub node: NodeRef<'a>,
    /// `None` when the node is a root and cannot be detached
    pub parent: Option<&'a FolderNode>,
    /// Position in the parent's children, `None` for a root
    pub index: Option<usize>,
    /// Path of the containing folder, `None` for a root
    pub folder: Option<String>,
    pub address: NodeAddress,
}

impl Located<'_> {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Find the first URL bookmark with exactly this URL
pub fn find_by_url<'a>(forest: &'a Forest, url: &str) -> Option<Located<'a>> {
    find(forest, &|node: &Node| node.url() == Some(url))
}

/// Find a node (root, folder or bookmark) by id
pub fn find_by_id<'a>(forest: &'a Forest, id: &str) -> Option<Located<'a>> {
    for (key, root) in forest.roots() {
        if root.id == id {
            return Some(Located {
                node: NodeRef::Root(root),
                parent: None,
                index: None,
                folder: None,
                address: NodeAddress {
                    root: key,
                    path: Vec::new(),
                },
            });
        }
    }
    find(forest, &|node: &Node| node.id() == id)
}

fn find<'a>(forest: &'a Forest, matches: &dyn Fn(&Node) -> bool) -> Option<Located<'a>> {
    forest.roots().find_map(|(key, root)| {
        let mut trail = Vec::new();
        search(root, key, key.as_str(), &mut trail, matches)
    })
}

fn search<'a>(
    folder: &'a FolderNode,
    root: RootKey,
    folder_path: &str,
    trail: &mut Vec<usize>,
    matches: &dyn Fn(&Node) -> bool,
) -> Option<Located<'a>> {
    for (index, child) in folder.children.iter().enumerate() {
        trail.push(index);
        if matches(child) {
            return Some(Located {
                node: NodeRef::Child(child),
                parent: Some(folder),
                index: Some(index),
                folder: Some(folder_path.to_string()),
                address: NodeAddress {
                    root,
                    path: trail.clone(),
                },
            });
        }
        if let Node::Folder(sub) = child {
            let sub_path = format!("{}/{}", folder_path, sub.name);
            if let Some(found) = search(sub, root, &sub_path, trail, matches) {
                return Some(found);
            }
        }
        trail.pop();
    }
    None
}

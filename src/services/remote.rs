//! In-memory model of a device's storage tree
//!
//! A `RemoteTree` owns every node in a flat arena; parent links are plain
//! indices used only to rebuild paths. Two indexes are derived once after
//! construction:
//!
//! - display path (long names, what local relative paths are matched against)
//! - short path (device names, e.g. 8.3 on FAT storage)
//!
//! All paths are relative to the storage root, use `/` separators, carry no
//! leading slash, and the root itself is the empty path.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const FOLDER_TYPE: &str = "FOLDER";

/// One object of a device listing, nested for folders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub ro: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ListingEntry>>,
}

impl ListingEntry {
    #[must_use]
    pub fn folder(name: &str, children: Vec<ListingEntry>) -> Self {
        Self {
            name: name.to_string(),
            display_name: None,
            kind: FOLDER_TYPE.to_string(),
            ro: false,
            m_timestamp: None,
            size: None,
            children: Some(children),
        }
    }

    #[must_use]
    pub fn file(name: &str, m_timestamp: i64) -> Self {
        Self {
            name: name.to_string(),
            display_name: None,
            kind: "PRINT_FILE".to_string(),
            ro: false,
            m_timestamp: Some(m_timestamp),
            size: None,
            children: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = Some(display_name.to_string());
        self
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.kind == FOLDER_TYPE
    }
}

/// Index of a node inside its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct RemoteNode {
    pub name: String,
    pub display_name: Option<String>,
    pub is_dir: bool,
    pub modified: Option<i64>,
    pub size: Option<u64>,
    /// The device may refuse to delete such nodes
    pub read_only: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl RemoteNode {
    /// Long name if the device reported one, short name otherwise
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone)]
pub struct RemoteTree {
    nodes: Vec<RemoteNode>,
    by_display_path: HashMap<String, NodeId>,
    by_short_path: HashMap<String, NodeId>,
}

impl RemoteTree {
    /// Build a tree from a device listing rooted at the storage root
    pub fn from_listing(listing: &ListingEntry) -> Result<Self> {
        if !listing.is_folder() {
            return Err(Error::MalformedListing(format!(
                "storage root '{}' is not a folder",
                listing.name
            )));
        }

        let mut tree = Self {
            nodes: Vec::new(),
            by_display_path: HashMap::new(),
            by_short_path: HashMap::new(),
        };
        tree.insert(listing, None)?;
        tree.rebuild_index();

        log::debug!(
            "Remote tree '{}' built with {} nodes",
            listing.name,
            tree.nodes.len()
        );
        Ok(tree)
    }

    fn insert(&mut self, entry: &ListingEntry, parent: Option<NodeId>) -> Result<NodeId> {
        let is_dir = entry.is_folder();
        match (is_dir, &entry.children) {
            (false, Some(_)) => {
                return Err(Error::MalformedListing(format!(
                    "file '{}' carries children",
                    entry.name
                )));
            }
            (true, None) => {
                return Err(Error::MalformedListing(format!(
                    "folder '{}' has no children field",
                    entry.name
                )));
            }
            _ => {}
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(RemoteNode {
            name: entry.name.clone(),
            display_name: entry.display_name.clone(),
            is_dir,
            // Devices report 0 for an unknown timestamp
            modified: entry.m_timestamp.filter(|&ts| ts != 0),
            size: entry.size,
            read_only: entry.ro,
            parent,
            children: Vec::new(),
        });

        if let Some(children) = &entry.children {
            let mut short_names = HashSet::new();
            let mut display_names = HashSet::new();

            for child in children {
                let display = child.display_name.as_deref().unwrap_or(&child.name);
                if !short_names.insert(child.name.as_str()) || !display_names.insert(display) {
                    return Err(Error::MalformedListing(format!(
                        "duplicate entry '{display}' in folder '{}'",
                        entry.name
                    )));
                }

                let child_id = self.insert(child, Some(id))?;
                self.nodes[id.0].children.push(child_id);
            }
        }

        Ok(id)
    }

    fn rebuild_index(&mut self) {
        self.by_display_path.clear();
        self.by_short_path.clear();

        let mut stack = vec![(self.root(), String::new(), String::new())];
        while let Some((id, display, short)) = stack.pop() {
            for &child in &self.nodes[id.0].children {
                let node = &self.nodes[child.0];
                stack.push((
                    child,
                    join(&display, node.display_name()),
                    join(&short, &node.name),
                ));
            }
            self.by_display_path.insert(display, id);
            self.by_short_path.insert(short, id);
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &RemoteNode {
        &self.nodes[id.0]
    }

    /// Short name of the storage root (e.g. `usb`)
    #[must_use]
    pub fn storage_name(&self) -> &str {
        &self.nodes[0].name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by its display path
    #[must_use]
    pub fn find(&self, display_path: &str) -> Option<NodeId> {
        self.by_display_path
            .get(display_path.trim_matches('/'))
            .copied()
    }

    /// Look up a node by its short path
    #[must_use]
    pub fn find_short(&self, short_path: &str) -> Option<NodeId> {
        self.by_short_path.get(short_path.trim_matches('/')).copied()
    }

    /// True when `display_path` names an existing folder
    #[must_use]
    pub fn is_dir(&self, display_path: &str) -> bool {
        self.find(display_path)
            .is_some_and(|id| self.nodes[id.0].is_dir)
    }

    /// Rebuild the display path of a node by walking its parents
    #[must_use]
    pub fn display_path(&self, id: NodeId) -> String {
        self.path_by(id, RemoteNode::display_name)
    }

    /// Rebuild the short path of a node by walking its parents
    #[must_use]
    pub fn short_path(&self, id: NodeId) -> String {
        self.path_by(id, |node| node.name.as_str())
    }

    fn path_by(&self, id: NodeId, name_of: impl Fn(&RemoteNode) -> &str) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id.0];
            if node.parent.is_some() {
                parts.push(name_of(node));
            }
            current = node.parent;
        }
        parts.reverse();
        parts.join("/")
    }

    /// Every non-folder node below `id`, paired with its display path
    /// relative to `id`
    #[must_use]
    pub fn files_under(&self, id: NodeId) -> Vec<(String, NodeId)> {
        let mut files = Vec::new();
        let mut stack = vec![(id, String::new())];

        while let Some((current, prefix)) = stack.pop() {
            let node = &self.nodes[current.0];
            if !node.is_dir {
                files.push((prefix, current));
                continue;
            }
            for &child in &node.children {
                let child_prefix = join(&prefix, self.nodes[child.0].display_name());
                stack.push((child, child_prefix));
            }
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        files
    }

    /// Translate a display path into the absolute path the device accepts
    ///
    /// The longest existing prefix is replaced by its short-name path;
    /// components that do not exist yet keep the name they were given.
    #[must_use]
    pub fn device_path(&self, display_path: &str) -> String {
        let display_path = display_path.trim_matches('/');
        let parts: Vec<&str> = if display_path.is_empty() {
            Vec::new()
        } else {
            display_path.split('/').collect()
        };

        let mut resolved = String::new();
        let mut matched = 0;
        for len in (1..=parts.len()).rev() {
            if let Some(id) = self.find(&parts[..len].join("/")) {
                resolved = self.short_path(id);
                matched = len;
                break;
            }
        }

        let mut device = format!("/{}", self.storage_name());
        if !resolved.is_empty() {
            device.push('/');
            device.push_str(&resolved);
        }
        for part in &parts[matched..] {
            device.push('/');
            device.push_str(part);
        }
        device
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

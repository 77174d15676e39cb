//! Data structures for the scanned directory tree.
//!
//! A scan produces a single [`Node`] tree. Directory nodes carry the
//! aggregated size of everything counted beneath them; large files are
//! promoted to visible [`NodeKind::File`] leaves, and children dropped by the
//! per-directory cap are folded into one [`NodeKind::Summary`] placeholder.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What a [`Node`] stands for.
///
/// # Variants
/// * `Directory` - A directory that was descended into
/// * `File` - A regular file large enough to be shown on its own
/// * `Summary` - A synthetic node standing in for children dropped by the cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Directory,
    File,
    Summary,
}

impl NodeKind {
    /// Returns a string representation of the node kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Directory => "DIR",
            NodeKind::File => "FILE",
            NodeKind::Summary => "SUMMARY",
        }
    }
}

/// One node of the scanned tree.
///
/// # Fields
/// * `name` - Display name (basename, or the full path for the scan root)
/// * `path` - Absolute path, or `<parent>/...` for summary nodes
/// * `size` - Total counted bytes attributed to this node
/// * `children` - Visible children, largest first
/// * `file_count` - Regular files counted beneath this node
/// * `dir_count` - Subdirectories descended into and kept beneath this node
/// * `kind` - Directory, promoted file, or summary placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub children: Vec<Node>,
    pub file_count: u64,
    pub dir_count: u64,
    pub kind: NodeKind,
}

impl Node {
    /// Creates an empty directory node for `path`.
    pub fn directory(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size: 0,
            children: Vec::new(),
            file_count: 0,
            dir_count: 0,
            kind: NodeKind::Directory,
        }
    }

    /// Creates a visible leaf for a large regular file.
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size,
            children: Vec::new(),
            file_count: 1,
            dir_count: 0,
            kind: NodeKind::File,
        }
    }

    /// Creates the placeholder for `dropped` children of `parent` totalling `size` bytes.
    pub fn summary(parent: &Path, dropped: usize, size: u64) -> Self {
        Self {
            name: format!("... {} other items", dropped),
            path: parent.join("..."),
            size,
            children: Vec::new(),
            file_count: 0,
            dir_count: 0,
            kind: NodeKind::Summary,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_summary(&self) -> bool {
        self.kind == NodeKind::Summary
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Node::node_count).sum::<usize>()
    }

    /// Depth of the deepest node below `self` (a leaf has depth 0).
    pub fn max_depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.max_depth() + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Orders nodes largest first, breaking ties by name so output is stable.
pub(crate) fn sort_by_size_desc(nodes: &mut [Node]) {
    nodes.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.name.cmp(&b.name)));
}

//! Top-N summaries of a completed scan tree.
//!
//! Only nodes that made it into the tree are considered, so small files that
//! were counted into their directory's size but never materialised as nodes
//! do not show up in [`top_files`].

use crate::data::{Node, NodeKind};
use serde::Serialize;
use std::path::PathBuf;

/// Default number of rows in each summary.
pub const DEFAULT_TOP: usize = 20;

/// One row of [`top_directories`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirSummary {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub file_count: u64,
    pub dir_count: u64,
}

/// One row of [`top_files`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

fn collect<'a>(tree: &'a Node, kind: NodeKind) -> Vec<&'a Node> {
    let mut found = Vec::new();
    let mut stack = vec![tree];
    while let Some(node) = stack.pop() {
        if node.kind == kind {
            found.push(node);
        }
        stack.extend(node.children.iter());
    }
    found.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
    found
}

/// The `limit` largest directory nodes anywhere in `tree`, the root included.
pub fn top_directories(tree: &Node, limit: usize) -> Vec<DirSummary> {
    collect(tree, NodeKind::Directory)
        .into_iter()
        .take(limit)
        .map(|node| DirSummary {
            path: node.path.clone(),
            name: node.name.clone(),
            size: node.size,
            file_count: node.file_count,
            dir_count: node.dir_count,
        })
        .collect()
}

/// The `limit` largest visible file nodes anywhere in `tree`.
pub fn top_files(tree: &Node, limit: usize) -> Vec<FileSummary> {
    collect(tree, NodeKind::File)
        .into_iter()
        .take(limit)
        .map(|node| FileSummary {
            path: node.path.clone(),
            name: node.name.clone(),
            size: node.size,
        })
        .collect()
}

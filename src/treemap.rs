//! Post-processing of a completed scan tree for transport and rendering.
//!
//! Both operations read the stored tree and build new values; the scanned
//! tree itself is never modified, so they can run concurrently against one
//! shared result.
//!
//! - [`prune`] bounds depth and per-level width, escalating to a stricter
//!   budget when the serialized tree is still too large
//! - [`flatten`] emits the parallel `labels`/`parents`/`values`/`ids` arrays a
//!   treemap renderer consumes

use crate::data::Node;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default node budget for [`flatten`].
pub const DEFAULT_MAX_NODES: usize = 300;
/// Nodes deeper than this are never emitted by [`flatten`].
pub const FLATTEN_MAX_DEPTH: usize = 8;

/// Budget for [`prune`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneBudget {
    /// Nodes deeper than this keep their size but lose their children
    pub depth_cap: usize,
    /// Depth cap of the stricter second pass
    pub strict_depth_cap: usize,
    /// Serialized JSON size that triggers the stricter pass
    pub max_bytes: usize,
}

impl Default for PruneBudget {
    fn default() -> Self {
        Self {
            depth_cap: 6,
            strict_depth_cap: 4,
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

fn relaxed_width(depth: usize) -> usize {
    25usize.saturating_sub(3 * depth).max(8)
}

fn strict_width(depth: usize) -> usize {
    15usize.saturating_sub(2 * depth).max(5)
}

fn flatten_width(depth: usize) -> usize {
    20usize.saturating_sub(2 * depth).max(5)
}

/// Children of `node`, largest first, without reordering the stored tree.
fn largest_children(node: &Node) -> Vec<&Node> {
    let mut children: Vec<&Node> = node.children.iter().collect();
    children.sort_by(|a, b| b.size.cmp(&a.size));
    children
}

fn prune_pass(node: &Node, depth: usize, depth_cap: usize, width: fn(usize) -> usize) -> Node {
    let children = if depth > depth_cap {
        Vec::new()
    } else {
        largest_children(node)
            .into_iter()
            .take(width(depth))
            .map(|child| prune_pass(child, depth + 1, depth_cap, width))
            .collect()
    };

    Node {
        name: node.name.clone(),
        path: node.path.clone(),
        size: node.size,
        children,
        file_count: node.file_count,
        dir_count: node.dir_count,
        kind: node.kind,
    }
}

fn serialized_len(node: &Node) -> Option<usize> {
    serde_json::to_vec(node).ok().map(|bytes| bytes.len())
}

/// Returns a pruned copy of `tree`.
///
/// The first pass empties nodes deeper than `budget.depth_cap` and keeps the
/// largest `max(25 - 3·depth, 8)` children per level. If the result still
/// serializes to more than `budget.max_bytes`, a strict pass empties nodes
/// deeper than `budget.strict_depth_cap` and keeps `max(15 - 2·depth, 5)`
/// children per level.
///
/// Sizes are never altered, and pruning an already pruned tree returns it
/// unchanged.
pub fn prune(tree: &Node, budget: &PruneBudget) -> Node {
    let pruned = prune_pass(tree, 0, budget.depth_cap, relaxed_width);

    match serialized_len(&pruned) {
        Some(len) if len > budget.max_bytes => {
            debug!(bytes = len, limit = budget.max_bytes, "applying strict pruning");
            prune_pass(&pruned, 0, budget.strict_depth_cap, strict_width)
        }
        Some(len) => {
            debug!(bytes = len, "pruned tree within budget");
            pruned
        }
        // Size unknown; keep the first pass.
        None => pruned,
    }
}

/// Parallel arrays describing a treemap.
///
/// Index `i` of every array describes the same node. `parents[i]` is the id of
/// the node's parent, or the empty string for the root, and always appears
/// earlier in `ids`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreemapData {
    pub labels: Vec<String>,
    pub parents: Vec<String>,
    pub values: Vec<u64>,
    pub ids: Vec<String>,
    pub node_count: usize,
}

impl TreemapData {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn push(&mut self, node: &Node, parent_id: &str, id: String) {
        self.labels.push(node.name.clone());
        self.parents.push(parent_id.to_string());
        self.values.push(node.size);
        self.ids.push(id);
        self.node_count += 1;
    }
}

fn child_id(parent_id: &str, name: &str) -> String {
    if parent_id.ends_with('/') {
        format!("{}{}", parent_id, name)
    } else {
        format!("{}/{}", parent_id, name)
    }
}

fn flatten_node(
    node: &Node,
    parent_id: &str,
    depth: usize,
    max_nodes: usize,
    out: &mut TreemapData,
) {
    if out.node_count >= max_nodes || depth > FLATTEN_MAX_DEPTH {
        return;
    }

    let id = if parent_id.is_empty() {
        node.name.clone()
    } else {
        child_id(parent_id, &node.name)
    };
    out.push(node, parent_id, id.clone());

    for child in largest_children(node).into_iter().take(flatten_width(depth)) {
        if out.node_count >= max_nodes {
            break;
        }
        flatten_node(child, &id, depth + 1, max_nodes, out);
    }
}

/// Flattens `tree` depth-first, largest children first, into treemap arrays.
///
/// Emission stops after `max_nodes` nodes, nodes deeper than
/// [`FLATTEN_MAX_DEPTH`] are left out, and each node contributes at most
/// `max(20 - 2·depth, 5)` children. Ids join names with `/` starting from the
/// root's name, so they do not depend on filesystem paths.
pub fn flatten(tree: &Node, max_nodes: usize) -> TreemapData {
    let mut out = TreemapData::default();
    flatten_node(tree, "", 0, max_nodes, &mut out);
    debug!(nodes = out.node_count, "generated treemap");
    out
}

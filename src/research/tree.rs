//! The query tree: the session-scoped provenance structure of explored and
//! pending research queries.
//!
//! Nodes live in an append-only arena and reference each other by [`NodeId`],
//! never by pointer, so the tree stays acyclic by construction and parent
//! walks always terminate. The root is a sentinel ("master") node with
//! query `"_"` at depth 0; every real query hangs below it.

use crate::types::{AppError, PageRecord, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque node identity, stable for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

/// Query used for the root sentinel node.
pub const MASTER_QUERY: &str = "_";

/// One node of the query tree.
#[derive(Debug, Clone)]
pub struct ResearchNode {
    /// This node's id.
    pub id: NodeId,
    /// The search string this node investigates.
    pub query: String,
    /// Distance from the root; root = 0, children of the root = 1.
    pub depth: usize,
    /// Back edge for path reconstruction. `None` only for the root.
    pub parent: Option<NodeId>,
    /// Owned children in insertion (= exploration) order.
    pub children: Vec<NodeId>,
    /// Pages retrieved for this node's query.
    pub data: Vec<PageRecord>,
}

/// Immutable recursive view of the tree for external reporting.
///
/// `sources` maps URL to extracted text only, keeping snapshots light
/// compared to full [`PageRecord`]s.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct TreeSnapshot {
    /// The node's query string.
    pub query: String,
    /// The node's depth.
    pub depth: usize,
    /// URL -> extracted text for each page retrieved at this node.
    pub sources: BTreeMap<String, String>,
    /// Child snapshots in insertion order.
    pub children: Vec<TreeSnapshot>,
}

/// Append-only arena of research nodes rooted at the master sentinel.
#[derive(Debug)]
pub struct QueryTree {
    nodes: Vec<ResearchNode>,
}

impl QueryTree {
    /// Create a tree holding only the master sentinel node.
    pub fn new() -> Self {
        Self {
            nodes: vec![ResearchNode {
                id: NodeId(0),
                query: MASTER_QUERY.to_string(),
                depth: 0,
                parent: None,
                children: Vec::new(),
                data: Vec::new(),
            }],
        }
    }

    /// Id of the master node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Create a child of `parent` investigating `query`.
    ///
    /// The child's depth is `parent.depth + 1` and it is appended to the
    /// parent's child list.
    pub fn add_child(&mut self, parent: NodeId, query: &str) -> Result<NodeId> {
        let parent_depth = self
            .get(parent)
            .ok_or_else(|| AppError::NotFound(format!("tree node {:?}", parent)))?
            .depth;

        let id = NodeId(self.nodes.len());
        self.nodes.push(ResearchNode {
            id,
            query: query.to_string(),
            depth: parent_depth + 1,
            parent: Some(parent),
            children: Vec::new(),
            data: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Look up a node by id. `None` when the id is not in this tree.
    pub fn get(&self, id: NodeId) -> Option<&ResearchNode> {
        self.nodes.get(id.0)
    }

    /// Attach retrieved pages to a node, replacing whatever it held.
    pub fn set_data(&mut self, id: NodeId, data: Vec<PageRecord>) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or_else(|| AppError::NotFound(format!("tree node {:?}", id)))?;
        node.data = data;
        Ok(())
    }

    /// Queries from the root down to `id`: `[root.query, ..., node.query]`.
    ///
    /// Parent edges always point at earlier arena slots, so the walk
    /// terminates for any valid id.
    pub fn path_to_root(&self, id: NodeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = self.get(id);
        while let Some(node) = current {
            path.push(node.query.clone());
            current = node.parent.and_then(|p| self.get(p));
        }
        path.reverse();
        path
    }

    /// Greatest depth among all nodes.
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Number of non-root nodes.
    pub fn total_descendants(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Every node's data concatenated in pre-order (children in insertion
    /// order), deep-copied so callers cannot mutate the tree through it.
    pub fn all_data(&self) -> Vec<PageRecord> {
        let mut out = Vec::new();
        self.collect_data(self.root(), &mut out);
        out
    }

    fn collect_data(&self, id: NodeId, out: &mut Vec<PageRecord>) {
        let node = &self.nodes[id.0];
        out.extend(node.data.iter().cloned());
        for &child in &node.children {
            self.collect_data(child, out);
        }
    }

    /// Immutable recursive snapshot rooted at the master node.
    pub fn snapshot(&self) -> TreeSnapshot {
        self.snapshot_from(self.root())
    }

    fn snapshot_from(&self, id: NodeId) -> TreeSnapshot {
        let node = &self.nodes[id.0];
        let sources = node
            .data
            .iter()
            .filter(|d| !d.url.is_empty() && !d.text.is_empty())
            .map(|d| (d.url.clone(), d.text.clone()))
            .collect();
        TreeSnapshot {
            query: node.query.clone(),
            depth: node.depth,
            sources,
            children: node
                .children
                .iter()
                .map(|&c| self.snapshot_from(c))
                .collect(),
        }
    }
}

impl Default for QueryTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PageRecord;

    fn page(url: &str, text: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn new_tree_holds_only_master() {
        let tree = QueryTree::new();
        let root = tree.get(tree.root()).unwrap();
        assert_eq!(root.query, MASTER_QUERY);
        assert_eq!(root.depth, 0);
        assert!(root.parent.is_none());
        assert_eq!(tree.total_descendants(), 0);
        assert_eq!(tree.max_depth(), 0);
    }

    #[test]
    fn child_depth_is_parent_plus_one() {
        let mut tree = QueryTree::new();
        let a = tree.add_child(tree.root(), "a").unwrap();
        let b = tree.add_child(a, "b").unwrap();
        let c = tree.add_child(b, "c").unwrap();

        for id in [a, b, c] {
            let node = tree.get(id).unwrap();
            let parent = tree.get(node.parent.unwrap()).unwrap();
            assert_eq!(node.depth, parent.depth + 1);
        }
        assert_eq!(tree.max_depth(), 3);
        assert_eq!(tree.total_descendants(), 3);
    }

    #[test]
    fn add_child_with_unknown_parent_fails() {
        let mut tree = QueryTree::new();
        let result = tree.add_child(NodeId(42), "orphan");
        assert!(matches!(result, Err(crate::types::AppError::NotFound(_))));
    }

    #[test]
    fn path_to_root_runs_root_first() {
        let mut tree = QueryTree::new();
        let a = tree.add_child(tree.root(), "a").unwrap();
        let b = tree.add_child(a, "b").unwrap();

        assert_eq!(tree.path_to_root(b), vec!["_", "a", "b"]);
        assert_eq!(tree.path_to_root(tree.root()), vec!["_"]);
    }

    #[test]
    fn all_data_is_preorder_and_complete() {
        let mut tree = QueryTree::new();
        let a = tree.add_child(tree.root(), "a").unwrap();
        let b = tree.add_child(tree.root(), "b").unwrap();
        let a1 = tree.add_child(a, "a1").unwrap();

        tree.set_data(a, vec![page("http://a", "ta")]).unwrap();
        tree.set_data(a1, vec![page("http://a1", "ta1"), page("http://a1b", "ta1b")])
            .unwrap();
        tree.set_data(b, vec![page("http://b", "tb")]).unwrap();

        let all = tree.all_data();
        let total: usize = [a, a1, b]
            .iter()
            .map(|&id| tree.get(id).unwrap().data.len())
            .sum();
        assert_eq!(all.len(), total);
        // Pre-order: a's subtree before b.
        let urls: Vec<&str> = all.iter().map(|d| d.url.as_str()).collect();
        assert_eq!(urls, vec!["http://a", "http://a1", "http://a1b", "http://b"]);
    }

    #[test]
    fn all_data_returns_copies() {
        let mut tree = QueryTree::new();
        let a = tree.add_child(tree.root(), "a").unwrap();
        tree.set_data(a, vec![page("http://a", "ta")]).unwrap();

        let mut all = tree.all_data();
        all[0].text.push_str(" mutated");
        assert_eq!(tree.get(a).unwrap().data[0].text, "ta");
    }

    #[test]
    fn snapshot_maps_url_to_text_and_nests_children() {
        let mut tree = QueryTree::new();
        let a = tree.add_child(tree.root(), "a").unwrap();
        tree.set_data(
            a,
            vec![page("http://a", "ta"), page("", "skipped"), page("http://x", "")],
        )
        .unwrap();

        let snap = tree.snapshot();
        assert_eq!(snap.query, MASTER_QUERY);
        assert_eq!(snap.children.len(), 1);
        let child = &snap.children[0];
        assert_eq!(child.query, "a");
        assert_eq!(child.depth, 1);
        // Records without url or text are excluded from the light view.
        assert_eq!(child.sources.len(), 1);
        assert_eq!(child.sources["http://a"], "ta");
    }
}

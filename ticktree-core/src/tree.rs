//! Path- and id-based indexing over a built node graph (spec §4.5).
//!
//! A `Tree` owns its root and rebuilds both indices whenever the structure
//! changes (construction, `replace_node_at_path`). Paths are `/`-joined
//! child indices (`/`, `/0`, `/0/2/1`); a leading `#TreeId` names a
//! different tree entirely for cross-tree addressing.

use crate::node::BtNode;
use anyhow::{anyhow, Result};
use std::collections::HashMap;

/// A node path as a sequence of child indices; empty means the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        NodePath(Vec::new())
    }

    pub fn format(&self) -> String {
        if self.0.is_empty() {
            "/".to_string()
        } else {
            let segments: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
            format!("/{}", segments.join("/"))
        }
    }

    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        if trimmed == "/" || trimmed.is_empty() {
            return Ok(NodePath::root());
        }
        let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let mut indices = Vec::new();
        for segment in trimmed.split('/') {
            let idx: usize = segment
                .parse()
                .map_err(|_| anyhow!("invalid path segment: {segment} in {path}"))?;
            indices.push(idx);
        }
        Ok(NodePath(indices))
    }
}

/// A wrapped root node with path/id indices over the whole subtree (spec
/// §4.5). Rebuilt from scratch on construction and after any structural
/// replacement — cheap enough given tree sizes are small (authoring-time
/// graphs, not runtime data structures).
pub struct Tree {
    root: Box<dyn BtNode>,
    path_index: HashMap<String, NodePath>,
    id_index: HashMap<String, NodePath>,
}

impl Tree {
    pub fn from_root(root: Box<dyn BtNode>) -> Self {
        let mut tree = Tree {
            root,
            path_index: HashMap::new(),
            id_index: HashMap::new(),
        };
        tree.reindex();
        tree
    }

    pub fn root(&self) -> &dyn BtNode {
        self.root.as_ref()
    }

    pub fn root_mut(&mut self) -> &mut Box<dyn BtNode> {
        &mut self.root
    }

    fn reindex(&mut self) {
        self.path_index.clear();
        self.id_index.clear();
        let mut path_index = HashMap::new();
        let mut id_index = HashMap::new();
        Self::index_node(self.root.as_ref(), NodePath::root(), &mut path_index, &mut id_index);
        self.path_index = path_index;
        self.id_index = id_index;
    }

    fn index_node(
        node: &dyn BtNode,
        path: NodePath,
        path_index: &mut HashMap<String, NodePath>,
        id_index: &mut HashMap<String, NodePath>,
    ) {
        path_index.insert(path.format(), path.clone());
        id_index.insert(node.id().to_string(), path.clone());
        for (i, child) in node.children().iter().enumerate() {
            let mut child_path = path.0.clone();
            child_path.push(i);
            Self::index_node(child.as_ref(), NodePath(child_path), path_index, id_index);
        }
    }

    pub fn find_node_by_path(&self, path: &str) -> Option<&dyn BtNode> {
        let parsed = self.path_index.get(path)?;
        Self::walk(self.root.as_ref(), &parsed.0)
    }

    pub fn find_node_by_id(&self, id: &str) -> Option<&dyn BtNode> {
        let parsed = self.id_index.get(id)?;
        Self::walk(self.root.as_ref(), &parsed.0)
    }

    pub fn get_node_path_by_id(&self, id: &str) -> Option<String> {
        self.id_index.get(id).map(NodePath::format)
    }

    pub fn get_node_path(&self, node: &dyn BtNode) -> Option<String> {
        self.get_node_path_by_id(node.id())
    }

    fn walk<'a>(node: &'a dyn BtNode, indices: &[usize]) -> Option<&'a dyn BtNode> {
        match indices.split_first() {
            None => Some(node),
            Some((head, rest)) => {
                let child = node.children().get(*head)?;
                Self::walk(child.as_ref(), rest)
            }
        }
    }

    /// Replace the node at `path` with `new_node`, reattaching it into the
    /// parent's child slot (or replacing the whole root for `/`), then
    /// rebuild both indices since the new subtree may carry different ids.
    pub fn replace_node_at_path(&mut self, path: &str, new_node: Box<dyn BtNode>) -> Result<()> {
        let parsed = NodePath::parse(path)?;
        if parsed.0.is_empty() {
            self.root = new_node;
            self.reindex();
            return Ok(());
        }
        let (last, ancestors) = parsed.0.split_last().expect("checked non-empty above");
        let parent = Self::walk_mut(self.root.as_mut(), ancestors)
            .ok_or_else(|| anyhow!("no node at path: {path}"))?;
        if *last >= parent.children().len() {
            return Err(anyhow!("child index {last} out of range at path: {path}"));
        }
        parent.children_mut()[*last] = new_node;
        self.reindex();
        Ok(())
    }

    fn walk_mut<'a>(node: &'a mut dyn BtNode, indices: &[usize]) -> Option<&'a mut dyn BtNode> {
        match indices.split_first() {
            None => Some(node),
            Some((head, rest)) => {
                let child = node.children_mut().get_mut(*head)?;
                Self::walk_mut(child.as_mut(), rest)
            }
        }
    }
}

/// Parses a cross-tree path of the form `#TreeId/0/2/1` or bare `#TreeId`
/// (which maps to the tree's root, `/`). A missing `#` prefix or empty tree
/// id is rejected.
pub fn parse_path_with_tree_id(path: &str) -> Result<(String, String)> {
    let rest = path
        .strip_prefix('#')
        .ok_or_else(|| anyhow!("cross-tree path must start with '#': {path}"))?;
    match rest.split_once('/') {
        Some((tree_id, node_path)) => {
            if tree_id.is_empty() {
                return Err(anyhow!("cross-tree path has empty tree id: {path}"));
            }
            Ok((tree_id.to_string(), format!("/{node_path}")))
        }
        None => {
            if rest.is_empty() {
                return Err(anyhow!("cross-tree path has empty tree id: {path}"));
            }
            Ok((rest.to_string(), "/".to_string()))
        }
    }
}

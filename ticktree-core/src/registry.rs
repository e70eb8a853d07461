//! Node registry and declarative tree builder (spec §4.4).
//!
//! Grounded on the teacher's `authoring/registry.rs` template registry
//! (`register`/`load`/`list` over a `RwLock<HashMap<..>>>`), generalized
//! from versioned workflow templates to node-type constructors and named
//! tree templates.

use crate::error::TickError;
use crate::loader::{self, LoaderOptions, TreeDef};
use crate::node::BtNode;
use anyhow::{anyhow, Result};
use serde_json::Map as JsonMap;
use serde_json::Value as Json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// What kind of node a registered type constructs — governs arity
/// validation in the loader (decorators: exactly one child; composites:
/// any number; actions: none).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    Action,
    Composite,
    Decorator,
}

#[derive(Debug, Clone)]
pub struct NodeMetadata {
    pub category: NodeCategory,
    pub description: String,
    /// Names of blackboard ports this node type reads/writes, for tooling.
    pub ports: Vec<String>,
}

/// `(id, name, props)` passed to a constructor by the loader.
pub struct NodeSpec {
    pub id: String,
    pub name: String,
    pub props: JsonMap<String, Json>,
}

pub type Constructor = Arc<dyn Fn(NodeSpec) -> Result<Box<dyn BtNode>> + Send + Sync>;

struct Registration {
    constructor: Constructor,
    metadata: NodeMetadata,
}

#[derive(Default)]
struct Inner {
    types: HashMap<String, Registration>,
    trees: HashMap<String, (Box<dyn BtNode>, Option<String>)>,
}

/// `Registry` is cheaply clonable (an `Arc` around shared, lock-protected
/// state) so it can be threaded through a `TickContext` for SubTree
/// resolution without lifetime gymnastics.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RwLock<Inner>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Associates a type tag with a constructor and metadata. Duplicate
    /// registration is an error.
    pub fn register(
        &self,
        type_name: impl Into<String>,
        constructor: Constructor,
        metadata: NodeMetadata,
    ) -> Result<()> {
        let type_name = type_name.into();
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if inner.types.contains_key(&type_name) {
            return Err(anyhow!("node type already registered: {type_name}"));
        }
        inner
            .types
            .insert(type_name, Registration { constructor, metadata });
        Ok(())
    }

    pub fn has(&self, type_name: &str) -> bool {
        self.inner.read().expect("registry lock poisoned").types.contains_key(type_name)
    }

    pub fn get_metadata(&self, type_name: &str) -> Option<NodeMetadata> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .types
            .get(type_name)
            .map(|r| r.metadata.clone())
    }

    pub fn get_types_by_category(&self, category: NodeCategory) -> Vec<String> {
        self.inner
            .read()
            .expect("registry lock poisoned")
            .types
            .iter()
            .filter(|(_, r)| r.metadata.category == category)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn create(&self, type_name: &str, spec: NodeSpec) -> Result<Box<dyn BtNode>> {
        let constructor = {
            let inner = self.inner.read().expect("registry lock poisoned");
            inner
                .types
                .get(type_name)
                .map(|r| r.constructor.clone())
                .ok_or_else(|| anyhow!("unknown node type: {type_name}"))?
        };
        constructor(spec)
    }

    /// Recursively build a tree from a declarative definition (spec §4.4,
    /// §4.8). Validates `type` presence, generates a `Uuid`-backed id if
    /// absent, and enforces decorator/composite arity.
    pub fn create_tree(&self, def: &TreeDef, options: &LoaderOptions) -> Result<Box<dyn BtNode>> {
        let validated = loader::validate(def, self, options)
            .map_err(|errs| anyhow!(loader::format_errors(&errs)))?;
        self.build(&validated)
    }

    fn build(&self, def: &TreeDef) -> Result<Box<dyn BtNode>> {
        let id = match &def.id {
            Some(id) => id.clone(),
            None => self.generate_id(&def.node_type),
        };
        let name = def.name.clone().unwrap_or_else(|| id.clone());
        let props = def.props.clone().unwrap_or_default();
        let spec = NodeSpec { id, name, props };
        let mut node = self.create(&def.node_type, spec)?;

        for child_def in def.children.as_deref().unwrap_or(&[]) {
            let child = self.build(child_def)?;
            node.children_mut().push(child);
        }
        Ok(node)
    }

    /// Defaults an unaddressed node's id to a `Uuid`-backed value prefixed
    /// by its type, mirroring the teacher's `Fiber::fiber_id` generation:
    /// stable enough to read in a trace, unique enough to never collide.
    fn generate_id(&self, type_name: &str) -> String {
        format!("{type_name}_{}", Uuid::now_v7())
    }

    /// Named, immutable tree template. Overwrites any existing template
    /// with the same id (unlike node-type registration, which rejects
    /// duplicates) since re-publishing a tree under the same id is a
    /// normal authoring operation. Rejects the tree if it would create a
    /// circular SubTree reference, directly or through an already
    /// registered tree (spec §4.2 "Cycles are rejected at load time").
    pub fn register_tree(
        &self,
        tree_id: impl Into<String>,
        tree: Box<dyn BtNode>,
        source_file: Option<String>,
    ) -> Result<()> {
        let tree_id = tree_id.into();
        let mut direct_refs = Vec::new();
        collect_subtree_refs(tree.as_ref(), &mut direct_refs);
        for referenced in &direct_refs {
            if referenced == &tree_id {
                return Err(anyhow!(
                    "circular SubTree reference: tree '{tree_id}' references itself"
                ));
            }
            let mut visited = HashSet::new();
            visited.insert(tree_id.clone());
            if self.reaches(referenced, &tree_id, &mut visited) {
                return Err(anyhow!(
                    "circular SubTree reference: '{tree_id}' reachable from '{referenced}'"
                ));
            }
        }
        let mut inner = self.inner.write().expect("registry lock poisoned");
        inner.trees.insert(tree_id, (tree, source_file));
        Ok(())
    }

    /// True if the tree registered under `from_tree_id` transitively
    /// references `target`, via SubTree nodes.
    fn reaches(&self, from_tree_id: &str, target: &str, visited: &mut HashSet<String>) -> bool {
        if !visited.insert(from_tree_id.to_string()) {
            return false;
        }
        let refs = {
            let inner = self.inner.read().expect("registry lock poisoned");
            match inner.trees.get(from_tree_id) {
                Some((tree, _)) => {
                    let mut refs = Vec::new();
                    collect_subtree_refs(tree.as_ref(), &mut refs);
                    refs
                }
                None => return false,
            }
        };
        refs.iter()
            .any(|r| r == target || self.reaches(r, target, visited))
    }

    pub fn has_tree(&self, tree_id: &str) -> bool {
        self.inner.read().expect("registry lock poisoned").trees.contains_key(tree_id)
    }

    /// Deep-copies the named tree for use as a SubTree child. `BtNode` is
    /// not `Clone` (it's a trait object over heterogeneous state), so
    /// each node type implements [`crate::node::BtNode::clone_fresh`]
    /// instead, returning an Idle-state structural copy.
    pub fn clone_tree(&self, tree_id: &str) -> Result<Box<dyn BtNode>> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let (tree, _source) = inner
            .trees
            .get(tree_id)
            .ok_or_else(|| anyhow!("no tree registered under id: {tree_id}"))?;
        Ok(tree.clone_fresh())
    }

    pub fn clear(&self) {
        self.inner.write().expect("registry lock poisoned").types.clear();
    }

    pub fn clear_trees(&self) {
        self.inner.write().expect("registry lock poisoned").trees.clear();
    }
}

/// Resolve a `Configuration` error for an unresolved SubTree at build time,
/// used by `composite::subtree`.
pub fn unresolved_subtree(tree_id: &str) -> TickError {
    TickError::configuration(format!("unresolved SubTree reference: {tree_id}"))
}

fn collect_subtree_refs(node: &dyn BtNode, refs: &mut Vec<String>) {
    if let Some(id) = node.subtree_target() {
        refs.push(id.to_string());
    }
    for child in node.children() {
        collect_subtree_refs(child.as_ref(), refs);
    }
}

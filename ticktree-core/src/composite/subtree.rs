//! `SubTree` — references a named tree in the registry, cloning it in as a
//! child on first tick (spec §4.2). Cycles across `register_tree` calls are
//! rejected at registration time by [`crate::registry::Registry`], not here.

use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::registry::unresolved_subtree;
use crate::status::Status;
use async_trait::async_trait;

pub struct SubTree {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    tree_id: String,
}

impl SubTree {
    pub fn new(id: impl Into<String>, tree_id: impl Into<String>) -> Self {
        SubTree {
            core: NodeCore::new(id, "SubTree"),
            children: Vec::new(),
            tree_id: tree_id.into(),
        }
    }
}

#[async_trait]
impl BtNode for SubTree {
    fn core(&self) -> &NodeCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }
    fn children(&self) -> &[Box<dyn BtNode>] {
        &self.children
    }
    fn children_mut(&mut self) -> &mut Vec<Box<dyn BtNode>> {
        &mut self.children
    }
    fn clone_fresh(&self) -> Box<dyn BtNode> {
        Box::new(SubTree {
            core: NodeCore::new(self.core.id.clone(), "SubTree").with_name(self.core.name.clone()),
            children: Vec::new(),
            tree_id: self.tree_id.clone(),
        })
    }
    fn subtree_target(&self) -> Option<&str> {
        Some(&self.tree_id)
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        if self.children.is_empty() {
            let registry = ctx
                .tree_registry
                .clone()
                .ok_or_else(|| TickError::configuration("SubTree requires a tree registry in the tick context"))?;
            if !registry.has_tree(&self.tree_id) {
                return Err(unresolved_subtree(&self.tree_id));
            }
            let cloned = registry
                .clone_tree(&self.tree_id)
                .map_err(|e| TickError::configuration(e.to_string()))?;
            self.children.push(cloned);
        }
        ctx.check_cancelled()?;
        self.children[0].tick(ctx).await
    }

    async fn on_halt(&mut self, ctx: &mut TickContext) {
        if let Some(child) = self.children.first_mut() {
            if child.status() == Status::Running {
                child.halt(ctx).await;
            }
        }
    }
}

//! `Invert` — SUCCESS<->FAILURE, RUNNING passthrough (spec §4.3).

use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;

pub struct Invert {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
}

impl Invert {
    pub fn new(id: impl Into<String>) -> Self {
        Invert {
            core: NodeCore::new(id, "Invert"),
            children: Vec::new(),
        }
    }
}

#[async_trait]
impl BtNode for Invert {
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
        Box::new(Invert {
            core: NodeCore::new(self.core.id.clone(), "Invert").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        let child = self
            .children
            .first_mut()
            .ok_or_else(|| TickError::configuration("Invert requires exactly 1 child"))?;
        ctx.check_cancelled()?;
        Ok(child.tick(ctx).await?.inverted())
    }

    async fn on_halt(&mut self, ctx: &mut TickContext) {
        if let Some(child) = self.children.first_mut() {
            child.halt(ctx).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::Blackboard;
    use crate::node::test_support::{CountingAction, FixedAction};

    fn ctx() -> TickContext {
        TickContext::new(Blackboard::new(), "test")
    }

    #[tokio::test]
    async fn double_invert_on_terminal_child_is_identity() {
        let mut inner = Invert::new("inner");
        inner.children_mut().push(Box::new(FixedAction::new("a", Status::Success)));
        let mut outer = Invert::new("outer");
        outer.children_mut().push(Box::new(inner));
        let mut c = ctx();
        assert_eq!(outer.tick(&mut c).await.unwrap(), Status::Success);
    }

    #[tokio::test]
    async fn running_passes_through_uninverted() {
        let mut inv = Invert::new("i");
        inv.children_mut().push(Box::new(CountingAction::new("a", 1, Status::Success)));
        let mut c = ctx();
        assert_eq!(inv.tick(&mut c).await.unwrap(), Status::Running);
    }

    #[tokio::test]
    async fn no_child_is_configuration_error() {
        let mut inv = Invert::new("i");
        let mut c = ctx();
        let err = inv.tick(&mut c).await.unwrap_err();
        assert!(err.is_propagating());
    }
}

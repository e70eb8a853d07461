//! `Recovery` — `[primary, fallback]`, a Selector specialized to exactly
//! two children with recovery-flavored naming (spec §4.2).

use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;

pub struct Recovery {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    primary_failed: bool,
}

impl Recovery {
    pub fn new(id: impl Into<String>) -> Self {
        Recovery {
            core: NodeCore::new(id, "Recovery"),
            children: Vec::new(),
            primary_failed: false,
        }
    }
}

#[async_trait]
impl BtNode for Recovery {
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
        Box::new(Recovery {
            core: NodeCore::new(self.core.id.clone(), "Recovery").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
            primary_failed: false,
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        if self.children.len() != 2 {
            return Err(TickError::configuration("Recovery requires exactly 2 children: [primary, fallback]"));
        }
        if !self.primary_failed {
            ctx.check_cancelled()?;
            match self.children[0].tick(ctx).await? {
                Status::Success => return Ok(Status::Success),
                Status::Running => return Ok(Status::Running),
                Status::Failure => self.primary_failed = true,
                Status::Idle => unreachable!("tick() never commits Idle"),
            }
        }
        ctx.check_cancelled()?;
        let status = self.children[1].tick(ctx).await?;
        if status.is_terminal() {
            self.primary_failed = false;
            self.children[0].reset();
        }
        Ok(status)
    }

    fn on_reset(&mut self) {
        self.primary_failed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::Blackboard;
    use crate::node::test_support::FixedAction;

    fn ctx() -> TickContext {
        TickContext::new(Blackboard::new(), "test")
    }

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let mut r = Recovery::new("r");
        r.children_mut().push(Box::new(FixedAction::new("primary", Status::Success)));
        r.children_mut().push(Box::new(FixedAction::new("fallback", Status::Failure)));
        let mut c = ctx();
        assert_eq!(r.tick(&mut c).await.unwrap(), Status::Success);
        assert_eq!(r.children()[1].status(), Status::Idle);
    }

    #[tokio::test]
    async fn fallback_success_after_primary_failure() {
        let mut r = Recovery::new("r");
        r.children_mut().push(Box::new(FixedAction::new("primary", Status::Failure)));
        r.children_mut().push(Box::new(FixedAction::new("fallback", Status::Success)));
        let mut c = ctx();
        assert_eq!(r.tick(&mut c).await.unwrap(), Status::Success);
    }

    #[tokio::test]
    async fn both_failing_yields_failure() {
        let mut r = Recovery::new("r");
        r.children_mut().push(Box::new(FixedAction::new("primary", Status::Failure)));
        r.children_mut().push(Box::new(FixedAction::new("fallback", Status::Failure)));
        let mut c = ctx();
        assert_eq!(r.tick(&mut c).await.unwrap(), Status::Failure);
    }
}

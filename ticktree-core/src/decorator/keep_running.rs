//! `KeepRunningUntilFailure` — loops the child on SUCCESS, exits on
//! FAILURE (spec §4.3). The inverse shape of `Repeat`: open-ended instead
//! of a fixed cycle count.

use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;

pub struct KeepRunningUntilFailure {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
}

impl KeepRunningUntilFailure {
    pub fn new(id: impl Into<String>) -> Self {
        KeepRunningUntilFailure {
            core: NodeCore::new(id, "KeepRunningUntilFailure"),
            children: Vec::new(),
        }
    }
}

#[async_trait]
impl BtNode for KeepRunningUntilFailure {
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
        Box::new(KeepRunningUntilFailure {
            core: NodeCore::new(self.core.id.clone(), "KeepRunningUntilFailure").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        let child = self
            .children
            .first_mut()
            .ok_or_else(|| TickError::configuration("KeepRunningUntilFailure requires exactly 1 child"))?;
        ctx.check_cancelled()?;
        match child.tick(ctx).await? {
            Status::Success => {
                child.reset();
                Ok(Status::Running)
            }
            Status::Failure => Ok(Status::Success),
            Status::Running => Ok(Status::Running),
            Status::Idle => unreachable!("tick() never commits Idle"),
        }
    }

    async fn on_halt(&mut self, ctx: &mut TickContext) {
        if let Some(child) = self.children.first_mut() {
            child.halt(ctx).await;
        }
    }
}

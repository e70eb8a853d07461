//! `ForceSuccess` / `ForceFailure` — both map to the same implementation
//! parameterized by the status to force, since they differ only in which
//! terminal value they substitute (spec §4.3).

use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedStatus {
    Success,
    Failure,
}

impl From<ForcedStatus> for Status {
    fn from(f: ForcedStatus) -> Status {
        match f {
            ForcedStatus::Success => Status::Success,
            ForcedStatus::Failure => Status::Failure,
        }
    }
}

pub struct Force {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    forced: ForcedStatus,
}

impl Force {
    pub fn new(id: impl Into<String>, forced: ForcedStatus) -> Self {
        let type_tag = match forced {
            ForcedStatus::Success => "ForceSuccess",
            ForcedStatus::Failure => "ForceFailure",
        };
        Force {
            core: NodeCore::new(id, type_tag),
            children: Vec::new(),
            forced,
        }
    }
}

#[async_trait]
impl BtNode for Force {
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
        Box::new(Force {
            core: NodeCore::new(self.core.id.clone(), self.core.type_tag).with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
            forced: self.forced,
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        let child = self
            .children
            .first_mut()
            .ok_or_else(|| TickError::configuration(format!("{} requires exactly 1 child", self.core.type_tag)))?;
        ctx.check_cancelled()?;
        match child.tick(ctx).await? {
            Status::Running => Ok(Status::Running),
            _ => Ok(self.forced.into()),
        }
    }

    async fn on_halt(&mut self, ctx: &mut TickContext) {
        if let Some(child) = self.children.first_mut() {
            child.halt(ctx).await;
        }
    }
}

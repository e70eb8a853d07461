//! `Conditional` — `[condition, then, else?]` (spec §4.2). The branch is
//! latched after first evaluation and not re-decided until it terminates.

use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;

pub struct Conditional {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    branch: Option<usize>,
}

impl Conditional {
    pub fn new(id: impl Into<String>) -> Self {
        Conditional {
            core: NodeCore::new(id, "Conditional"),
            children: Vec::new(),
            branch: None,
        }
    }
}

#[async_trait]
impl BtNode for Conditional {
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
        Box::new(Conditional {
            core: NodeCore::new(self.core.id.clone(), "Conditional").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
            branch: None,
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        if !(2..=3).contains(&self.children.len()) {
            return Err(TickError::configuration("Conditional requires 2 or 3 children"));
        }
        if self.branch.is_none() {
            ctx.check_cancelled()?;
            match self.children[0].tick(ctx).await? {
                Status::Success => self.branch = Some(1),
                Status::Failure => {
                    if self.children.len() == 3 {
                        self.branch = Some(2);
                    } else {
                        return Ok(Status::Failure);
                    }
                }
                Status::Running => return Ok(Status::Running),
                Status::Idle => unreachable!("tick() never commits Idle"),
            }
        }
        let idx = self.branch.expect("set above");
        ctx.check_cancelled()?;
        let status = self.children[idx].tick(ctx).await?;
        if status.is_terminal() {
            self.branch = None;
        }
        Ok(status)
    }

    fn on_reset(&mut self) {
        self.branch = None;
    }
}

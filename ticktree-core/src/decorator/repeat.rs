//! `Repeat` — runs the child `num_cycles` times, failing fast on any child
//! FAILURE (spec §4.3).

use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;

pub struct Repeat {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    num_cycles: u32,
    cycle: u32,
}

impl Repeat {
    pub fn new(id: impl Into<String>, num_cycles: u32) -> Self {
        Repeat {
            core: NodeCore::new(id, "Repeat"),
            children: Vec::new(),
            num_cycles,
            cycle: 0,
        }
    }
}

#[async_trait]
impl BtNode for Repeat {
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
        Box::new(Repeat {
            core: NodeCore::new(self.core.id.clone(), "Repeat").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
            num_cycles: self.num_cycles,
            cycle: 0,
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        if self.num_cycles == 0 {
            return Err(TickError::configuration("Repeat requires num_cycles > 0"));
        }
        let child = self
            .children
            .first_mut()
            .ok_or_else(|| TickError::configuration("Repeat requires exactly 1 child"))?;
        ctx.check_cancelled()?;
        match child.tick(ctx).await? {
            Status::Success => {
                self.cycle += 1;
                child.reset();
                if self.cycle >= self.num_cycles {
                    self.cycle = 0;
                    Ok(Status::Success)
                } else {
                    Ok(Status::Running)
                }
            }
            Status::Failure => {
                self.cycle = 0;
                Ok(Status::Failure)
            }
            Status::Running => Ok(Status::Running),
            Status::Idle => unreachable!("tick() never commits Idle"),
        }
    }

    async fn on_halt(&mut self, ctx: &mut TickContext) {
        if let Some(child) = self.children.first_mut() {
            child.halt(ctx).await;
        }
    }

    fn on_reset(&mut self) {
        self.cycle = 0;
    }
}

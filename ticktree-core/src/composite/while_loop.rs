//! `While` — two children, `[condition, body]` (spec §4.2). The condition
//! is not re-evaluated while the body is mid-flight.

use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;

const DEFAULT_MAX_ITERATIONS: u64 = 1000;

pub struct While {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    max_iterations: u64,
    body_active: bool,
    iterations: u64,
}

impl While {
    pub fn new(id: impl Into<String>, max_iterations: Option<u64>) -> Self {
        While {
            core: NodeCore::new(id, "While"),
            children: Vec::new(),
            max_iterations: max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            body_active: false,
            iterations: 0,
        }
    }
}

#[async_trait]
impl BtNode for While {
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
        Box::new(While {
            core: NodeCore::new(self.core.id.clone(), "While").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
            max_iterations: self.max_iterations,
            body_active: false,
            iterations: 0,
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        if self.children.len() != 2 {
            return Err(TickError::configuration("While requires exactly 2 children: [condition, body]"));
        }
        loop {
            if self.iterations >= self.max_iterations {
                self.iterations = 0;
                self.body_active = false;
                return Ok(Status::Failure);
            }
            ctx.check_cancelled()?;
            if !self.body_active {
                match self.children[0].tick(ctx).await? {
                    Status::Success => self.body_active = true,
                    Status::Failure => return Ok(Status::Success),
                    Status::Running => return Ok(Status::Running),
                    Status::Idle => unreachable!("tick() never commits Idle"),
                }
            }
            ctx.check_cancelled()?;
            match self.children[1].tick(ctx).await? {
                Status::Success => {
                    self.body_active = false;
                    self.iterations += 1;
                    self.children[1].reset();
                }
                Status::Failure => {
                    self.body_active = false;
                    self.iterations = 0;
                    return Ok(Status::Failure);
                }
                Status::Running => return Ok(Status::Running),
                Status::Idle => unreachable!("tick() never commits Idle"),
            }
        }
    }

    fn on_reset(&mut self) {
        self.body_active = false;
        self.iterations = 0;
    }
}

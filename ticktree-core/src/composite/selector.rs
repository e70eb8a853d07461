//! `Selector` / `Fallback` (OR semantics, with cursor memory) — spec §4.2.
//! Structurally Sequence's dual: SUCCESS short-circuits, FAILURE advances.

use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;

pub struct Selector {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    cursor: usize,
}

impl Selector {
    pub fn new(id: impl Into<String>) -> Self {
        Selector {
            core: NodeCore::new(id, "Selector"),
            children: Vec::new(),
            cursor: 0,
        }
    }
}

#[async_trait]
impl BtNode for Selector {
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
        Box::new(Selector {
            core: NodeCore::new(self.core.id.clone(), "Selector").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
            cursor: 0,
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        if self.children.is_empty() {
            return Ok(Status::Failure);
        }
        loop {
            ctx.check_cancelled()?;
            // A misconfigured child's ConfigurationError must not be
            // swallowed into "try the next child" — the envelope already
            // propagates it via `?` before we ever see a Status here.
            let status = self.children[self.cursor].tick(ctx).await?;
            match status {
                Status::Failure => {
                    self.cursor += 1;
                    if self.cursor == self.children.len() {
                        self.cursor = 0;
                        return Ok(Status::Failure);
                    }
                }
                Status::Success => {
                    self.cursor = 0;
                    return Ok(Status::Success);
                }
                Status::Running => return Ok(Status::Running),
                Status::Idle => unreachable!("tick() never commits Idle"),
            }
        }
    }

    fn on_reset(&mut self) {
        self.cursor = 0;
    }
}

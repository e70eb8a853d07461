//! `Sequence` (AND, with cursor memory) and `ReactiveSequence` (AND, no
//! memory) — spec §4.2. `MemorySequence` is just `Sequence` under a second
//! registry type tag; there is no separate Rust type for it.

use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;

/// Ticks children left-to-right from a stored cursor. A FAILURE resets the
/// cursor to 0; a RUNNING child holds the cursor in place so the next tick
/// resumes at the same child.
pub struct Sequence {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    cursor: usize,
}

impl Sequence {
    pub fn new(id: impl Into<String>, type_tag: &'static str) -> Self {
        Sequence {
            core: NodeCore::new(id, type_tag),
            children: Vec::new(),
            cursor: 0,
        }
    }
}

#[async_trait]
impl BtNode for Sequence {
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
        Box::new(Sequence {
            core: NodeCore::new(self.core.id.clone(), self.core.type_tag).with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
            cursor: 0,
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        if self.children.is_empty() {
            return Ok(Status::Success);
        }
        loop {
            ctx.check_cancelled()?;
            let status = self.children[self.cursor].tick(ctx).await?;
            match status {
                Status::Success => {
                    self.cursor += 1;
                    if self.cursor == self.children.len() {
                        self.cursor = 0;
                        return Ok(Status::Success);
                    }
                }
                Status::Failure => {
                    self.cursor = 0;
                    return Ok(Status::Failure);
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

/// Same AND semantics as `Sequence` but with no cursor: every tick restarts
/// at child 0, so earlier guard conditions are re-evaluated live.
pub struct ReactiveSequence {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
}

impl ReactiveSequence {
    pub fn new(id: impl Into<String>) -> Self {
        ReactiveSequence {
            core: NodeCore::new(id, "ReactiveSequence"),
            children: Vec::new(),
        }
    }
}

#[async_trait]
impl BtNode for ReactiveSequence {
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
        Box::new(ReactiveSequence {
            core: NodeCore::new(self.core.id.clone(), "ReactiveSequence").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        if self.children.is_empty() {
            return Ok(Status::Success);
        }
        for i in 0..self.children.len() {
            ctx.check_cancelled()?;
            let status = self.children[i].tick(ctx).await?;
            match status {
                Status::Success => continue,
                Status::Failure => {
                    self.halt_from(i + 1, ctx).await;
                    return Ok(Status::Failure);
                }
                Status::Running => {
                    self.halt_from(i + 1, ctx).await;
                    return Ok(Status::Running);
                }
                Status::Idle => unreachable!("tick() never commits Idle"),
            }
        }
        Ok(Status::Success)
    }
}

impl ReactiveSequence {
    /// A previous tick may have left children past `from` RUNNING; since
    /// this tick restarts at 0 and stopped earlier, halt them.
    async fn halt_from(&mut self, from: usize, ctx: &mut TickContext) {
        for child in self.children.iter_mut().skip(from) {
            if child.status() == Status::Running {
                child.halt(ctx).await;
            }
        }
    }
}

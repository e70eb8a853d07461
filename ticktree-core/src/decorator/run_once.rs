//! `RunOnce` — ticks the child at most once per cycle, caching its terminal
//! status for every subsequent tick until `reset()` (spec §4.3).

use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;

pub struct RunOnce {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    cached: Option<Status>,
}

impl RunOnce {
    pub fn new(id: impl Into<String>) -> Self {
        RunOnce {
            core: NodeCore::new(id, "RunOnce"),
            children: Vec::new(),
            cached: None,
        }
    }
}

#[async_trait]
impl BtNode for RunOnce {
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
        Box::new(RunOnce {
            core: NodeCore::new(self.core.id.clone(), "RunOnce").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
            cached: None,
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        if let Some(status) = self.cached {
            return Ok(status);
        }
        let child = self
            .children
            .first_mut()
            .ok_or_else(|| TickError::configuration("RunOnce requires exactly 1 child"))?;
        ctx.check_cancelled()?;
        let status = child.tick(ctx).await?;
        if status.is_terminal() {
            self.cached = Some(status);
        }
        Ok(status)
    }

    async fn on_halt(&mut self, ctx: &mut TickContext) {
        if let Some(child) = self.children.first_mut() {
            child.halt(ctx).await;
        }
    }

    fn on_reset(&mut self) {
        self.cached = None;
    }
}

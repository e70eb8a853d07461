//! `SoftAssert` — downgrades child FAILURE to SUCCESS, recording the
//! failure instead of letting it propagate upward (spec §4.3).

use crate::clock::Timestamp;
use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub node_id: String,
    pub message: String,
    pub timestamp: Timestamp,
}

pub struct SoftAssert {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    failures: Vec<FailureRecord>,
}

impl SoftAssert {
    pub fn new(id: impl Into<String>) -> Self {
        SoftAssert {
            core: NodeCore::new(id, "SoftAssert"),
            children: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn get_failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[async_trait]
impl BtNode for SoftAssert {
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
        Box::new(SoftAssert {
            core: NodeCore::new(self.core.id.clone(), "SoftAssert").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
            failures: Vec::new(),
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        let child = self
            .children
            .first_mut()
            .ok_or_else(|| TickError::configuration("SoftAssert requires exactly 1 child"))?;
        ctx.check_cancelled()?;
        let status = child.tick(ctx).await?;
        if status == Status::Failure {
            let message = child.last_error().unwrap_or("soft assertion failed").to_string();
            self.failures.push(FailureRecord {
                node_id: child.id().to_string(),
                message,
                timestamp: ctx.now_ms(),
            });
            return Ok(Status::Success);
        }
        Ok(status)
    }

    async fn on_halt(&mut self, ctx: &mut TickContext) {
        if let Some(child) = self.children.first_mut() {
            child.halt(ctx).await;
        }
    }

    fn on_reset(&mut self) {
        self.failures.clear();
    }
}

//! `Retry` / `RetryUntilSuccessful` — ticks the child once per invocation,
//! retrying after FAILURE up to `max_attempts` times, with an optional
//! inter-attempt delay (spec §4.3).

use crate::clock::Timestamp;
use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;

pub struct Retry {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    max_attempts: u32,
    retry_delay_ms: u64,
    attempt: u32,
    waiting_since: Option<Timestamp>,
}

impl Retry {
    pub fn new(id: impl Into<String>, max_attempts: u32, retry_delay_ms: u64) -> Self {
        Retry {
            core: NodeCore::new(id, "Retry"),
            children: Vec::new(),
            max_attempts,
            retry_delay_ms,
            attempt: 0,
            waiting_since: None,
        }
    }
}

#[async_trait]
impl BtNode for Retry {
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
        Box::new(Retry {
            core: NodeCore::new(self.core.id.clone(), "Retry").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
            max_attempts: self.max_attempts,
            retry_delay_ms: self.retry_delay_ms,
            attempt: 0,
            waiting_since: None,
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        if self.max_attempts == 0 {
            return Err(TickError::configuration("Retry requires max_attempts > 0"));
        }
        let child = self
            .children
            .first_mut()
            .ok_or_else(|| TickError::configuration("Retry requires exactly 1 child"))?;
        ctx.check_cancelled()?;

        if let Some(started) = self.waiting_since {
            if ctx.now_ms() - started < self.retry_delay_ms as i64 {
                return Ok(Status::Running);
            }
            self.waiting_since = None;
        }

        match child.tick(ctx).await? {
            Status::Success => {
                self.attempt = 0;
                Ok(Status::Success)
            }
            Status::Running => Ok(Status::Running),
            Status::Failure => {
                self.attempt += 1;
                if self.attempt >= self.max_attempts {
                    self.attempt = 0;
                    Ok(Status::Failure)
                } else {
                    child.reset();
                    if self.retry_delay_ms > 0 {
                        self.waiting_since = Some(ctx.now_ms());
                    }
                    Ok(Status::Running)
                }
            }
            Status::Idle => unreachable!("tick() never commits Idle"),
        }
    }

    async fn on_halt(&mut self, ctx: &mut TickContext) {
        if let Some(child) = self.children.first_mut() {
            child.halt(ctx).await;
        }
    }

    fn on_reset(&mut self) {
        self.attempt = 0;
        self.waiting_since = None;
    }
}

//! `Timeout` and `Delay` — both are single-child decorators driven purely
//! by the clock, needing no real async timer (spec §4.3, §5).

use crate::clock::Timestamp;
use crate::context::TickContext;
use crate::error::TickError;
use crate::node::{BtNode, NodeCore};
use crate::status::Status;
use async_trait::async_trait;

/// Fails the child if it is still RUNNING once `timeout_ms` has elapsed
/// since the timer started, halting it first.
pub struct Timeout {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    timeout_ms: u64,
    start_ms: Option<Timestamp>,
}

impl Timeout {
    pub fn new(id: impl Into<String>, timeout_ms: u64) -> Self {
        Timeout {
            core: NodeCore::new(id, "Timeout"),
            children: Vec::new(),
            timeout_ms,
            start_ms: None,
        }
    }
}

#[async_trait]
impl BtNode for Timeout {
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
        Box::new(Timeout {
            core: NodeCore::new(self.core.id.clone(), "Timeout").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
            timeout_ms: self.timeout_ms,
            start_ms: None,
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        if self.timeout_ms == 0 {
            return Err(TickError::configuration("Timeout requires timeout_ms > 0"));
        }
        ctx.check_cancelled()?;
        let start = *self.start_ms.get_or_insert_with(|| ctx.now_ms());
        if ctx.now_ms() - start >= self.timeout_ms as i64 {
            self.start_ms = None;
            if let Some(child) = self.children.first_mut() {
                if child.status() == Status::Running {
                    child.halt(ctx).await;
                }
            }
            return Ok(Status::Failure);
        }

        let child = self
            .children
            .first_mut()
            .ok_or_else(|| TickError::configuration("Timeout requires exactly 1 child"))?;
        let status = child.tick(ctx).await?;
        if status == Status::Running && ctx.now_ms() - start >= self.timeout_ms as i64 {
            child.halt(ctx).await;
            self.start_ms = None;
            return Ok(Status::Failure);
        }
        if status.is_terminal() {
            self.start_ms = None;
        }
        Ok(status)
    }

    async fn on_halt(&mut self, ctx: &mut TickContext) {
        if let Some(child) = self.children.first_mut() {
            child.halt(ctx).await;
        }
        self.start_ms = None;
    }

    fn on_reset(&mut self) {
        self.start_ms = None;
    }
}

/// `delay_ms == 0` is passthrough; otherwise the child is not ticked until
/// `delay_ms` has elapsed since the first tick of this cycle (spec §9 open
/// question: this is the polling model, not the "await sleep then tick
/// inline" short-circuit a durable host integration might choose instead).
pub struct Delay {
    core: NodeCore,
    children: Vec<Box<dyn BtNode>>,
    delay_ms: u64,
    start_ms: Option<Timestamp>,
}

impl Delay {
    pub fn new(id: impl Into<String>, delay_ms: u64) -> Self {
        Delay {
            core: NodeCore::new(id, "Delay"),
            children: Vec::new(),
            delay_ms,
            start_ms: None,
        }
    }
}

#[async_trait]
impl BtNode for Delay {
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
        Box::new(Delay {
            core: NodeCore::new(self.core.id.clone(), "Delay").with_name(self.core.name.clone()),
            children: self.children.iter().map(|c| c.clone_fresh()).collect(),
            delay_ms: self.delay_ms,
            start_ms: None,
        })
    }

    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        let child = self
            .children
            .first_mut()
            .ok_or_else(|| TickError::configuration("Delay requires exactly 1 child"))?;
        ctx.check_cancelled()?;
        if self.delay_ms == 0 {
            return child.tick(ctx).await;
        }
        let start = *self.start_ms.get_or_insert_with(|| ctx.now_ms());
        if ctx.now_ms() - start < self.delay_ms as i64 {
            return Ok(Status::Running);
        }
        let status = child.tick(ctx).await?;
        if status.is_terminal() {
            self.start_ms = None;
        }
        Ok(status)
    }

    async fn on_halt(&mut self, ctx: &mut TickContext) {
        if let Some(child) = self.children.first_mut() {
            child.halt(ctx).await;
        }
    }

    fn on_reset(&mut self) {
        self.start_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::Blackboard;
    use crate::clock::Clock;
    use crate::node::test_support::{CountingAction, FixedAction};
    use async_trait::async_trait as at;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    fn ctx() -> TickContext {
        TickContext::new(Blackboard::new(), "test")
    }

    /// A clock whose `now_ms()` is advanced manually by the test, so elapsed
    /// time doesn't depend on wall-clock scheduling jitter.
    struct ManualClock(AtomicI64);

    #[at]
    impl Clock for ManualClock {
        fn now_ms(&self) -> Timestamp {
            self.0.load(Ordering::SeqCst)
        }
        async fn sleep(&self, _ms: u64, _cancel: &crate::cancel::CancellationToken) -> Result<(), ()> {
            Ok(())
        }
    }

    fn ctx_with_manual_clock() -> (TickContext, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock(AtomicI64::new(0)));
        let ctx = TickContext::new(Blackboard::new(), "test").with_clock(clock.clone());
        (ctx, clock)
    }

    #[tokio::test]
    async fn timeout_fails_and_halts_running_child_once_elapsed() {
        let mut t = Timeout::new("t", 50);
        t.children_mut().push(Box::new(CountingAction::new("slow", 1000, Status::Success)));
        let (mut c, clock) = ctx_with_manual_clock();
        assert_eq!(t.tick(&mut c).await.unwrap(), Status::Running);
        clock.0.store(51, Ordering::SeqCst);
        assert_eq!(t.tick(&mut c).await.unwrap(), Status::Failure);
        assert_eq!(t.children()[0].status(), Status::Idle);
    }

    #[tokio::test]
    async fn timeout_passes_through_terminal_child_within_budget() {
        let mut t = Timeout::new("t", 1000);
        t.children_mut().push(Box::new(FixedAction::new("fast", Status::Success)));
        let mut c = ctx();
        assert_eq!(t.tick(&mut c).await.unwrap(), Status::Success);
    }

    #[tokio::test]
    async fn delay_holds_child_until_elapsed() {
        let mut d = Delay::new("d", 100);
        d.children_mut().push(Box::new(FixedAction::new("a", Status::Success)));
        let (mut c, clock) = ctx_with_manual_clock();
        assert_eq!(d.tick(&mut c).await.unwrap(), Status::Running);
        clock.0.store(100, Ordering::SeqCst);
        assert_eq!(d.tick(&mut c).await.unwrap(), Status::Success);
    }

    #[tokio::test]
    async fn zero_delay_is_passthrough() {
        let mut d = Delay::new("d", 0);
        d.children_mut().push(Box::new(FixedAction::new("a", Status::Success)));
        let mut c = ctx();
        assert_eq!(d.tick(&mut c).await.unwrap(), Status::Success);
    }
}

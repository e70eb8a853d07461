//! The base node: common fields every concrete node embeds, plus the tick
//! envelope every node runs through (spec §4.1).
//!
//! Nodes are trait objects (`Box<dyn BtNode>`) rather than a class
//! hierarchy — "a tagged-variant encoding with a trait-object-style
//! behavior table is preferred over deep inheritance" (spec §9). Each
//! concrete node owns an embedded [`NodeCore`]; the only polymorphic point
//! is [`BtNode::execute_tick`] plus the two lifecycle hooks.

use crate::context::TickContext;
use crate::error::TickError;
use crate::events::{Event, EventKind};
use crate::status::Status;
use async_trait::async_trait;
use serde_json::{Map, Value as Json};

/// Fields every node embeds. There is intentionally no `parent` pointer:
/// Rust ownership already forbids the cycle the spec calls out as
/// forbidden, and `Tree`'s id/path indices let a caller resolve ancestry
/// without one (spec §9 "parent back-references").
#[derive(Debug, Clone)]
pub struct NodeCore {
    pub id: String,
    pub name: String,
    pub type_tag: &'static str,
    pub status: Status,
    pub last_error: Option<String>,
    pub config: Map<String, Json>,
}

impl NodeCore {
    pub fn new(id: impl Into<String>, type_tag: &'static str) -> Self {
        let id = id.into();
        NodeCore {
            name: id.clone(),
            id,
            type_tag,
            status: Status::Idle,
            last_error: None,
            config: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_config(mut self, config: Map<String, Json>) -> Self {
        self.config = config;
        self
    }

    /// Resolve the blackboard key a config port actually reads/writes: if
    /// `config[key]` is a string, that string is the blackboard key,
    /// otherwise the literal `key` is used (spec §4.1 "Input/output
    /// remapping" — the single mechanism for data flow between nodes).
    pub fn remapped_key<'a>(&'a self, key: &'a str) -> &'a str {
        match self.config.get(key) {
            Some(Json::String(s)) => s.as_str(),
            _ => key,
        }
    }

    pub fn get_input(&self, ctx: &TickContext, key: &str) -> Option<Json> {
        ctx.blackboard.get(self.remapped_key(key))
    }

    pub fn get_input_or(&self, ctx: &TickContext, key: &str, default: Json) -> Json {
        self.get_input(ctx, key).unwrap_or(default)
    }

    pub fn set_output(&self, ctx: &TickContext, key: &str, value: Json) {
        ctx.blackboard.set(self.remapped_key(key).to_string(), value);
    }

    fn start_event(&self) -> Event {
        Event {
            kind: EventKind::TickStart,
            node_id: self.id.clone(),
            node_name: self.name.clone(),
            node_type: self.type_tag.to_string(),
            timestamp: 0,
            data: Json::Null,
        }
    }

    fn end_event(&self, status: Status) -> Event {
        Event {
            kind: EventKind::TickEnd,
            node_id: self.id.clone(),
            node_name: self.name.clone(),
            node_type: self.type_tag.to_string(),
            timestamp: 0,
            data: serde_json::json!({ "status": format!("{:?}", status) }),
        }
    }

    fn error_event(&self, message: &str) -> Event {
        Event {
            kind: EventKind::Error,
            node_id: self.id.clone(),
            node_name: self.name.clone(),
            node_type: self.type_tag.to_string(),
            timestamp: 0,
            data: Json::String(message.to_string()),
        }
    }
}

/// The single primitive every node implements, plus the envelope every
/// node runs it through. See module docs.
#[async_trait]
pub trait BtNode: Send + Sync {
    fn core(&self) -> &NodeCore;
    fn core_mut(&mut self) -> &mut NodeCore;

    fn id(&self) -> &str {
        &self.core().id
    }

    fn status(&self) -> Status {
        self.core().status
    }

    fn last_error(&self) -> Option<&str> {
        self.core().last_error.as_deref()
    }

    fn children(&self) -> &[Box<dyn BtNode>];
    fn children_mut(&mut self) -> &mut Vec<Box<dyn BtNode>>;

    /// A structural copy in the Idle state with internal progress reset —
    /// used by `SubTree`/`Registry::clone_tree` to stamp out a fresh
    /// instance of a named tree template. Not a `Clone` impl because
    /// `dyn BtNode` isn't `Sized`.
    fn clone_fresh(&self) -> Box<dyn BtNode>;

    /// `Some(tree_id)` for a `SubTree` node, `None` otherwise. Used by the
    /// registry's SubTree cycle check at `register_tree` time.
    fn subtree_target(&self) -> Option<&str> {
        None
    }

    /// The node's own behavior. Implementors must not catch `TickError`
    /// from their children's `tick()` calls except to aggregate Status —
    /// propagating errors are the envelope's job, not theirs (spec §7).
    async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError>;

    /// Invoked by `halt()` only when `status == Running`. Composites
    /// override to halt all RUNNING children; decorators to halt their one
    /// child; actions keep the default no-op.
    async fn on_halt(&mut self, _ctx: &mut TickContext) {}

    /// Invoked unconditionally by `reset()`, after status/last_error are
    /// cleared, before recursing into children. Clears internal progress
    /// state (cursors, timers, attempt counts).
    fn on_reset(&mut self) {}

    /// The tick envelope (spec §4.1). Do not override.
    async fn tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
        tracing::trace!(node_id = self.id(), node_type = self.core().type_tag, "tick start");
        let start = self.core().start_event();
        ctx.emit(Event { timestamp: ctx.now_ms(), ..start });

        if ctx.is_fast_forwarding_past(self.id()) {
            // Fast-forward: structural traversal continues, but bodies
            // don't run and nodes don't touch the blackboard.
            for child in self.children_mut() {
                let _ = child.tick(ctx).await;
            }
            self.core_mut().status = Status::Success;
            let end = self.core().end_event(Status::Success);
            ctx.emit(Event { timestamp: ctx.now_ms(), ..end });
            return Ok(Status::Success);
        }

        // Reaching here means this node is either outside any resume
        // fast-forward, or is the resume target itself — either way,
        // normal execution (of this node and everything after it) resumes.
        ctx.mark_resume_point_reached(self.id());

        match self.execute_tick(ctx).await {
            Ok(status) => {
                self.core_mut().status = status;
                tracing::trace!(node_id = self.id(), ?status, "tick end");
                let end = self.core().end_event(status);
                ctx.emit(Event { timestamp: ctx.now_ms(), ..end });
                Ok(status)
            }
            Err(err) => {
                self.core_mut().status = Status::Failure;
                self.core_mut().last_error = Some(err.to_string());
                if err.is_propagating() {
                    tracing::error!(node_id = self.id(), %err, "tick raised a propagating error");
                } else {
                    tracing::warn!(node_id = self.id(), %err, "tick raised an operational failure");
                }
                let err_evt = self.core().error_event(&err.to_string());
                ctx.emit(Event { timestamp: ctx.now_ms(), ..err_evt });
                let end = self.core().end_event(Status::Failure);
                ctx.emit(Event { timestamp: ctx.now_ms(), ..end });
                if err.is_propagating() {
                    Err(err)
                } else {
                    Ok(Status::Failure)
                }
            }
        }
    }

    /// Effective only when `status == Running`.
    async fn halt(&mut self, ctx: &mut TickContext) {
        if self.status() != Status::Running {
            return;
        }
        self.on_halt(ctx).await;
        self.core_mut().status = Status::Idle;
        ctx.running_ops.clear_node(self.id());
        let evt = Event {
            kind: EventKind::Halt,
            node_id: self.id().to_string(),
            node_name: self.core().name.clone(),
            node_type: self.core().type_tag.to_string(),
            timestamp: ctx.now_ms(),
            data: Json::Null,
        };
        ctx.emit(evt);
    }

    /// Unconditional; recurses into children.
    fn reset(&mut self) {
        self.core_mut().status = Status::Idle;
        self.core_mut().last_error = None;
        self.on_reset();
        for child in self.children_mut() {
            child.reset();
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::context::TickContext;

    /// A leaf that always returns a fixed status, recording how many times
    /// it was ticked.
    pub struct FixedAction {
        core: NodeCore,
        pub status: Status,
        pub ticks: usize,
        no_children: Vec<Box<dyn BtNode>>,
    }

    impl FixedAction {
        pub fn new(id: &str, status: Status) -> Self {
            FixedAction {
                core: NodeCore::new(id, "FixedAction"),
                status,
                ticks: 0,
                no_children: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl BtNode for FixedAction {
        fn core(&self) -> &NodeCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut NodeCore {
            &mut self.core
        }
        fn children(&self) -> &[Box<dyn BtNode>] {
            &self.no_children
        }
        fn children_mut(&mut self) -> &mut Vec<Box<dyn BtNode>> {
            &mut self.no_children
        }
        async fn execute_tick(&mut self, _ctx: &mut TickContext) -> Result<Status, TickError> {
            self.ticks += 1;
            Ok(self.status)
        }
        fn clone_fresh(&self) -> Box<dyn BtNode> {
            Box::new(FixedAction::new(&self.core.id, self.status))
        }
    }

    /// A leaf that fails `fail_times` times (with `TickError::Operational`)
    /// then succeeds — used for Retry tests.
    pub struct FlakyAction {
        core: NodeCore,
        pub fail_times: usize,
        pub attempts: usize,
        no_children: Vec<Box<dyn BtNode>>,
    }

    impl FlakyAction {
        pub fn new(id: &str, fail_times: usize) -> Self {
            FlakyAction {
                core: NodeCore::new(id, "FlakyAction"),
                fail_times,
                attempts: 0,
                no_children: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl BtNode for FlakyAction {
        fn core(&self) -> &NodeCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut NodeCore {
            &mut self.core
        }
        fn children(&self) -> &[Box<dyn BtNode>] {
            &self.no_children
        }
        fn children_mut(&mut self) -> &mut Vec<Box<dyn BtNode>> {
            &mut self.no_children
        }
        async fn execute_tick(&mut self, _ctx: &mut TickContext) -> Result<Status, TickError> {
            self.attempts += 1;
            if self.attempts <= self.fail_times {
                Err(TickError::operational("flaky failure"))
            } else {
                Ok(Status::Success)
            }
        }
        fn on_reset(&mut self) {
            self.attempts = 0;
        }
        fn clone_fresh(&self) -> Box<dyn BtNode> {
            Box::new(FlakyAction::new(&self.core.id, self.fail_times))
        }
    }

    /// A leaf returning RUNNING a fixed number of times, then the given
    /// terminal status.
    pub struct CountingAction {
        core: NodeCore,
        pub running_for: usize,
        pub then: Status,
        pub ticks: usize,
        no_children: Vec<Box<dyn BtNode>>,
    }

    impl CountingAction {
        pub fn new(id: &str, running_for: usize, then: Status) -> Self {
            CountingAction {
                core: NodeCore::new(id, "CountingAction"),
                running_for,
                then,
                ticks: 0,
                no_children: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl BtNode for CountingAction {
        fn core(&self) -> &NodeCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut NodeCore {
            &mut self.core
        }
        fn children(&self) -> &[Box<dyn BtNode>] {
            &self.no_children
        }
        fn children_mut(&mut self) -> &mut Vec<Box<dyn BtNode>> {
            &mut self.no_children
        }
        async fn execute_tick(&mut self, _ctx: &mut TickContext) -> Result<Status, TickError> {
            self.ticks += 1;
            if self.ticks <= self.running_for {
                Ok(Status::Running)
            } else {
                Ok(self.then)
            }
        }
        fn on_reset(&mut self) {
            self.ticks = 0;
        }
        fn clone_fresh(&self) -> Box<dyn BtNode> {
            Box::new(CountingAction::new(&self.core.id, self.running_for, self.then))
        }
    }

    /// A leaf that always raises a propagating `TickError::Configuration`.
    pub struct MisconfiguredAction {
        core: NodeCore,
        no_children: Vec<Box<dyn BtNode>>,
    }

    impl MisconfiguredAction {
        pub fn new(id: &str) -> Self {
            MisconfiguredAction {
                core: NodeCore::new(id, "MisconfiguredAction"),
                no_children: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl BtNode for MisconfiguredAction {
        fn core(&self) -> &NodeCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut NodeCore {
            &mut self.core
        }
        fn children(&self) -> &[Box<dyn BtNode>] {
            &self.no_children
        }
        fn children_mut(&mut self) -> &mut Vec<Box<dyn BtNode>> {
            &mut self.no_children
        }
        async fn execute_tick(&mut self, _ctx: &mut TickContext) -> Result<Status, TickError> {
            Err(TickError::configuration("bad config"))
        }
        fn clone_fresh(&self) -> Box<dyn BtNode> {
            Box::new(MisconfiguredAction::new(&self.core.id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::blackboard::Blackboard;
    use crate::context::TickContext;

    fn ctx() -> TickContext {
        TickContext::new(Blackboard::new(), "test-session")
    }

    #[tokio::test]
    async fn terminal_status_is_committed_immediately() {
        let mut node = FixedAction::new("a", Status::Success);
        let mut c = ctx();
        let status = node.tick(&mut c).await.unwrap();
        assert_eq!(status, Status::Success);
        assert_eq!(node.status(), Status::Success);
    }

    #[tokio::test]
    async fn operational_error_converts_to_failure_and_does_not_propagate() {
        let mut node = FlakyAction::new("a", 1);
        let mut c = ctx();
        let status = node.tick(&mut c).await.unwrap();
        assert_eq!(status, Status::Failure);
        assert!(node.last_error().is_some());
    }

    #[tokio::test]
    async fn configuration_error_propagates() {
        let mut node = MisconfiguredAction::new("a");
        let mut c = ctx();
        let err = node.tick(&mut c).await.unwrap_err();
        assert!(err.is_propagating());
        assert_eq!(node.status(), Status::Failure);
    }

    #[tokio::test]
    async fn reset_clears_status_and_error_idempotently() {
        let mut node = FlakyAction::new("a", 1);
        let mut c = ctx();
        let _ = node.tick(&mut c).await.unwrap();
        node.reset();
        assert_eq!(node.status(), Status::Idle);
        assert!(node.last_error().is_none());
        node.reset();
        assert_eq!(node.status(), Status::Idle);
    }

    #[tokio::test]
    async fn halt_is_noop_when_not_running() {
        let mut node = FixedAction::new("a", Status::Success);
        let mut c = ctx();
        let _ = node.tick(&mut c).await.unwrap();
        assert_eq!(node.status(), Status::Success);
        node.halt(&mut c).await;
        assert_eq!(node.status(), Status::Success);
    }

    #[test]
    fn remapped_key_uses_config_string_as_indirection() {
        let mut core = NodeCore::new("n", "Action");
        core.config.insert("x".into(), Json::String("actual_key".into()));
        assert_eq!(core.remapped_key("x"), "actual_key");
        assert_eq!(core.remapped_key("y"), "y");
    }
}

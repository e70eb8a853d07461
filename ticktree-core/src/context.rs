//! Per-tick context threaded through every node's `execute_tick`.

use crate::blackboard::Blackboard;
use crate::cancel::CancellationToken;
use crate::clock::{default_clock, Clock, Timestamp};
use crate::error::TickError;
use crate::events::{Event, EventKind, EventSink};
use crate::registry::Registry;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Cross-tick continuation state, keyed by node id, owned by the tick
/// engine and shared read-write by all nodes (spec §3, §5).
///
/// Node-local progress (a cursor, a timer start) is authoritative on the
/// node struct itself; entries here are a diagnostic mirror used for
/// snapshotting and inspection, and are always cleared on halt/reset.
#[derive(Clone, Default)]
pub struct RunningOpsMap {
    inner: Arc<RwLock<HashMap<String, Json>>>,
}

impl RunningOpsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, node_id: &str, state: Json) {
        self.inner
            .write()
            .expect("running_ops lock poisoned")
            .insert(node_id.to_string(), state);
    }

    pub fn clear_node(&self, node_id: &str) {
        self.inner
            .write()
            .expect("running_ops lock poisoned")
            .remove(node_id);
    }

    pub fn get(&self, node_id: &str) -> Option<Json> {
        self.inner
            .read()
            .expect("running_ops lock poisoned")
            .get(node_id)
            .cloned()
    }

    pub fn snapshot(&self) -> HashMap<String, Json> {
        self.inner.read().expect("running_ops lock poisoned").clone()
    }
}

/// The per-tick record threaded through the whole tree (spec §3).
#[derive(Clone)]
pub struct TickContext {
    pub blackboard: Blackboard,
    pub tree_registry: Option<Registry>,
    pub cancellation: CancellationToken,
    pub clock: Arc<dyn Clock>,
    pub event_sink: Option<Arc<dyn EventSink>>,
    pub running_ops: RunningOpsMap,
    /// Fast-forward target for resume (spec §4.1, §4.6).
    pub resume_from_node_id: Option<String>,
    pub has_reached_resume_point: bool,
    pub session_id: String,
    pub timestamp: Timestamp,
    pub delta_time: i64,
}

impl TickContext {
    pub fn new(blackboard: Blackboard, session_id: impl Into<String>) -> Self {
        let clock = default_clock();
        let now = clock.now_ms();
        TickContext {
            blackboard,
            tree_registry: None,
            cancellation: CancellationToken::new(),
            clock,
            event_sink: None,
            running_ops: RunningOpsMap::new(),
            resume_from_node_id: None,
            has_reached_resume_point: true,
            session_id: session_id.into(),
            timestamp: now,
            delta_time: 0,
        }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.tree_registry = Some(registry);
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Prepare a context that fast-forwards structural traversal until
    /// `resume_from_node_id` is reached (spec §4.6 "Resume").
    pub fn for_resume(mut self, resume_from_node_id: impl Into<String>) -> Self {
        self.resume_from_node_id = Some(resume_from_node_id.into());
        self.has_reached_resume_point = false;
        self
    }

    pub fn check_cancelled(&self) -> Result<(), TickError> {
        self.cancellation.check()
    }

    pub fn now_ms(&self) -> Timestamp {
        self.clock.now_ms()
    }

    pub async fn sleep(&self, ms: u64) -> Result<(), TickError> {
        self.clock
            .sleep(ms, &self.cancellation)
            .await
            .map_err(|_| TickError::Cancelled)
    }

    /// True if fast-forwarding past this node's body (it is not yet the
    /// resume target) — leaves should return SUCCESS without side effects.
    pub fn is_fast_forwarding_past(&self, node_id: &str) -> bool {
        match &self.resume_from_node_id {
            Some(target) => !self.has_reached_resume_point && target != node_id,
            None => false,
        }
    }

    /// Call once the resume target has actually been reached.
    pub fn mark_resume_point_reached(&mut self, node_id: &str) {
        if let Some(target) = &self.resume_from_node_id {
            if target == node_id {
                self.has_reached_resume_point = true;
            }
        }
    }

    pub fn emit(&self, event: Event) {
        if let Some(sink) = &self.event_sink {
            sink.emit(event);
        }
    }

    pub fn log(&self, node_id: &str, node_name: &str, node_type: &str, message: impl Into<String>) {
        self.emit(Event {
            kind: EventKind::Log,
            node_id: node_id.to_string(),
            node_name: node_name.to_string(),
            node_type: node_type.to_string(),
            timestamp: self.now_ms(),
            data: Json::String(message.into()),
        });
    }
}

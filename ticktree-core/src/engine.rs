//! The tick driver: single-reentrancy guard, auto-reset, per-tick timeout,
//! snapshot capture, and the `tick_while_running` loop with back-off
//! (spec §4.6).

use crate::backoff::{TickDelay, TickDelayStrategy};
use crate::blackboard::Blackboard;
use crate::cancel::CancellationToken;
use crate::clock::{default_clock, Clock};
use crate::context::TickContext;
use crate::error::TickError;
use crate::events::{Event, EventKind, EventSink, InMemoryEventSink};
use crate::node::BtNode;
use crate::registry::Registry;
use crate::snapshot::Snapshot;
use crate::status::Status;
use serde_json::Map as JsonMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Fans an emitted event out to the engine's internal trace collector and
/// to a caller-supplied sink, so snapshotting never depends on whether the
/// caller is also listening.
struct FanoutSink {
    trace: Arc<InMemoryEventSink>,
    external: Option<Arc<dyn EventSink>>,
}

impl EventSink for FanoutSink {
    fn emit(&self, event: Event) {
        self.trace.emit(event.clone());
        if let Some(external) = &self.external {
            external.emit(event);
        }
    }
}

#[derive(Clone)]
pub struct EngineConfig {
    pub per_tick_timeout_ms: Option<u64>,
    pub delay_strategy: TickDelayStrategy,
    pub max_ticks: Option<u64>,
    pub event_sink: Option<Arc<dyn EventSink>>,
    pub clock: Arc<dyn Clock>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            per_tick_timeout_ms: None,
            delay_strategy: TickDelayStrategy::Auto,
            max_ticks: None,
            event_sink: None,
            clock: default_clock(),
        }
    }
}

/// Execution feedback from `tick_while_running` (spec §4.6): the first
/// node to raise a propagating error is kept, later errors in the same run
/// are discarded — the caller gets the root cause, not a cascade.
#[derive(Debug, Clone)]
pub struct TickRunResult {
    pub status: Status,
    pub tick_count: u64,
    pub logs: Vec<Event>,
    pub failed_node_id: Option<String>,
    pub failed_error: Option<String>,
}

/// Drives a single tree's execution across any number of ticks.
///
/// Not `Clone`: the reentrancy guard and tick counter are process-local
/// execution state, not something that should fork.
pub struct TickEngine {
    root: Box<dyn BtNode>,
    blackboard: Blackboard,
    registry: Option<Registry>,
    cancellation: CancellationToken,
    config: EngineConfig,
    tick_number: u64,
    previous_blackboard: Option<JsonMap<String, serde_json::Value>>,
    ticking: Arc<AtomicBool>,
    /// id of the node whose `ERROR` event was first in the most recent
    /// failing tick's trace — the actual node that raised the error, which
    /// may be deep inside the tree rather than the root (spec §4.6
    /// "Execution feedback").
    last_failed_node_id: Option<String>,
}

impl TickEngine {
    pub fn new(root: Box<dyn BtNode>, blackboard: Blackboard, config: EngineConfig) -> Self {
        TickEngine {
            root,
            blackboard,
            registry: None,
            cancellation: CancellationToken::new(),
            config,
            tick_number: 0,
            previous_blackboard: None,
            ticking: Arc::new(AtomicBool::new(false)),
            last_failed_node_id: None,
        }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn root(&self) -> &dyn BtNode {
        self.root.as_ref()
    }

    pub fn root_mut(&mut self) -> &mut Box<dyn BtNode> {
        &mut self.root
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn tick_number(&self) -> u64 {
        self.tick_number
    }

    fn build_context(&self, resume_from: Option<&str>) -> (TickContext, Arc<InMemoryEventSink>) {
        let trace = Arc::new(InMemoryEventSink::new());
        let sink: Arc<dyn EventSink> = Arc::new(FanoutSink {
            trace: trace.clone(),
            external: self.config.event_sink.clone(),
        });
        let mut ctx = TickContext::new(self.blackboard.clone(), "engine")
            .with_event_sink(sink)
            .with_clock(self.config.clock.clone());
        ctx.cancellation = self.cancellation.clone();
        if let Some(registry) = &self.registry {
            ctx = ctx.with_registry(registry.clone());
        }
        if let Some(node_id) = resume_from {
            ctx = ctx.for_resume(node_id);
        }
        (ctx, trace)
    }

    /// Resume context for a caller-driven fast-forward tick (spec §4.6
    /// "Resume"): structural traversal replays down to `resume_from_node_id`
    /// without re-running side effects, then ticks normally from there.
    pub fn create_resume_context(&self, resume_from_node_id: impl Into<String>) -> TickContext {
        self.build_context(Some(&resume_from_node_id.into())).0
    }

    /// Ticks the tree exactly once. Refuses reentrant calls (a tick already
    /// in flight on this engine) and auto-resets the root first if the
    /// previous tick left it terminal, so callers don't have to call
    /// `reset()` themselves between runs.
    pub async fn tick(&mut self) -> Result<Snapshot, TickError> {
        if self.ticking.swap(true, Ordering::SeqCst) {
            tracing::warn!(root_id = self.root.id(), "rejected reentrant tick");
            return Err(TickError::operational("tick already in progress on this engine"));
        }
        let result = self.tick_inner().await;
        self.ticking.store(false, Ordering::SeqCst);
        result
    }

    async fn tick_inner(&mut self) -> Result<Snapshot, TickError> {
        if self.root.status().is_terminal() {
            self.root.reset();
        }

        let (mut ctx, trace_sink) = self.build_context(None);

        let tick_future = self.root.tick(&mut ctx);
        let outcome = match self.config.per_tick_timeout_ms {
            Some(timeout_ms) => {
                match tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), tick_future).await {
                    Ok(result) => result,
                    Err(_) => Err(TickError::Timeout(timeout_ms)),
                }
            }
            None => tick_future.await,
        };

        self.tick_number += 1;
        let trace = trace_sink.events();

        if outcome.is_err() {
            self.last_failed_node_id = trace
                .iter()
                .find(|e| e.kind == EventKind::Error)
                .map(|e| e.node_id.clone());
        }

        let flat = match self.blackboard.to_json() {
            serde_json::Value::Object(map) => map,
            _ => JsonMap::new(),
        };
        let status = outcome.clone().unwrap_or(Status::Failure);
        let snapshot = Snapshot::capture(
            ctx.now_ms(),
            self.tick_number,
            &self.blackboard,
            self.previous_blackboard.as_ref(),
            trace,
            self.root.id(),
            status,
        );
        self.previous_blackboard = Some(flat);
        outcome.map(|_| snapshot)
    }

    /// Drives ticks until the root reaches a terminal status, cancellation
    /// fires, or `max_ticks` is hit, sleeping between ticks per the
    /// configured back-off strategy. The first propagating error seen ends
    /// the run and is reported on the result; it does not panic the loop.
    pub async fn tick_while_running(&mut self) -> TickRunResult {
        tracing::debug!(root_id = self.root.id(), "starting run loop");
        let mut delay = TickDelay::new(self.config.delay_strategy);
        let mut logs = Vec::new();
        let mut failed_node_id = None;
        let mut failed_error = None;
        let mut last_status = Status::Idle;
        let mut ticks = 0u64;

        loop {
            if self.cancellation.is_cancelled() {
                last_status = Status::Failure;
                failed_error = Some(TickError::Cancelled.to_string());
                break;
            }
            if let Some(max) = self.config.max_ticks {
                if ticks >= max {
                    break;
                }
            }

            match self.tick().await {
                Ok(snapshot) => {
                    ticks += 1;
                    last_status = snapshot.root_status;
                    logs.extend(snapshot.execution_trace);
                    if last_status.is_terminal() {
                        break;
                    }
                }
                Err(err) => {
                    ticks += 1;
                    last_status = Status::Failure;
                    failed_node_id = Some(
                        self.last_failed_node_id
                            .clone()
                            .unwrap_or_else(|| self.root.id().to_string()),
                    );
                    failed_error = Some(err.to_string());
                    break;
                }
            }

            let delay_ms = delay.next_delay_ms(last_status.is_running());
            if delay_ms > 0 {
                if self.config.clock.sleep(delay_ms, &self.cancellation).await.is_err() {
                    last_status = Status::Failure;
                    failed_error = Some(TickError::Cancelled.to_string());
                    break;
                }
            }
        }

        tracing::debug!(root_id = self.root.id(), ?last_status, ticks, "run loop finished");
        TickRunResult {
            status: last_status,
            tick_count: ticks,
            logs,
            failed_node_id,
            failed_error,
        }
    }
}

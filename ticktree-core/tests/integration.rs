//! Exercises the full declarative-load -> registry -> engine pipeline and
//! the concrete multi-tick scenarios that pin down cursor and back-off
//! behavior across composites and decorators.

use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use ticktree_core::clock::Clock;
use ticktree_core::composite::{ForEach, Parallel, ParallelStrategy, Sequence, Selector};
use ticktree_core::decorator::{Delay, Retry, Timeout};
use ticktree_core::{
    register_builtins, Blackboard, BtNode, EngineConfig, LoaderOptions, NodeCore, Registry, Status,
    TickContext, TickEngine, TickError, Timestamp, TreeDef,
};

/// A leaf that records its own id into a shared log and returns a fixed
/// status, used to assert child tick order across composites.
struct LoggingAction {
    core: NodeCore,
    status: Status,
    log: Arc<Mutex<Vec<String>>>,
    no_children: Vec<Box<dyn BtNode>>,
}

impl LoggingAction {
    fn new(id: &'static str, status: Status, log: Arc<Mutex<Vec<String>>>) -> Self {
        LoggingAction {
            core: NodeCore::new(id, "LoggingAction"),
            status,
            log,
            no_children: Vec::new(),
        }
    }
}

#[async_trait]
impl BtNode for LoggingAction {
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
        self.log.lock().unwrap().push(self.core.id.clone());
        Ok(self.status)
    }
    fn clone_fresh(&self) -> Box<dyn BtNode> {
        Box::new(LoggingAction::new(
            Box::leak(self.core.id.clone().into_boxed_str()),
            self.status,
            self.log.clone(),
        ))
    }
}

fn ctx() -> TickContext {
    TickContext::new(Blackboard::new(), "integration")
}

#[tokio::test]
async fn sequence_prints_in_order_and_stops_at_first_failure() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut seq = Sequence::new("seq", "Sequence");
    seq.children_mut().push(Box::new(LoggingAction::new("a", Status::Success, log.clone())));
    seq.children_mut().push(Box::new(LoggingAction::new("b", Status::Failure, log.clone())));
    seq.children_mut().push(Box::new(LoggingAction::new("c", Status::Success, log.clone())));

    let mut c = ctx();
    assert_eq!(seq.tick(&mut c).await.unwrap(), Status::Failure);
    assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
}

#[tokio::test]
async fn selector_short_circuits_on_first_success() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut sel = Selector::new("sel");
    sel.children_mut().push(Box::new(LoggingAction::new("a", Status::Failure, log.clone())));
    sel.children_mut().push(Box::new(LoggingAction::new("b", Status::Success, log.clone())));
    sel.children_mut().push(Box::new(LoggingAction::new("c", Status::Success, log.clone())));

    let mut c = ctx();
    assert_eq!(sel.tick(&mut c).await.unwrap(), Status::Success);
    assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
}

/// A leaf that fails `fail_times` times then succeeds, for exercising Retry.
struct FlakyOnce {
    core: NodeCore,
    fail_times: usize,
    attempts: usize,
    no_children: Vec<Box<dyn BtNode>>,
}

#[async_trait]
impl BtNode for FlakyOnce {
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
            Ok(Status::Failure)
        } else {
            Ok(Status::Success)
        }
    }
    fn on_reset(&mut self) {
        self.attempts = 0;
    }
    fn clone_fresh(&self) -> Box<dyn BtNode> {
        Box::new(FlakyOnce {
            core: self.core.clone(),
            fail_times: self.fail_times,
            attempts: 0,
            no_children: Vec::new(),
        })
    }
}

#[tokio::test]
async fn retry_succeeds_on_exactly_the_third_tick() {
    let mut retry = Retry::new("r", 3, 0);
    retry.children_mut().push(Box::new(FlakyOnce {
        core: NodeCore::new("flaky", "FlakyOnce"),
        fail_times: 2,
        attempts: 0,
        no_children: Vec::new(),
    }));
    let mut c = ctx();
    assert_eq!(retry.tick(&mut c).await.unwrap(), Status::Running);
    assert_eq!(retry.tick(&mut c).await.unwrap(), Status::Running);
    assert_eq!(retry.tick(&mut c).await.unwrap(), Status::Success);
}

/// Advanced manually so elapsed-time assertions don't depend on wall clock
/// scheduling.
struct ManualClock(AtomicI64);

#[async_trait]
impl Clock for ManualClock {
    fn now_ms(&self) -> Timestamp {
        self.0.load(Ordering::SeqCst)
    }
    async fn sleep(&self, _ms: u64, _cancel: &ticktree_core::CancellationToken) -> Result<(), ()> {
        Ok(())
    }
}

#[tokio::test]
async fn timeout_wrapping_delay_fails_once_the_outer_budget_elapses() {
    let clock = Arc::new(ManualClock(AtomicI64::new(0)));
    let mut c = TickContext::new(Blackboard::new(), "integration").with_clock(clock.clone());

    let mut timeout = Timeout::new("timeout", 50);
    let mut delay = Delay::new("delay", 1000);
    delay.children_mut().push(Box::new(LoggingAction::new(
        "never_runs",
        Status::Success,
        Arc::new(Mutex::new(Vec::new())),
    )));
    timeout.children_mut().push(Box::new(delay));

    // Delay is still waiting out its own 1000ms window, so Timeout sees RUNNING.
    assert_eq!(timeout.tick(&mut c).await.unwrap(), Status::Running);
    // Outer timeout's 50ms elapses first.
    clock.0.store(51, Ordering::SeqCst);
    assert_eq!(timeout.tick(&mut c).await.unwrap(), Status::Failure);
}

#[tokio::test]
async fn foreach_processes_items_in_collection_order() {
    let log = Arc::new(Mutex::new(Vec::new()));

    struct RecordItem {
        core: NodeCore,
        log: Arc<Mutex<Vec<i64>>>,
        no_children: Vec<Box<dyn BtNode>>,
    }
    #[async_trait]
    impl BtNode for RecordItem {
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
        async fn execute_tick(&mut self, ctx: &mut TickContext) -> Result<Status, TickError> {
            self.log.lock().unwrap().push(ctx.blackboard.get("item").unwrap().as_i64().unwrap());
            Ok(Status::Success)
        }
        fn clone_fresh(&self) -> Box<dyn BtNode> {
            Box::new(RecordItem {
                core: self.core.clone(),
                log: self.log.clone(),
                no_children: Vec::new(),
            })
        }
    }

    let mut fe = ForEach::new("fe", "items", "item", None);
    fe.children_mut().push(Box::new(RecordItem {
        core: NodeCore::new("body", "RecordItem"),
        log: log.clone(),
        no_children: Vec::new(),
    }));
    let mut c = ctx();
    c.blackboard.set("items", json!([3, 1, 2]));
    assert_eq!(fe.tick(&mut c).await.unwrap(), Status::Success);
    assert_eq!(*log.lock().unwrap(), vec![3, 1, 2]);
}

#[tokio::test]
async fn parallel_strict_requires_every_child_success_any_settles_on_first() {
    let mut strict = Parallel::new("strict", ParallelStrategy::Strict, None, None);
    strict.children_mut().push(Box::new(LoggingAction::new("a", Status::Success, Arc::new(Mutex::new(Vec::new())))));
    strict.children_mut().push(Box::new(LoggingAction::new("b", Status::Failure, Arc::new(Mutex::new(Vec::new())))));
    let mut c = ctx();
    assert_eq!(strict.tick(&mut c).await.unwrap(), Status::Failure);

    let mut any = Parallel::new("any", ParallelStrategy::Any, None, None);
    any.children_mut().push(Box::new(LoggingAction::new("a", Status::Success, Arc::new(Mutex::new(Vec::new())))));
    any.children_mut().push(Box::new(LoggingAction::new("b", Status::Failure, Arc::new(Mutex::new(Vec::new())))));
    let mut c2 = ctx();
    assert_eq!(any.tick(&mut c2).await.unwrap(), Status::Success);
}

fn action_leaf(id: &str) -> TreeDef {
    TreeDef {
        node_type: "AlwaysSuccess".into(),
        id: Some(id.into()),
        name: None,
        props: None,
        children: None,
    }
}

fn register_always_success(registry: &Registry) {
    use ticktree_core::{NodeCategory, NodeMetadata, NodeSpec};
    registry
        .register(
            "AlwaysSuccess",
            Arc::new(|spec: NodeSpec| {
                Ok(Box::new(LoggingAction::new(
                    Box::leak(spec.id.into_boxed_str()),
                    Status::Success,
                    Arc::new(Mutex::new(Vec::new())),
                )) as Box<dyn BtNode>)
            }),
            NodeMetadata {
                category: NodeCategory::Action,
                description: "always succeeds".into(),
                ports: Vec::new(),
            },
        )
        .unwrap();
}

#[tokio::test]
async fn declarative_tree_builds_through_registry_and_runs_to_completion_via_engine() {
    // try_init: other tests in this binary may already have installed one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let registry = Registry::new();
    register_builtins(&registry).unwrap();
    register_always_success(&registry);

    let def = TreeDef {
        node_type: "Sequence".into(),
        id: Some("root".into()),
        name: None,
        props: None,
        children: Some(vec![
            TreeDef {
                node_type: "ForceSuccess".into(),
                id: Some("guard".into()),
                name: None,
                props: None,
                children: Some(vec![TreeDef {
                    node_type: "ForceFailure".into(),
                    id: Some("always_fails_inside".into()),
                    name: None,
                    props: None,
                    children: Some(vec![action_leaf("leaf")]),
                }]),
            },
            TreeDef {
                node_type: "Repeat".into(),
                id: Some("repeat".into()),
                name: None,
                props: Some({
                    let mut props = serde_json::Map::new();
                    props.insert("num_cycles".into(), json!(2));
                    props
                }),
                children: Some(vec![action_leaf("repeat_body")]),
            },
        ]),
    };

    let root = registry.create_tree(&def, &LoaderOptions::default()).unwrap();
    let mut engine = TickEngine::new(root, Blackboard::new(), EngineConfig::default()).with_registry(registry);
    let result = engine.tick_while_running().await;
    assert_eq!(result.status, Status::Success);
    assert!(result.failed_node_id.is_none());
}

#[tokio::test]
async fn registry_rejects_invalid_prop_config_before_the_tree_is_built() {
    let registry = Registry::new();
    register_builtins(&registry).unwrap();
    register_always_success(&registry);

    let def = TreeDef {
        node_type: "Timeout".into(),
        id: Some("t".into()),
        name: None,
        props: Some({
            let mut props = serde_json::Map::new();
            props.insert("timeout_ms".into(), json!(0));
            props
        }),
        children: Some(vec![action_leaf("child")]),
    };

    let err = match registry.create_tree(&def, &LoaderOptions::default()) {
        Ok(_) => panic!("expected create_tree to fail"),
        Err(e) => e,
    };
    assert!(err.to_string().contains("timeout_ms"));
}

#[tokio::test]
async fn resuming_past_a_node_skips_its_body_and_runs_everything_after_it() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut root = Sequence::new("seq", "Sequence");
    root.children_mut().push(Box::new(LoggingAction::new("a", Status::Success, log.clone())));
    root.children_mut().push(Box::new(LoggingAction::new("b", Status::Success, log.clone())));
    root.children_mut().push(Box::new(LoggingAction::new("c", Status::Success, log.clone())));

    let mut engine = TickEngine::new(Box::new(root), Blackboard::new(), EngineConfig::default());
    let mut ctx = engine.create_resume_context("b");
    let status = engine.root_mut().tick(&mut ctx).await.unwrap();

    assert_eq!(status, Status::Success);
    // "a" is fast-forwarded past (skipped, no side effect); "b" is the
    // resume target and "c" comes after it, so both actually execute.
    assert_eq!(*log.lock().unwrap(), vec!["b", "c"]);
}

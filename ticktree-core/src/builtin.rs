//! Registers every built-in composite/decorator type with a [`Registry`],
//! parsing each type's `props` into its typed constructor arguments and
//! validating config shape at construction time (spec §4.4, §4.8 stage 3).
//!
//! Action leaves are deliberately absent here: they are host/domain
//! specific and are registered by the embedding application, the same way
//! the teacher leaves workflow step handlers to `authoring/registry.rs`
//! callers rather than baking them into the crate.

use crate::composite::{Conditional, ForEach, Parallel, ParallelStrategy, ReactiveSequence, Recovery, Selector, Sequence, SubTree, While};
use crate::decorator::{Delay, Force, ForcedStatus, Invert, KeepRunningUntilFailure, Precondition, Repeat, Retry, RunOnce, SoftAssert, Timeout};
use crate::node::BtNode;
use crate::registry::{NodeCategory, NodeMetadata, NodeSpec, Registry};
use anyhow::{anyhow, Result};
use serde_json::{Map as JsonMap, Value as Json};
use std::sync::Arc;

fn require_string(props: &JsonMap<String, Json>, key: &str) -> Result<String> {
    props
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("missing required string prop `{key}`"))
}

fn optional_string(props: &JsonMap<String, Json>, key: &str) -> Option<String> {
    props.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn require_u64(props: &JsonMap<String, Json>, key: &str) -> Result<u64> {
    props
        .get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| anyhow!("missing required integer prop `{key}`"))
}

fn optional_u64(props: &JsonMap<String, Json>, key: &str) -> Option<u64> {
    props.get(key).and_then(|v| v.as_u64())
}

fn bool_array(props: &JsonMap<String, Json>, key: &str) -> Result<Vec<bool>> {
    props
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("missing required array prop `{key}`"))?
        .iter()
        .map(|v| v.as_bool().ok_or_else(|| anyhow!("prop `{key}` must be an array of booleans")))
        .collect()
}

fn register(
    registry: &Registry,
    type_name: &str,
    category: NodeCategory,
    description: &str,
    constructor: impl Fn(NodeSpec) -> Result<Box<dyn BtNode>> + Send + Sync + 'static,
) -> Result<()> {
    registry.register(
        type_name,
        Arc::new(constructor),
        NodeMetadata {
            category,
            description: description.to_string(),
            ports: Vec::new(),
        },
    )
}

/// Registers every built-in composite and decorator type. Safe to call once
/// per `Registry`; a second call on the same registry returns the first
/// "already registered" error.
pub fn register_builtins(registry: &Registry) -> Result<()> {
    use NodeCategory::{Composite, Decorator};

    register(registry, "Sequence", Composite, "AND with cursor memory", |spec| {
        Ok(Box::new(Sequence::new(spec.id, "Sequence")) as Box<dyn BtNode>)
    })?;
    register(registry, "MemorySequence", Composite, "AND with cursor memory (alias)", |spec| {
        Ok(Box::new(Sequence::new(spec.id, "MemorySequence")) as Box<dyn BtNode>)
    })?;
    register(registry, "ReactiveSequence", Composite, "AND, re-evaluated every tick", |spec| {
        Ok(Box::new(ReactiveSequence::new(spec.id)) as Box<dyn BtNode>)
    })?;
    register(registry, "Selector", Composite, "OR with cursor memory", |spec| {
        Ok(Box::new(Selector::new(spec.id)) as Box<dyn BtNode>)
    })?;
    register(registry, "Conditional", Composite, "[condition, then, else?]", |spec| {
        Ok(Box::new(Conditional::new(spec.id)) as Box<dyn BtNode>)
    })?;
    register(registry, "Recovery", Composite, "[primary, fallback]", |spec| {
        Ok(Box::new(Recovery::new(spec.id)) as Box<dyn BtNode>)
    })?;
    register(registry, "SubTree", Composite, "references a named registered tree", |spec| {
        let tree_id = require_string(&spec.props, "tree_id")?;
        Ok(Box::new(SubTree::new(spec.id, tree_id)) as Box<dyn BtNode>)
    })?;
    register(registry, "While", Composite, "[condition, body] loop", |spec| {
        let max_iterations = optional_u64(&spec.props, "max_iterations");
        Ok(Box::new(While::new(spec.id, max_iterations)) as Box<dyn BtNode>)
    })?;
    register(registry, "ForEach", Composite, "iterate a blackboard array", |spec| {
        let collection_key = require_string(&spec.props, "collection_key")?;
        let item_key = require_string(&spec.props, "item_key")?;
        let index_key = optional_string(&spec.props, "index_key");
        Ok(Box::new(ForEach::new(spec.id, collection_key, item_key, index_key)) as Box<dyn BtNode>)
    })?;
    register(registry, "Parallel", Composite, "cooperative fan-out with thresholds", |spec| {
        let strategy = match optional_string(&spec.props, "strategy").as_deref() {
            None | Some("strict") => ParallelStrategy::Strict,
            Some("any") => ParallelStrategy::Any,
            Some(other) => return Err(anyhow!("unknown Parallel strategy: {other}")),
        };
        let success_threshold = optional_u64(&spec.props, "success_threshold").map(|n| n as usize);
        let failure_threshold = optional_u64(&spec.props, "failure_threshold").map(|n| n as usize);
        Ok(Box::new(Parallel::new(spec.id, strategy, success_threshold, failure_threshold)) as Box<dyn BtNode>)
    })?;

    register(registry, "Invert", Decorator, "SUCCESS<->FAILURE", |spec| {
        Ok(Box::new(Invert::new(spec.id)) as Box<dyn BtNode>)
    })?;
    register(registry, "RunOnce", Decorator, "ticks the child at most once per cycle", |spec| {
        Ok(Box::new(RunOnce::new(spec.id)) as Box<dyn BtNode>)
    })?;
    register(registry, "KeepRunningUntilFailure", Decorator, "loops child on SUCCESS", |spec| {
        Ok(Box::new(KeepRunningUntilFailure::new(spec.id)) as Box<dyn BtNode>)
    })?;
    register(registry, "SoftAssert", Decorator, "downgrades FAILURE to SUCCESS, records it", |spec| {
        Ok(Box::new(SoftAssert::new(spec.id)) as Box<dyn BtNode>)
    })?;
    register(registry, "ForceSuccess", Decorator, "always commits SUCCESS once terminal", |spec| {
        Ok(Box::new(Force::new(spec.id, ForcedStatus::Success)) as Box<dyn BtNode>)
    })?;
    register(registry, "ForceFailure", Decorator, "always commits FAILURE once terminal", |spec| {
        Ok(Box::new(Force::new(spec.id, ForcedStatus::Failure)) as Box<dyn BtNode>)
    })?;
    register(registry, "Repeat", Decorator, "runs the child num_cycles times", |spec| {
        let num_cycles = require_u64(&spec.props, "num_cycles")? as u32;
        if num_cycles == 0 {
            return Err(anyhow!("Repeat.num_cycles must be > 0"));
        }
        Ok(Box::new(Repeat::new(spec.id, num_cycles)) as Box<dyn BtNode>)
    })?;
    register(registry, "Retry", Decorator, "retries the child on FAILURE up to max_attempts", |spec| {
        let max_attempts = require_u64(&spec.props, "max_attempts")? as u32;
        if max_attempts == 0 {
            return Err(anyhow!("Retry.max_attempts must be > 0"));
        }
        let retry_delay_ms = optional_u64(&spec.props, "retry_delay_ms").unwrap_or(0);
        Ok(Box::new(Retry::new(spec.id, max_attempts, retry_delay_ms)) as Box<dyn BtNode>)
    })?;
    register(registry, "Timeout", Decorator, "fails the child if still RUNNING past timeout_ms", |spec| {
        let timeout_ms = require_u64(&spec.props, "timeout_ms")?;
        if timeout_ms == 0 {
            return Err(anyhow!("Timeout.timeout_ms must be > 0"));
        }
        Ok(Box::new(Timeout::new(spec.id, timeout_ms)) as Box<dyn BtNode>)
    })?;
    register(registry, "Delay", Decorator, "holds the child for delay_ms before first tick", |spec| {
        let delay_ms = require_u64(&spec.props, "delay_ms")?;
        Ok(Box::new(Delay::new(spec.id, delay_ms)) as Box<dyn BtNode>)
    })?;
    register(registry, "Precondition", Decorator, "gates a main child on a list of conditions", |spec| {
        let required = bool_array(&spec.props, "required")?;
        let has_resolver = bool_array(&spec.props, "has_resolver")?;
        Ok(Box::new(
            Precondition::new_for_loading(spec.id, required, has_resolver).map_err(|e| anyhow!(e.to_string()))?,
        ) as Box<dyn BtNode>)
    })?;

    Ok(())
}

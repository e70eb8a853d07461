//! Typed event sink. Subscribers register per-kind or catch-all callbacks;
//! dispatch is synchronous and error-isolated so a misbehaving subscriber
//! never corrupts node execution.

use crate::clock::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::sync::RwLock;

/// The kinds of events a node or the engine can emit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    TickStart,
    TickEnd,
    StatusChange,
    Error,
    Halt,
    Reset,
    Log,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub node_id: String,
    pub node_name: String,
    pub node_type: String,
    pub timestamp: Timestamp,
    pub data: Json,
}

/// Receiver of emitted events. Implementations must not panic; dispatch
/// treats a subscriber call as best-effort.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

type Subscriber = Box<dyn Fn(&Event) + Send + Sync>;

/// An `EventSink` that fans out to per-kind and catch-all closures.
///
/// Mirrors the teacher's pattern of a single synchronous dispatch point
/// (`append_event` in `store.rs`) fanning out to listeners, except here the
/// fan-out happens in-process rather than via an append-only log.
#[derive(Default)]
pub struct CallbackEventSink {
    per_kind: RwLock<Vec<(EventKind, Subscriber)>>,
    catch_all: RwLock<Vec<Subscriber>>,
}

impl CallbackEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: EventKind, callback: impl Fn(&Event) + Send + Sync + 'static) {
        self.per_kind
            .write()
            .expect("event sink lock poisoned")
            .push((kind, Box::new(callback)));
    }

    pub fn subscribe_all(&self, callback: impl Fn(&Event) + Send + Sync + 'static) {
        self.catch_all
            .write()
            .expect("event sink lock poisoned")
            .push(Box::new(callback));
    }
}

impl EventSink for CallbackEventSink {
    fn emit(&self, event: Event) {
        // Dispatch is best-effort: a panicking subscriber is caught and
        // logged so it can never corrupt node execution.
        if let Ok(subs) = self.per_kind.read() {
            for (kind, callback) in subs.iter() {
                if *kind == event.kind {
                    if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(
                        || callback(&event),
                    )) {
                        tracing::warn!(?panic, "event subscriber panicked");
                    }
                }
            }
        }
        if let Ok(subs) = self.catch_all.read() {
            for callback in subs.iter() {
                if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(
                    || callback(&event),
                )) {
                    tracing::warn!(?panic, "event subscriber panicked");
                }
            }
        }
    }
}

/// An `EventSink` that simply records everything — used by the engine to
/// assemble execution traces and by tests.
#[derive(Default)]
pub struct InMemoryEventSink {
    events: RwLock<Vec<Event>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.read().expect("event sink lock poisoned").clone()
    }

    pub fn clear(&self) {
        self.events.write().expect("event sink lock poisoned").clear();
    }
}

impl EventSink for InMemoryEventSink {
    fn emit(&self, event: Event) {
        self.events.write().expect("event sink lock poisoned").push(event);
    }
}

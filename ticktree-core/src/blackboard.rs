//! Scoped key-value store passed through the tick context.
//!
//! Lookups walk from the local scope up through parent scopes; writes
//! always land in the local scope. Values are `serde_json::Value`, the
//! same dynamic-value shape the teacher uses for canonical JSON payloads
//! and node config props (`authoring/dto.rs`).

use serde_json::{Map, Value as Json};
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct Scope {
    values: Map<String, Json>,
    parent: Option<Blackboard>,
}

/// A scoped, cheaply-clonable key-value map.
///
/// `Blackboard::clone()` is a shallow `Arc` clone sharing the same scope;
/// use [`Blackboard::child_scope`] to create a new local scope chained to
/// this one, and [`Blackboard::snapshot`] to produce an independent deep
/// copy of the locally-visible keys.
#[derive(Clone)]
pub struct Blackboard {
    inner: Arc<RwLock<Scope>>,
}

impl Default for Blackboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Blackboard {
    pub fn new() -> Self {
        Blackboard {
            inner: Arc::new(RwLock::new(Scope::default())),
        }
    }

    /// Create a new scope chained to `self` as its parent.
    pub fn child_scope(&self) -> Blackboard {
        Blackboard {
            inner: Arc::new(RwLock::new(Scope {
                values: Map::new(),
                parent: Some(self.clone()),
            })),
        }
    }

    /// Walk from the local scope up through parents.
    pub fn get(&self, key: &str) -> Option<Json> {
        let scope = self.inner.read().expect("blackboard lock poisoned");
        if let Some(v) = scope.values.get(key) {
            return Some(v.clone());
        }
        match &scope.parent {
            Some(parent) => parent.get(key),
            None => None,
        }
    }

    /// Writes always land in the local scope.
    pub fn set(&self, key: impl Into<String>, value: Json) {
        let mut scope = self.inner.write().expect("blackboard lock poisoned");
        scope.values.insert(key.into(), value);
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Deletes from the local scope only; does not remove a shadowed parent
    /// entry (so `has` may still return true after `delete`, from a parent).
    pub fn delete(&self, key: &str) -> Option<Json> {
        let mut scope = self.inner.write().expect("blackboard lock poisoned");
        scope.values.remove(key)
    }

    /// Deep copy of everything visible from this scope (parent chain
    /// flattened, local keys shadow parent keys), as an independent
    /// unscoped blackboard.
    pub fn snapshot(&self) -> Blackboard {
        let flat = self.flatten();
        let snap = Blackboard::new();
        {
            let mut scope = snap.inner.write().expect("blackboard lock poisoned");
            scope.values = flat;
        }
        snap
    }

    fn flatten(&self) -> Map<String, Json> {
        let scope = self.inner.read().expect("blackboard lock poisoned");
        let mut merged = match &scope.parent {
            Some(parent) => parent.flatten(),
            None => Map::new(),
        };
        for (k, v) in scope.values.iter() {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }

    pub fn to_json(&self) -> Json {
        Json::Object(self.flatten())
    }

    pub fn from_json(value: Json) -> Blackboard {
        let bb = Blackboard::new();
        if let Json::Object(map) = value {
            let mut scope = bb.inner.write().expect("blackboard lock poisoned");
            scope.values = map;
        }
        bb
    }
}

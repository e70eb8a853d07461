//! Point-in-time capture of a tick's outcome (spec §4.6): the blackboard
//! state, a diff against the previous snapshot, and the events emitted
//! during the tick, keyed to the root's status so a caller can replay or
//! audit a run without re-driving the tree.

use crate::blackboard::Blackboard;
use crate::clock::Timestamp;
use crate::events::Event;
use crate::status::Status;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// One key's before/after values in a blackboard diff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlackboardChange {
    pub key: String,
    pub before: Option<Json>,
    pub after: Option<Json>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BlackboardDiff {
    pub changes: Vec<BlackboardChange>,
}

impl BlackboardDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Computes the key-level diff between two flattened blackboard views.
    pub fn compute(before: &Map<String, Json>, after: &Map<String, Json>) -> Self {
        let mut changes = Vec::new();
        for (key, after_value) in after.iter() {
            let before_value = before.get(key);
            if before_value != Some(after_value) {
                changes.push(BlackboardChange {
                    key: key.clone(),
                    before: before_value.cloned(),
                    after: Some(after_value.clone()),
                });
            }
        }
        for key in before.keys() {
            if !after.contains_key(key) {
                changes.push(BlackboardChange {
                    key: key.clone(),
                    before: before.get(key).cloned(),
                    after: None,
                });
            }
        }
        BlackboardDiff { changes }
    }
}

/// A full capture of one engine tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: Timestamp,
    pub tick_number: u64,
    pub blackboard: Json,
    pub diff: BlackboardDiff,
    pub execution_trace: Vec<Event>,
    pub root_node_id: String,
    pub root_status: Status,
}

impl Snapshot {
    pub fn capture(
        timestamp: Timestamp,
        tick_number: u64,
        blackboard: &Blackboard,
        previous_blackboard: Option<&Map<String, Json>>,
        execution_trace: Vec<Event>,
        root_node_id: impl Into<String>,
        root_status: Status,
    ) -> Self {
        let flat = match blackboard.to_json() {
            Json::Object(map) => map,
            _ => Map::new(),
        };
        let diff = match previous_blackboard {
            Some(prev) => BlackboardDiff::compute(prev, &flat),
            None => BlackboardDiff::compute(&Map::new(), &flat),
        };
        Snapshot {
            timestamp,
            tick_number,
            blackboard: Json::Object(flat),
            diff,
            execution_trace,
            root_node_id: root_node_id.into(),
            root_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn diff_reports_added_changed_and_removed_keys() {
        let mut before = Map::new();
        before.insert("a".to_string(), json!(1));
        before.insert("b".to_string(), json!("stays"));
        let mut after = Map::new();
        after.insert("a".to_string(), json!(2));
        after.insert("b".to_string(), json!("stays"));
        after.insert("c".to_string(), json!(true));

        let diff = BlackboardDiff::compute(&before, &after);
        assert_eq!(diff.changes.len(), 2);
        assert!(diff.changes.iter().any(|c| c.key == "a" && c.before == Some(json!(1)) && c.after == Some(json!(2))));
        assert!(diff.changes.iter().any(|c| c.key == "c" && c.before.is_none() && c.after == Some(json!(true))));
    }

    #[test]
    fn diff_of_identical_maps_is_empty() {
        let mut m = Map::new();
        m.insert("x".to_string(), json!(1));
        let diff = BlackboardDiff::compute(&m, &m);
        assert!(diff.is_empty());
    }

    #[test]
    fn capture_builds_snapshot_from_blackboard() {
        let bb = Blackboard::new();
        bb.set("x", json!(1));
        let snap = Snapshot::capture(100, 1, &bb, None, Vec::new(), "root", Status::Running);
        assert_eq!(snap.blackboard, json!({"x": 1}));
        assert_eq!(snap.tick_number, 1);
        assert_eq!(snap.root_status, Status::Running);
        assert!(!snap.diff.is_empty());
    }
}

//! The three-valued (plus idle) tick result.

use serde::{Deserialize, Serialize};

/// Result of ticking a node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Never ticked, or reset since the last tick.
    Idle,
    /// In progress; a later tick will resume it.
    Running,
    Success,
    Failure,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Success | Status::Failure)
    }

    pub fn is_running(self) -> bool {
        matches!(self, Status::Running)
    }

    /// SUCCESS <-> FAILURE, RUNNING/IDLE unchanged. Used by `Invert`.
    pub fn inverted(self) -> Status {
        match self {
            Status::Success => Status::Failure,
            Status::Failure => Status::Success,
            other => other,
        }
    }
}

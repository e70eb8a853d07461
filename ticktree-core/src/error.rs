//! Error taxonomy for the tick envelope.
//!
//! Every error a node can raise is one of four kinds. The kind decides
//! whether the base tick envelope re-surfaces the error to the caller or
//! swallows it into a `FAILURE` status — see [`TickError::is_propagating`].

use thiserror::Error;

/// Errors raised while ticking a node.
#[derive(Debug, Clone, Error)]
pub enum TickError {
    /// Authoring fault: missing required child, invalid config value,
    /// unresolved SubTree reference, unknown node type. Always propagates.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Raised by a cancellation check or an aborted `sleep`. Always propagates.
    #[error("operation cancelled")]
    Cancelled,

    /// Any other action-level failure (I/O, assertion, blackboard type
    /// mismatch). Converts to a FAILURE status and never propagates.
    #[error("operational failure: {0}")]
    Operational(String),

    /// Engine-level per-tick timeout. Propagates to the engine's caller.
    #[error("tick timed out after {0}ms")]
    Timeout(u64),
}

impl TickError {
    /// Whether the base tick envelope must re-surface this error to the
    /// caller instead of converting it into a FAILURE status.
    pub fn is_propagating(&self) -> bool {
        matches!(
            self,
            TickError::Configuration(_) | TickError::Cancelled | TickError::Timeout(_)
        )
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        TickError::Configuration(msg.into())
    }

    pub fn operational(msg: impl Into<String>) -> Self {
        TickError::Operational(msg.into())
    }
}

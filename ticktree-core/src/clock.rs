//! Pluggable monotonic clock and async sleep, so a durable host can supply
//! deterministic versions (spec §1: workflow-orchestrator integration is
//! out of scope, but the seam it plugs into is not).

use crate::cancel::CancellationToken;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Epoch milliseconds.
pub type Timestamp = i64;

fn system_now_ms() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Timestamp
}

/// Source of monotonic time and asynchronous, cancellation-aware sleep.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Timestamp;

    /// Sleep for `ms` milliseconds, racing `cancel`. Returns `Err` if the
    /// sleep was aborted by cancellation before it elapsed.
    async fn sleep(&self, ms: u64, cancel: &CancellationToken) -> Result<(), ()>;
}

/// Default `Clock` backed by the system wall clock and `tokio::time::sleep`.
#[derive(Clone, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now_ms(&self) -> Timestamp {
        system_now_ms()
    }

    async fn sleep(&self, ms: u64, cancel: &CancellationToken) -> Result<(), ()> {
        if ms == 0 {
            tokio::task::yield_now().await;
            return if cancel.is_cancelled() { Err(()) } else { Ok(()) };
        }
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_millis(ms)) => {
                if cancel.is_cancelled() { Err(()) } else { Ok(()) }
            }
            _ = cancel.cancelled() => Err(()),
        }
    }
}

pub fn default_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

//! Cooperative cancellation. `is_cancelled` is a non-blocking test; `cancelled()`
//! is a race-friendly "await cancel" primitive for use inside `Clock::sleep`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Resolves once `cancel()` has been called. Safe to await alongside
    /// other futures in a `tokio::select!`.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.inner.notify.notified().await;
    }

    /// Non-blocking check; returns `TickError::Cancelled` if cancelled.
    pub fn check(&self) -> Result<(), crate::error::TickError> {
        if self.is_cancelled() {
            Err(crate::error::TickError::Cancelled)
        } else {
            Ok(())
        }
    }
}

//! Decorator nodes: exactly one child, modifying its result (spec §4.3).

mod force;
mod invert;
mod keep_running;
mod precondition;
mod repeat;
mod retry;
mod run_once;
mod soft_assert;
mod timeout;

pub use force::{Force, ForcedStatus};
pub use invert::Invert;
pub use keep_running::KeepRunningUntilFailure;
pub use precondition::{Precondition, PreconditionEntry};
pub use repeat::Repeat;
pub use retry::Retry;
pub use run_once::RunOnce;
pub use soft_assert::{FailureRecord, SoftAssert};
pub use timeout::{Delay, Timeout};

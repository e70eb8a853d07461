//! Composite nodes: control-flow combinators with more than one child
//! (spec §4.2). Each composite owns its children directly and implements
//! [`crate::node::BtNode`]; none of them catch a propagating `TickError`
//! from a child — they consume only the committed `Status`.

mod conditional;
mod foreach;
mod parallel;
mod recovery;
mod selector;
mod sequence;
mod subtree;
mod while_loop;

pub use conditional::Conditional;
pub use foreach::ForEach;
pub use parallel::{Parallel, ParallelStrategy};
pub use recovery::Recovery;
pub use selector::Selector;
pub use sequence::{ReactiveSequence, Sequence};
pub use subtree::SubTree;
pub use while_loop::While;

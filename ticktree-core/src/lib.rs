//! Behavior-tree execution engine: node model and tick protocol, composite
//! and decorator algorithms, a blackboard, a declarative tree loader and
//! node registry, and a tick driver with cancellation, back-off, and
//! snapshotting.

pub mod backoff;
pub mod blackboard;
pub mod builtin;
pub mod cancel;
pub mod clock;
pub mod composite;
pub mod context;
pub mod decorator;
pub mod engine;
pub mod error;
pub mod events;
pub mod loader;
pub mod node;
pub mod registry;
pub mod snapshot;
pub mod status;
pub mod tree;

pub use blackboard::Blackboard;
pub use builtin::register_builtins;
pub use cancel::CancellationToken;
pub use clock::{default_clock, Clock, SystemClock, Timestamp};
pub use context::{RunningOpsMap, TickContext};
pub use engine::{EngineConfig, TickEngine, TickRunResult};
pub use error::TickError;
pub use events::{Event, EventSink, InMemoryEventSink};
pub use loader::{LoaderError, LoaderErrorKind, LoaderOptions, TreeDef};
pub use node::{BtNode, NodeCore};
pub use registry::{NodeCategory, NodeMetadata, NodeSpec, Registry};
pub use snapshot::{BlackboardChange, BlackboardDiff, Snapshot};
pub use status::Status;
pub use tree::{parse_path_with_tree_id, NodePath, Tree};

//! Arbor Search: a best-first search engine with pluggable collaborators.
//!
//! This crate depends only on `arbor_kernel`. It does NOT depend on
//! `arbor_harness`.
//!
//! # Crate dependency graph
//!
//! ```text
//! arbor_kernel  ←  arbor_search  ←  arbor_harness
//! (contracts)      (engine)         (worlds, runner)
//! ```
//!
//! # Key types
//!
//! - [`BestFirst`]: the engine; solutions are pulled one at a time
//! - [`Registry`]: OPEN / CLOSED / SUSPENDED bookkeeping and enforced exploration
//! - [`GuardedEvaluator`]: panic capture, per-call timeout and fallback
//! - [`SearchPolicy`]: budgets, timeouts, workers and seed
//! - [`SearchObserver`] and [`TraceRecorder`]: lifecycle events and trace digests
//! - [`strategy`]: A*, LDS, random search and R*

#![forbid(unsafe_code)]

pub mod error;
pub mod evaluator;
pub mod node;
pub mod observer;
pub mod policy;
pub mod registry;
pub mod search;
pub mod solution;
pub mod stats;
pub mod strategy;
pub mod trace;

pub use error::SearchError;
pub use evaluator::{Guarded, GuardedEvaluator, SharedEvaluator};
pub use node::{FrontierKey, NodeAnnotations, NodeId, NodeStatus, SearchNode};
pub use observer::{NoOpObserver, SearchObserver};
pub use policy::SearchPolicy;
pub use registry::{Registry, Repartition};
pub use search::{BestFirst, CancelHandle, EngineState, Expansion, StepOutcome};
pub use solution::Solution;
pub use stats::SearchStats;
pub use trace::{TraceEvent, TraceRecorder};

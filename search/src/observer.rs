//! Lifecycle observers.
//!
//! Observers are handed to the engine at construction; there is no global
//! event bus. Every hook has a no-op default, so an observer implements only
//! what it needs, and the engine works the same with zero observers.
//!
//! Hooks run on the thread driving the engine, some while the registry lock
//! is held. Keep them short.

use std::fmt;

use crate::node::{NodeId, SearchNode};
use crate::registry::Repartition;
use crate::search::EngineState;
use crate::solution::Solution;
use crate::stats::SearchStats;

pub trait SearchObserver<S, L, V>: Send + Sync {
    fn name(&self) -> &str;

    fn on_search_started(&self, _roots: usize) {}

    /// A node entered the registry (OPEN, SUSPENDED or PRUNED).
    fn on_node_created(&self, _node: &SearchNode<S, L, V>) {}

    /// A node was expanded and moved to CLOSED.
    fn on_node_expanded(&self, _node: NodeId, _children: &[NodeId]) {}

    fn on_solution_found(&self, _solution: &Solution<S, L, V>) {}

    fn on_repartition(&self, _repartition: &Repartition) {}

    /// The engine entered a terminal state.
    fn on_search_terminated(&self, _state: EngineState, _stats: &SearchStats) {}
}

impl<S, L, V> fmt::Debug for dyn SearchObserver<S, L, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SearchObserver({})", self.name())
    }
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl<S, L, V> SearchObserver<S, L, V> for NoOpObserver {
    fn name(&self) -> &str {
        "no-op"
    }
}

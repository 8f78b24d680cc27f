//! Shared setup for the arbor benchmark suites.

#![forbid(unsafe_code)]

use std::time::Duration;

use arbor_harness::worlds::n_queens::{Board, NQueens};
use arbor_kernel::{EvaluationOutcome, NodeKind};
use arbor_search::{BestFirst, NodeId, Registry, SearchPolicy};

/// N-Queens engine scored by attacked cells.
///
/// # Panics
///
/// Panics if `policy` is invalid. Benchmark setup failures are fatal.
#[must_use]
pub fn queens_engine(n: usize, policy: SearchPolicy) -> BestFirst<NQueens, usize> {
    let world = NQueens::new(n);
    BestFirst::new(world, world.evaluator(), policy).expect("valid policy")
}

/// A registry holding a complete tree of the given `fanout` and `depth`,
/// with only the leaves left on OPEN. Values cycle so keys collide.
///
/// # Panics
///
/// Panics if the registry rejects an insertion.
#[must_use]
pub fn leafy_registry(fanout: usize, depth: usize) -> (Registry<Board, usize, u64>, Vec<NodeId>) {
    let mut registry = Registry::new();
    let root = registry
        .insert(None, Vec::new(), NodeKind::Or, EvaluationOutcome::Value(0), Duration::ZERO)
        .expect("root");
    let mut level = vec![root];
    let mut interior = Vec::new();
    for _ in 0..depth {
        let mut next = Vec::with_capacity(level.len() * fanout);
        for &parent in &level {
            registry.take(parent).expect("parent is open");
            let board = registry.node(parent).expect("parent exists").state().clone();
            for col in 0..fanout {
                let mut child = board.clone();
                child.push(col);
                let value = u64::try_from(next.len() % 7).unwrap_or(0);
                let id = registry
                    .insert(Some((parent, col)), child, NodeKind::Or, EvaluationOutcome::Value(value), Duration::ZERO)
                    .expect("child");
                next.push(id);
            }
            registry.close(parent).expect("parent in flight");
            interior.push(parent);
        }
        level = next;
    }
    (registry, interior)
}

//! Idempotency lock tests.
//!
//! Proves:
//! 1. Expanding the same state twice gives equal successor multisets
//! 2. Breadth-first traversal sees the same shape with successor lists reversed
//! 3. The engine, run breadth-first, creates the same labeled tree either way

use std::collections::BTreeMap;

use arbor_harness::worlds::explicit_tree::ExplicitTree;
use arbor_harness::worlds::grid::Grid;
use arbor_harness::worlds::n_queens::NQueens;
use arbor_harness::worlds::needle::Needle;
use arbor_kernel::GraphGenerator;
use arbor_search::{BestFirst, EngineState, SearchPolicy};
use lock_tests::engine_helpers::{bfs_signature, by_depth, successor_multiset};

fn wide_tree() -> ExplicitTree {
    ExplicitTree::abcde()
        .edge("C", "cf", "F")
        .edge("C", "cg", "G")
        .edge("C", "ch", "H")
        .edge("F", "fi", "I")
        .edge("E", "ej", "J")
}

// ---------------------------------------------------------------------------
// 1. Repeated expansion
// ---------------------------------------------------------------------------

#[test]
fn repeated_expansion_is_stable() {
    let queens = NQueens::new(6);
    for board in [vec![], vec![1], vec![1, 3], vec![0, 2, 4]] {
        assert_eq!(
            successor_multiset(&queens, &board),
            successor_multiset(&queens, &board),
            "board {board:?}"
        );
    }

    let grid = Grid::open(5);
    assert_eq!(successor_multiset(&grid, &(2, 2)), successor_multiset(&grid, &(2, 2)));

    let needle = Needle::new(10, 4, 3).lazy();
    assert_eq!(successor_multiset(&needle, &(0, 0)), successor_multiset(&needle, &(0, 0)));
}

#[test]
fn lazy_and_materialized_expansions_agree() {
    for board in [vec![], vec![2], vec![0, 3]] {
        assert_eq!(
            successor_multiset(&NQueens::new(6), &board),
            successor_multiset(&NQueens::lazy(6), &board)
        );
    }
}

// ---------------------------------------------------------------------------
// 2. Reversed consumption, reference traversal
// ---------------------------------------------------------------------------

#[test]
fn bfs_shape_ignores_successor_order() {
    let normal = bfs_signature(&wide_tree(), usize::MAX);
    let reversed = bfs_signature(&wide_tree().reversed(), usize::MAX);
    assert_eq!(normal, reversed);
    assert_eq!(normal.nodes, 10);
    assert_eq!(normal.edges, 9);
}

// ---------------------------------------------------------------------------
// 3. Reversed consumption, through the engine
// ---------------------------------------------------------------------------

fn engine_tree<G: GraphGenerator>(generator: G) -> (usize, BTreeMap<Vec<String>, usize>) {
    let mut engine = BestFirst::new(generator, by_depth::<G::State, G::Label>(), SearchPolicy::default()).unwrap();
    assert!(engine.next_solution().unwrap().is_none());
    assert_eq!(engine.state(), EngineState::Exhausted);
    engine.with_registry(|registry| {
        let mut label_paths = BTreeMap::new();
        for node in registry.nodes() {
            let path = registry.path(node.id()).unwrap();
            let labels: Vec<String> = path.labels().map(|l| format!("{l:?}")).collect();
            *label_paths.entry(labels).or_default() += 1;
        }
        (registry.len(), label_paths)
    })
}

#[test]
fn engine_builds_isomorphic_tree_either_way() {
    let normal = engine_tree(wide_tree());
    let reversed = engine_tree(wide_tree().reversed());
    let lazy_reversed = engine_tree(wide_tree().lazy().reversed());
    assert_eq!(normal, reversed);
    assert_eq!(normal, lazy_reversed);
    assert_eq!(normal.0, 10);
    assert_eq!(normal.1, bfs_signature(&wide_tree(), usize::MAX).label_paths);
}

//! End-to-end scenarios over the harness worlds.
//!
//! A. N-Queens enumerates every board, in every expansion mode
//! B. A temporary root suspends everything outside its subtree
//! C. Random search reaches a lone goal behind one of many siblings

use std::collections::BTreeSet;

use arbor_harness::run_to_completion;
use arbor_harness::worlds::explicit_tree::ExplicitTree;
use arbor_harness::worlds::n_queens::{Board, NQueens};
use arbor_harness::worlds::needle::Needle;
use arbor_kernel::GraphGenerator;
use arbor_search::strategy::random::random_search;
use arbor_search::strategy::strip_tags;
use arbor_search::{BestFirst, EngineState, NodeId, NodeStatus, SearchNode, SearchPolicy, StepOutcome};
use lock_tests::engine_helpers::by_depth;

fn boards(world: NQueens, policy: SearchPolicy) -> BTreeSet<Board> {
    let engine = BestFirst::new(world, world.evaluator(), policy).unwrap();
    let report = run_to_completion(engine, None).unwrap();
    assert_eq!(report.state, EngineState::Exhausted);
    assert_eq!(usize::try_from(report.stats.solutions).unwrap(), report.solutions.len());
    let found: BTreeSet<Board> = report.solutions.iter().map(|s| s.goal().clone()).collect();
    assert_eq!(found.len(), report.solutions.len(), "a board was yielded twice");
    found
}

#[test]
fn scenario_a_queens_counts() {
    for (n, expected) in [(4, 2), (5, 10), (8, 92)] {
        let eager = boards(NQueens::new(n), SearchPolicy::sequential());
        assert_eq!(eager.len(), expected, "n={n}");
        assert!(eager.iter().all(|b| NQueens::new(n).is_goal(b)));

        let lazy = boards(NQueens::lazy(n), SearchPolicy::sequential());
        assert_eq!(lazy, eager, "lazy n={n}");

        let parallel = boards(NQueens::new(n), SearchPolicy::sequential().with_workers(4));
        assert_eq!(parallel, eager, "parallel n={n}");
    }
}

#[test]
fn scenario_a_solution_paths_place_one_queen_per_row() {
    let world = NQueens::new(6);
    let mut engine = BestFirst::new(world, world.evaluator(), SearchPolicy::sequential()).unwrap();
    let solution = engine.next_solution().unwrap().unwrap();
    let labels: Vec<usize> = solution.path().labels().copied().collect();
    assert_eq!(&labels, solution.goal());
    assert_eq!(*solution.value(), 0);
}

fn named(engine: &BestFirst<ExplicitTree, usize>, name: &str) -> NodeId {
    engine
        .with_registry(|r| r.nodes().find(|n| n.state() == name).map(SearchNode::id))
        .unwrap_or_else(|| panic!("no node {name}"))
}

fn status(engine: &BestFirst<ExplicitTree, usize>, name: &str) -> NodeStatus {
    engine.node(named(engine, name)).unwrap().status()
}

fn tracked(engine: &BestFirst<ExplicitTree, usize>) -> usize {
    engine.with_registry(|r| r.open_len() + r.suspended_len())
}

#[test]
fn scenario_b_temporary_root_suspends_sibling() {
    let mut engine = BestFirst::new(ExplicitTree::abcde(), by_depth::<String, String>(), SearchPolicy::sequential()).unwrap();
    engine.step().unwrap(); // expands A
    let before = tracked(&engine);
    assert_eq!(before, 2);

    let b = named(&engine, "B");
    let repartition = engine.set_temporary_root(b).unwrap();
    assert_eq!(repartition.suspended, 1);
    assert_eq!(repartition.tracked, before);
    assert_eq!(status(&engine, "C"), NodeStatus::Suspended);
    assert_eq!(status(&engine, "B"), NodeStatus::Open);

    engine.step().unwrap(); // expands B
    assert_eq!(status(&engine, "D"), NodeStatus::Open);
    assert_eq!(status(&engine, "E"), NodeStatus::Open);
    assert_eq!(status(&engine, "C"), NodeStatus::Suspended);
    assert_eq!(tracked(&engine), 3);

    let a = named(&engine, "A");
    let repartition = engine.set_temporary_root(a).unwrap();
    assert_eq!(repartition.resumed, 1);
    assert_eq!(repartition.tracked, 3);
    assert_eq!(status(&engine, "C"), NodeStatus::Open);
    engine.with_registry(|r| r.check_consistency()).unwrap();
}

#[test]
fn scenario_b_only_subtree_is_expanded() {
    let mut engine = BestFirst::new(ExplicitTree::abcde(), by_depth::<String, String>(), SearchPolicy::sequential()).unwrap();
    engine.step().unwrap();
    let b = named(&engine, "B");
    engine.set_temporary_root(b).unwrap();

    let mut expanded = Vec::new();
    while engine.with_registry(|r| r.temporary_root()).is_some() {
        if let StepOutcome::Expanded(batch) = engine.step().unwrap() {
            expanded.extend(batch.iter().map(|e| e.node));
        }
    }
    let names: Vec<String> = expanded
        .iter()
        .map(|&id| engine.node(id).unwrap().state().clone())
        .collect();
    // B, D and E; then the exhausted root is lifted and C is expanded.
    assert_eq!(names, ["B", "D", "E", "C"]);
    assert_eq!(status(&engine, "C"), NodeStatus::Closed);

    assert!(engine.next_solution().unwrap().is_none());
    assert_eq!(engine.state(), EngineState::Exhausted);
}

#[test]
fn scenario_c_random_search_yields_only_the_goal() {
    for lazy in [false, true] {
        let needle = if lazy { Needle::new(12, 7, 5).lazy() } else { Needle::new(12, 7, 5) };
        for seed in 0..10 {
            let engine = random_search(needle, seed, SearchPolicy::sequential()).unwrap();
            let solutions: Vec<_> = engine.collect();
            assert_eq!(solutions.len(), 1, "seed {seed} lazy {lazy}");
            let path = strip_tags(solutions[0].path());
            assert_eq!(*path.head(), needle.goal_state());
            assert!(needle.is_goal(path.head()));
            assert_eq!(path.labels().next(), Some(&7));
        }
    }
}

#[test]
fn scenario_c_holds_with_parallel_expansion() {
    let needle = Needle::new(16, 3, 6);
    for seed in [1, 2, 3] {
        let mut engine = random_search(needle, seed, SearchPolicy::sequential().with_workers(3)).unwrap();
        let first = engine.next_solution().unwrap().unwrap();
        assert_eq!(*first.goal(), needle.goal_state());
        assert!(engine.next_solution().unwrap().is_none());
        assert_eq!(engine.state(), EngineState::Exhausted);
        assert_eq!(engine.stats().created, needle.state_count());
    }
}

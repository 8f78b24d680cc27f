//! Termination lock tests.
//!
//! Proves:
//! 1. The expansion budget stops the engine at exactly that many expansions
//! 2. An infinitely branching lazy generator terminates under a successor cap
//! 3. A panicking generator fails the engine, and the failure is sticky
//! 4. A failure mid-batch leaves no node in flight
//! 5. Every terminal state is sticky and reported to observers once

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arbor_harness::worlds::explicit_tree::ExplicitTree;
use arbor_harness::worlds::n_queens::NQueens;
use arbor_kernel::{ExpansionDescription, GraphGenerator, Successors};
use arbor_search::{
    BestFirst, EngineState, SearchError, SearchObserver, SearchPolicy, SearchStats, StepOutcome,
};
use lock_tests::engine_helpers::{by_depth, queens};

/// Every state has infinitely many children; goals sit at depth 3.
struct Unbounded;

impl GraphGenerator for Unbounded {
    type State = Vec<u64>;
    type Label = u64;

    fn roots(&self) -> Vec<Vec<u64>> {
        vec![Vec::new()]
    }

    fn successors(&self, state: &Vec<u64>) -> Successors<'_, Vec<u64>, u64> {
        let parent = state.clone();
        Successors::lazy((0u64..).map(move |i| {
            let mut child = parent.clone();
            child.push(i);
            ExpansionDescription::new(child, i)
        }))
    }

    fn is_goal(&self, state: &Vec<u64>) -> bool {
        state.len() == 3
    }
}

/// Panics when asked to expand `B`.
struct Brittle(ExplicitTree);

impl GraphGenerator for Brittle {
    type State = String;
    type Label = String;

    fn roots(&self) -> Vec<String> {
        self.0.roots()
    }

    fn successors(&self, state: &String) -> Successors<'_, String, String> {
        assert_ne!(state, "B", "generator bug");
        self.0.successors(state)
    }

    fn is_goal(&self, state: &String) -> bool {
        self.0.is_goal(state)
    }
}

/// Goal test panics on `C`.
struct BrittleGoal(ExplicitTree);

impl GraphGenerator for BrittleGoal {
    type State = String;
    type Label = String;

    fn roots(&self) -> Vec<String> {
        self.0.roots()
    }

    fn successors(&self, state: &String) -> Successors<'_, String, String> {
        self.0.successors(state)
    }

    fn is_goal(&self, state: &String) -> bool {
        assert_ne!(state, "C", "goal test bug");
        self.0.is_goal(state)
    }
}

#[derive(Default)]
struct Terminations(AtomicUsize);

impl<S, L, V> SearchObserver<S, L, V> for Terminations {
    fn name(&self) -> &str {
        "terminations"
    }

    fn on_search_terminated(&self, _state: EngineState, _stats: &SearchStats) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn expansion_budget_is_exact() {
    for workers in [1, 3] {
        let policy = SearchPolicy::sequential().with_workers(workers).with_max_expansions(7);
        let mut engine = queens(8, policy);
        while engine.next_solution().unwrap().is_some() {}
        assert_eq!(engine.state(), EngineState::BudgetExhausted, "workers={workers}");
        assert_eq!(engine.stats().expanded, 7, "workers={workers}");
        assert!(engine.with_registry(|r| r.open_len()) > 0);
    }
}

#[test]
fn successor_cap_bounds_infinite_branching() {
    let policy = SearchPolicy::sequential().with_max_successors_per_node(2);
    let mut engine = BestFirst::new(Unbounded, by_depth::<Vec<u64>, u64>(), policy).unwrap();
    let goals: Vec<Vec<u64>> = engine.by_ref().map(|s| s.goal().clone()).collect();

    assert_eq!(goals.len(), 8);
    assert!(goals.iter().flatten().all(|&i| i < 2));
    assert_eq!(engine.state(), EngineState::Exhausted);
    // 1 + 2 + 4 + 8 nodes; the goals are never expanded.
    assert_eq!(engine.stats().created, 15);
    assert_eq!(engine.stats().expanded, 7);
}

#[test]
fn panicking_generator_fails_the_engine() {
    let terminations = Arc::new(Terminations::default());
    let mut engine = BestFirst::new(
        Brittle(ExplicitTree::abcde()),
        by_depth::<String, String>(),
        SearchPolicy::sequential(),
    )
    .unwrap()
    .with_observer(terminations.clone());

    let err = loop {
        match engine.step() {
            Ok(StepOutcome::Terminated(state)) => panic!("terminated as {state} instead of failing"),
            Ok(_) => {}
            Err(e) => break e,
        }
    };
    assert!(matches!(err, SearchError::CollaboratorPanicked { .. }), "{err:?}");
    assert!(err.is_contract_violation());
    assert_eq!(engine.state(), EngineState::Failed);
    assert_eq!(engine.failure(), Some(&err));

    // Sticky: same error, no new work, no second notification.
    let expanded = engine.stats().expanded;
    assert_eq!(engine.step().unwrap_err(), err);
    assert_eq!(engine.next_solution().unwrap_err(), err);
    assert_eq!(engine.stats().expanded, expanded);
    assert_eq!(terminations.0.load(Ordering::SeqCst), 1);
    engine
        .with_registry(|r| {
            assert_eq!(r.in_flight_len(), 0);
            r.check_consistency()
        })
        .unwrap();
}

#[test]
fn goal_test_panic_mid_batch_returns_popped_nodes() {
    let terminations = Arc::new(Terminations::default());
    let mut engine = BestFirst::new(
        BrittleGoal(ExplicitTree::abcde()),
        by_depth::<String, String>(),
        SearchPolicy::sequential().with_workers(2),
    )
    .unwrap()
    .with_observer(terminations.clone());

    // B and C share a batch; C's goal test panics after B was popped.
    let err = engine.next_solution().unwrap_err();
    assert_eq!(err, SearchError::CollaboratorPanicked { stage: "goal test" });
    assert_eq!(engine.state(), EngineState::Failed);
    assert_eq!(terminations.0.load(Ordering::SeqCst), 1);
    engine
        .with_registry(|r| {
            assert_eq!(r.in_flight_len(), 0);
            assert_eq!(r.open_len(), 2);
            r.check_consistency()
        })
        .unwrap();
    assert_eq!(engine.step().unwrap_err(), err);
}

#[test]
fn terminal_states_are_sticky_and_notified_once() {
    let terminations = Arc::new(Terminations::default());
    let world = NQueens::new(4);
    let mut engine = BestFirst::new(world, world.evaluator(), SearchPolicy::sequential())
        .unwrap()
        .with_observer(terminations.clone());

    assert_eq!(engine.by_ref().count(), 2);
    for _ in 0..3 {
        assert_eq!(engine.step().unwrap(), StepOutcome::Terminated(EngineState::Exhausted));
        assert!(engine.next_solution().unwrap().is_none());
    }
    assert_eq!(terminations.0.load(Ordering::SeqCst), 1);

    let mut cancelled = queens(6, SearchPolicy::sequential());
    cancelled.step().unwrap();
    cancelled.cancel_handle().cancel();
    assert_eq!(cancelled.step().unwrap(), StepOutcome::Terminated(EngineState::Cancelled));
    assert_eq!(cancelled.step().unwrap(), StepOutcome::Terminated(EngineState::Cancelled));
}

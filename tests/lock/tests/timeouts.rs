//! Timeout and cancellation lock tests.
//!
//! Proves:
//! 1. A slow evaluation is answered by the fallback, the same way every run
//! 2. Without a fallback the slow node is pruned and the search goes on
//! 3. The global timeout stops the engine with its registry intact
//! 4. The global timeout and a caller interrupt reach an evaluation in progress
//! 5. A cancel from another thread stops the engine at the next check

use std::thread;
use std::time::{Duration, Instant};

use arbor_harness::run_to_completion;
use arbor_harness::worlds::n_queens::{AttackedCells, Board, NQueens};
use arbor_kernel::{ConstantEvaluator, EvaluationError, Interrupt, NodeEvaluator, Path};
use arbor_search::{BestFirst, EngineState, SearchError, SearchPolicy};

/// `AttackedCells`, except boards matching `slow` stall until interrupted
/// (or for `stall`, whichever comes first).
struct Stalling {
    inner: AttackedCells,
    slow: fn(&Board) -> bool,
    stall: Duration,
}

impl NodeEvaluator<Board, usize> for Stalling {
    type Value = usize;

    fn evaluate(&self, path: &Path<Board, usize>, interrupt: &Interrupt) -> Result<usize, EvaluationError> {
        if (self.slow)(path.head()) {
            let until = Instant::now() + self.stall;
            while Instant::now() < until {
                if interrupt.is_raised() {
                    return Err(EvaluationError::Interrupted);
                }
                thread::sleep(Duration::from_millis(1));
            }
        }
        self.inner.evaluate(path, interrupt)
    }
}

fn first_queen_left(board: &Board) -> bool {
    board.as_slice() == [0]
}

fn every_board(_: &Board) -> bool {
    true
}

fn any_queen_placed(board: &Board) -> bool {
    !board.as_slice().is_empty()
}

/// Sleeps through every evaluation without looking at its interrupt.
struct Oblivious(Duration);

impl NodeEvaluator<Board, usize> for Oblivious {
    type Value = usize;

    fn evaluate(&self, path: &Path<Board, usize>, _: &Interrupt) -> Result<usize, EvaluationError> {
        if any_queen_placed(path.head()) {
            thread::sleep(self.0);
        }
        Ok(path.depth())
    }
}

fn stalling(n: usize, slow: fn(&Board) -> bool, stall: Duration) -> Stalling {
    Stalling {
        inner: NQueens::new(n).evaluator(),
        slow,
        stall,
    }
}

fn budgeted() -> SearchPolicy {
    SearchPolicy::sequential().with_evaluation_timeout(Duration::from_millis(200))
}

#[test]
fn fallback_value_replaces_slow_evaluation() {
    let mut digests = Vec::new();
    for _ in 0..3 {
        let engine = BestFirst::new(
            NQueens::new(5),
            stalling(5, first_queen_left, Duration::from_secs(30)),
            budgeted(),
        )
        .unwrap()
        .with_timeout_fallback(ConstantEvaluator(usize::MAX));
        let started = Instant::now();
        let report = run_to_completion(engine, None).unwrap();
        assert!(started.elapsed() < Duration::from_secs(20), "slow evaluator was waited for");

        assert_eq!(report.solutions.len(), 10);
        assert_eq!(report.state, EngineState::Exhausted);
        assert_eq!(report.stats.timed_out, 1);
        assert_eq!(report.stats.pruned, 0);
        digests.push(report.trace_digest);
    }
    assert!(digests.windows(2).all(|w| w[0] == w[1]), "{digests:?}");
}

#[test]
fn fallback_value_is_recorded_on_the_node() {
    let mut engine = BestFirst::new(
        NQueens::new(5),
        stalling(5, first_queen_left, Duration::from_secs(30)),
        budgeted(),
    )
    .unwrap()
    .with_timeout_fallback(ConstantEvaluator(usize::MAX));
    engine.step().unwrap();

    let slow = engine.with_registry(|r| {
        r.nodes()
            .find(|n| n.state().as_slice() == [0])
            .map(|n| (n.value().copied(), n.annotations().timed_out))
    });
    assert_eq!(slow, Some((Some(usize::MAX), true)));
}

#[test]
fn without_fallback_slow_node_is_pruned() {
    let engine = BestFirst::new(
        NQueens::new(5),
        stalling(5, first_queen_left, Duration::from_secs(30)),
        budgeted(),
    )
    .unwrap();
    let report = run_to_completion(engine, None).unwrap();

    // Two of the ten 5-Queens boards start in column 0.
    assert_eq!(report.solutions.len(), 8);
    assert!(report.solutions.iter().all(|s| s.goal()[0] != 0));
    assert_eq!(report.stats.pruned, 1);
    assert_eq!(report.stats.timed_out, 0);
    assert_eq!(report.state, EngineState::Exhausted);
}

#[test]
fn global_timeout_preserves_registry() {
    // The root's twelve children take about 60ms; the deadline lands later.
    let policy = SearchPolicy::sequential().with_global_timeout(Duration::from_millis(300));
    let mut engine = BestFirst::new(
        NQueens::new(12),
        stalling(12, every_board, Duration::from_millis(5)),
        policy,
    )
    .unwrap();

    let started = Instant::now();
    while engine.next_solution().unwrap().is_some() {}
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(engine.state(), EngineState::TimedOut);

    let (nodes, open) = engine.with_registry(|r| (r.len(), r.open_len()));
    assert!(nodes > 1);
    assert!(open > 0, "frontier must survive the timeout");
    engine.with_registry(|r| r.check_consistency()).unwrap();

    // Sticky.
    assert!(engine.next_solution().unwrap().is_none());
    assert_eq!(engine.state(), EngineState::TimedOut);
}

#[test]
fn global_timeout_interrupts_running_evaluation() {
    for workers in [1, 4] {
        let policy = SearchPolicy::sequential()
            .with_workers(workers)
            .with_global_timeout(Duration::from_millis(50));
        let mut engine = BestFirst::new(
            NQueens::new(8),
            stalling(8, any_queen_placed, Duration::from_secs(30)),
            policy,
        )
        .unwrap();

        let started = Instant::now();
        assert!(engine.next_solution().unwrap().is_none());
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "workers={workers}: took {:?}",
            started.elapsed()
        );
        assert_eq!(engine.state(), EngineState::TimedOut, "workers={workers}");
        assert_eq!(engine.stats().expanded, 0);
        engine
            .with_registry(|r| {
                assert_eq!(r.in_flight_len(), 0);
                assert_eq!(r.open_len(), 1, "the abandoned root goes back to OPEN");
                r.check_consistency()
            })
            .unwrap();
    }
}

#[test]
fn global_timeout_abandons_budgeted_evaluation_that_ignores_interrupts() {
    let policy = SearchPolicy::sequential()
        .with_evaluation_timeout(Duration::from_secs(30))
        .with_global_timeout(Duration::from_millis(50));
    let mut engine = BestFirst::new(NQueens::new(8), Oblivious(Duration::from_secs(3)), policy).unwrap();

    let started = Instant::now();
    assert!(engine.next_solution().unwrap().is_none());
    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    assert_eq!(engine.state(), EngineState::TimedOut);
    assert_eq!(engine.with_registry(|r| r.in_flight_len()), 0);
}

#[test]
fn caller_interrupt_reaches_running_evaluation() {
    let mut engine = BestFirst::new(
        NQueens::new(8),
        stalling(8, any_queen_placed, Duration::from_secs(30)),
        SearchPolicy::sequential(),
    )
    .unwrap();
    let token = Interrupt::new();
    let remote = token.clone();
    let raiser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        remote.raise();
    });

    let started = Instant::now();
    let err = engine.next_solution_interruptible(&token).unwrap_err();
    raiser.join().unwrap();
    assert_eq!(err, SearchError::Interrupted);
    assert!(started.elapsed() < Duration::from_secs(5), "took {:?}", started.elapsed());

    // Resumable: nothing lost, nothing in flight.
    assert_eq!(engine.state(), EngineState::Running);
    engine
        .with_registry(|r| {
            assert_eq!(r.in_flight_len(), 0);
            assert_eq!(r.open_len(), 1);
            r.check_consistency()
        })
        .unwrap();
    engine.cancel_handle().cancel();
    assert!(engine.next_solution().unwrap().is_none());
    assert_eq!(engine.state(), EngineState::Cancelled);
}

#[test]
fn cancel_from_another_thread() {
    let mut engine = BestFirst::new(
        NQueens::new(12),
        stalling(12, every_board, Duration::from_millis(5)),
        SearchPolicy::sequential(),
    )
    .unwrap();
    let handle = engine.cancel_handle();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        handle.cancel();
    });

    let started = Instant::now();
    while engine.next_solution().unwrap().is_some() {}
    canceller.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(engine.state(), EngineState::Cancelled);
    assert!(engine.cancel_handle().is_cancelled());
    engine.with_registry(|r| {
        assert_eq!(r.in_flight_len(), 0);
        r.check_consistency()
    })
    .unwrap();
}

#[test]
fn cancel_reaches_parallel_workers() {
    let mut engine = BestFirst::new(
        NQueens::new(12),
        stalling(12, every_board, Duration::from_millis(5)),
        SearchPolicy::sequential().with_workers(4),
    )
    .unwrap();
    let handle = engine.cancel_handle();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        handle.cancel();
    });
    while engine.next_solution().unwrap().is_some() {}
    canceller.join().unwrap();

    assert_eq!(engine.state(), EngineState::Cancelled);
    engine.with_registry(|r| r.check_consistency()).unwrap();
}

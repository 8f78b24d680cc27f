//! Engine builders and reference computations used across lock tests.
//!
//! The reference computations (breadth-first signatures, Dijkstra) are
//! written without the engine so they can check it independently.

use std::collections::{BTreeMap, BinaryHeap, HashMap, VecDeque};
use std::cmp::Reverse;
use std::fmt::Debug;

use arbor_harness::worlds::grid::{Cell, Grid};
use arbor_harness::worlds::n_queens::NQueens;
use arbor_kernel::{FnEvaluator, GraphGenerator, Path};
use arbor_search::{BestFirst, SearchPolicy};

/// Evaluator that scores a path by its depth: breadth-first order.
pub fn by_depth<S, L>() -> FnEvaluator<impl Fn(&Path<S, L>) -> usize> {
    FnEvaluator(|p: &Path<S, L>| p.depth())
}

/// N-Queens engine scored by attacked cells in the next row.
///
/// # Panics
///
/// Panics if `policy` is invalid.
#[must_use]
pub fn queens(n: usize, policy: SearchPolicy) -> BestFirst<NQueens, usize> {
    let world = NQueens::new(n);
    BestFirst::new(world, world.evaluator(), policy).expect("valid policy")
}

/// Shape of a graph explored breadth-first from its roots, independent of
/// successor order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BfsSignature {
    pub nodes: usize,
    pub edges: usize,
    /// Root-to-node label sequences (rendered with `Debug`) and how often each occurs.
    pub label_paths: BTreeMap<Vec<String>, usize>,
}

/// Breadth-first traversal of the tree unfolding of `generator`, stopping
/// after `limit` nodes.
pub fn bfs_signature<G: GraphGenerator>(generator: &G, limit: usize) -> BfsSignature {
    let mut signature = BfsSignature {
        nodes: 0,
        edges: 0,
        label_paths: BTreeMap::new(),
    };
    let mut queue: VecDeque<(G::State, Vec<String>)> =
        generator.roots().into_iter().map(|r| (r, Vec::new())).collect();
    while let Some((state, labels)) = queue.pop_front() {
        if signature.nodes >= limit {
            break;
        }
        signature.nodes += 1;
        for d in generator.successors(&state).collect_capped(None) {
            signature.edges += 1;
            let mut next = labels.clone();
            next.push(format!("{:?}", d.label));
            queue.push_back((d.state, next));
        }
        *signature.label_paths.entry(labels).or_default() += 1;
    }
    signature
}

/// Multiset of successor descriptions rendered with `Debug`.
pub fn successor_multiset<G: GraphGenerator>(generator: &G, state: &G::State) -> Vec<String>
where
    G::State: Debug,
{
    let mut out: Vec<String> = generator
        .successors(state)
        .collect_capped(None)
        .iter()
        .map(|d| format!("{d:?}"))
        .collect();
    out.sort();
    out
}

/// Cheapest start-to-goal cost on `grid`, or `None` if the goal is walled off.
#[must_use]
pub fn dijkstra(grid: &Grid) -> Option<u64> {
    let mut best: HashMap<Cell, u64> = HashMap::from([(grid.start(), 0)]);
    let mut heap = BinaryHeap::from([Reverse((0u64, grid.start()))]);
    while let Some(Reverse((cost, cell))) = heap.pop() {
        if cell == grid.goal() {
            return Some(cost);
        }
        if best.get(&cell).is_some_and(|&b| b < cost) {
            continue;
        }
        for d in grid.successors(&cell).collect_capped(None) {
            let Some(step) = grid.entry_cost(d.state) else { continue };
            let next = cost + u64::from(step);
            let improves = match best.get(&d.state) {
                Some(&b) => next < b,
                None => true,
            };
            if improves {
                best.insert(d.state, next);
                heap.push(Reverse((next, d.state)));
            }
        }
    }
    None
}

/// Maps with walls and expensive cells, each with a reachable goal. The
/// detours stay close to the heuristic so the tree unfolding stays small.
pub const GRID_MAPS: [&str; 3] = [
    "
    S....
    .###.
    ....G
    ",
    "
    S9...
    .9.9.
    ...9G
    ",
    "
    S..#...
    .#.#.#.
    .#...#.
    .####..
    ..3...G
    ",
];

/// Cheapest costs of [`GRID_MAPS`], worked out by hand.
pub const GRID_COSTS: [u64; 3] = [6, 10, 12];

//! R*: best-first search over a sparse graph of sampled distant successors.
//!
//! Each expansion of a state `s` samples `k` states at distance `δ` from it
//! (the gamma successors) and tries to connect `s` to each with a local A*
//! bounded by `local_budget` expansions. Edges whose local search gives up
//! carry the pairwise heuristic as a cost estimate and mark every path through
//! them AVOID, as does a path whose cost exceeds `w * h(root, s)`. AVOID nodes
//! are expanded only when nothing else is left. When a goal is reached the
//! remaining unrealized edges are connected with unbounded local searches and
//! the segments are concatenated into a path of the underlying graph.
//!
//! Local searches expand each underlying state at most once, so on a finite
//! graph even an unbounded one ends, with no path when the target is cut off.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};

use arbor_kernel::{
    EvaluationError, ExpansionDescription, GoalTest, GraphGenerator, Interrupt, NodeEvaluator,
    Path, Successors,
};
use ordered_float::OrderedFloat;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::SearchError;
use crate::node::NodeId;
use crate::policy::SearchPolicy;
use crate::search::{BestFirst, CancelHandle, EngineState};
use crate::solution::Solution;
use crate::stats::SearchStats;
use crate::strategy::astar::{path_cost, AStarEvaluator, Cost, EdgeCost, Heuristic};

/// Samples states roughly `delta` away from a state.
///
/// Implementations should include a goal state whenever one lies within
/// `delta`; otherwise the gamma graph may never reach it.
pub trait DistantSuccessors<S>: Send + Sync {
    fn distant_successors(&self, state: &S, k: usize, delta: f64, rng: &mut dyn RngCore) -> Vec<S>;
}

/// Estimated cost between two arbitrary states.
pub trait PairHeuristic<S>: Send + Sync {
    fn between(&self, from: &S, to: &S) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RStarConfig {
    /// Suboptimality bound `w >= 1`.
    pub weight: f64,
    /// Gamma successors sampled per expansion.
    pub k: usize,
    /// Sampling radius.
    pub delta: f64,
    /// Expansion budget of each local search. `None` is unbounded.
    pub local_budget: Option<u64>,
    /// Seed for sampling when the engine itself is unseeded.
    pub seed: u64,
}

impl RStarConfig {
    /// # Errors
    ///
    /// [`SearchError::InvalidPolicy`] for `w < 1`, `k == 0`, a non-positive
    /// `delta` or a zero local budget.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !(self.weight.is_finite() && self.weight >= 1.0) {
            return Err(SearchError::invalid("R* weight must be finite and at least 1"));
        }
        if self.k == 0 {
            return Err(SearchError::invalid("R* k must be at least 1"));
        }
        if !(self.delta.is_finite() && self.delta > 0.0) {
            return Err(SearchError::invalid("R* delta must be finite and positive"));
        }
        if self.local_budget == Some(0) {
            return Err(SearchError::invalid("R* local_budget must be positive"));
        }
        Ok(())
    }
}

impl Default for RStarConfig {
    fn default() -> Self {
        Self {
            weight: 1.0,
            k: 4,
            delta: 4.0,
            local_budget: Some(64),
            seed: 0,
        }
    }
}

/// A gamma-graph edge: a realized path segment or an estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct GammaEdge<S, L> {
    pub realization: Option<Path<S, L>>,
    pub cost: f64,
}

impl<S, L> GammaEdge<S, L> {
    #[must_use]
    pub fn is_realized(&self) -> bool {
        self.realization.is_some()
    }
}

/// One local search problem: `start` to `target` in the underlying graph.
struct Segment<G: GraphGenerator> {
    inner: Arc<G>,
    start: G::State,
    target: G::State,
    /// States already expanded. Later nodes wrapping them are dead ends.
    expanded: Mutex<HashSet<G::State>>,
}

impl<G: GraphGenerator> Segment<G> {
    fn is_expanded(&self, state: &G::State) -> bool {
        self.expanded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(state)
    }
}

impl<G: GraphGenerator> GraphGenerator for Segment<G> {
    type State = G::State;
    type Label = G::Label;

    fn roots(&self) -> Vec<G::State> {
        vec![self.start.clone()]
    }

    /// With a consistent heuristic the first expansion of a state is a
    /// cheapest one, so repeats and edges back into expanded states are cut.
    fn successors(&self, state: &G::State) -> Successors<'_, G::State, G::Label> {
        let first = self
            .expanded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(state.clone());
        if !first {
            return Successors::Materialized(Vec::new());
        }
        match self.inner.successors(state) {
            Successors::Materialized(mut all) => {
                all.retain(|d| !self.is_expanded(&d.state));
                all.into()
            }
            Successors::Lazy(stream) => Successors::lazy(stream.filter(move |d| !self.is_expanded(&d.state))),
        }
    }

    fn is_goal(&self, state: &G::State) -> bool {
        *state == self.target
    }
}

struct Towards<H, S> {
    pair: Arc<H>,
    target: S,
}

impl<H: PairHeuristic<S>, S: Send + Sync> Heuristic<S> for Towards<H, S> {
    fn estimate(&self, state: &S) -> f64 {
        self.pair.between(state, &self.target)
    }
}

/// Shortest path from `start` to `target` with at most `budget` expansions.
/// `None` when the budget runs out or `target` is unreachable.
fn connect<G, C, H>(
    inner: &Arc<G>,
    cost: &Arc<C>,
    pair: &Arc<H>,
    start: &G::State,
    target: &G::State,
    budget: Option<u64>,
) -> Option<Path<G::State, G::Label>>
where
    G: GraphGenerator,
    C: EdgeCost<G::State, G::Label> + 'static,
    H: PairHeuristic<G::State> + 'static,
{
    let segment = Segment {
        inner: Arc::clone(inner),
        start: start.clone(),
        target: target.clone(),
        expanded: Mutex::new(HashSet::new()),
    };
    let towards = Towards {
        pair: Arc::clone(pair),
        target: target.clone(),
    };
    let policy = SearchPolicy {
        max_expansions: budget,
        ..SearchPolicy::default()
    };
    let _span = tracing::debug_span!("rstar_local", ?start, ?target, ?budget).entered();
    let evaluator = AStarEvaluator::from_shared(Arc::clone(cost), Arc::new(towards));
    let mut local = BestFirst::new(segment, evaluator, policy).ok()?;
    match local.next_solution() {
        Ok(found) => found.map(Solution::into_path),
        Err(error) => {
            tracing::warn!(error = %error, "local search failed");
            None
        }
    }
}

/// The gamma graph over an underlying generator.
pub struct Gamma<G, D, C, H> {
    inner: Arc<G>,
    distant: D,
    cost: Arc<C>,
    heuristic: Arc<H>,
    config: RStarConfig,
}

impl<G, D, C, H> Gamma<G, D, C, H>
where
    G: GraphGenerator,
    D: DistantSuccessors<G::State>,
    C: EdgeCost<G::State, G::Label> + 'static,
    H: Heuristic<G::State> + PairHeuristic<G::State> + 'static,
{
    fn sample(
        &self,
        state: &G::State,
        rng: &mut dyn RngCore,
    ) -> Vec<ExpansionDescription<G::State, GammaEdge<G::State, G::Label>>> {
        let mut targets = self
            .distant
            .distant_successors(state, self.config.k, self.config.delta, rng);
        targets.retain(|t| t != state);
        targets.truncate(self.config.k);

        targets
            .into_iter()
            .map(|target| {
                let edge = match connect(
                    &self.inner,
                    &self.cost,
                    &self.heuristic,
                    state,
                    &target,
                    self.config.local_budget,
                ) {
                    Some(segment) => GammaEdge {
                        cost: path_cost(self.cost.as_ref(), &segment),
                        realization: Some(segment),
                    },
                    None => {
                        tracing::debug!(?state, ?target, "gamma edge left unrealized");
                        GammaEdge {
                            cost: self.heuristic.between(state, &target),
                            realization: None,
                        }
                    }
                };
                ExpansionDescription::new(target, edge)
            })
            .collect()
    }
}

impl<G, D, C, H> GraphGenerator for Gamma<G, D, C, H>
where
    G: GraphGenerator,
    D: DistantSuccessors<G::State>,
    C: EdgeCost<G::State, G::Label> + 'static,
    H: Heuristic<G::State> + PairHeuristic<G::State> + 'static,
{
    type State = G::State;
    type Label = GammaEdge<G::State, G::Label>;

    fn roots(&self) -> Vec<G::State> {
        self.inner.roots()
    }

    /// Sampling is seeded from the configured seed and the state, so equal
    /// states always get the same gamma successors.
    fn successors(&self, state: &G::State) -> Successors<'_, G::State, Self::Label> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        state.hash(&mut hasher);
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed ^ hasher.finish());
        self.sample(state, &mut rng).into()
    }

    fn successors_randomized(
        &self,
        state: &G::State,
        rng: &mut dyn RngCore,
    ) -> Successors<'_, G::State, Self::Label> {
        self.sample(state, rng).into()
    }

    fn is_goal(&self, state: &G::State) -> bool {
        self.inner.is_goal(state)
    }
}

/// Frontier priority: non-AVOID before AVOID, then `g + w * h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RStarKey {
    pub avoid: bool,
    pub f: Cost,
}

pub struct RStarEvaluator<H> {
    heuristic: Arc<H>,
    weight: f64,
}

impl<S, L, H> NodeEvaluator<S, GammaEdge<S, L>> for RStarEvaluator<H>
where
    H: Heuristic<S> + PairHeuristic<S>,
{
    type Value = RStarKey;

    fn evaluate(
        &self,
        path: &Path<S, GammaEdge<S, L>>,
        _interrupt: &Interrupt,
    ) -> Result<RStarKey, EvaluationError> {
        let g: f64 = path.labels().map(|e| e.cost).sum();
        let unrealized = path.labels().any(|e| !e.is_realized());
        let bound = self.weight * self.heuristic.between(path.root(), path.head());
        let h = self.heuristic.estimate(path.head());
        Ok(RStarKey {
            avoid: unrealized || g > bound,
            f: OrderedFloat(g + self.weight * h),
        })
    }
}

/// An R* search. Yields solutions as paths of the underlying graph.
pub struct RStar<G, D, C, H>
where
    G: GraphGenerator,
    D: DistantSuccessors<G::State>,
    C: EdgeCost<G::State, G::Label> + 'static,
    H: Heuristic<G::State> + PairHeuristic<G::State> + 'static,
{
    engine: BestFirst<Gamma<G, D, C, H>, RStarKey>,
    inner: Arc<G>,
    cost: Arc<C>,
    heuristic: Arc<H>,
}

/// Build an R* search over `generator`.
///
/// The generator must answer state goal tests; the gamma graph skips over
/// intermediate states, so a path-dependent goal cannot be checked on it.
///
/// # Errors
///
/// [`SearchError::InvalidPolicy`] if `config` or `policy` fails validation
/// or the generator declares [`GoalTest::Path`].
pub fn rstar<G, D, C, H>(
    generator: G,
    distant: D,
    cost: C,
    heuristic: H,
    config: RStarConfig,
    policy: SearchPolicy,
) -> Result<RStar<G, D, C, H>, SearchError>
where
    G: GraphGenerator,
    D: DistantSuccessors<G::State>,
    C: EdgeCost<G::State, G::Label> + 'static,
    H: Heuristic<G::State> + PairHeuristic<G::State> + 'static,
{
    config.validate()?;
    if generator.goal_test() == GoalTest::Path {
        return Err(SearchError::invalid("R* needs a state goal test"));
    }
    let inner = Arc::new(generator);
    let cost = Arc::new(cost);
    let heuristic = Arc::new(heuristic);
    let gamma = Gamma {
        inner: Arc::clone(&inner),
        distant,
        cost: Arc::clone(&cost),
        heuristic: Arc::clone(&heuristic),
        config,
    };
    let evaluator = RStarEvaluator {
        heuristic: Arc::clone(&heuristic),
        weight: config.weight,
    };
    Ok(RStar {
        engine: BestFirst::new(gamma, evaluator, policy)?,
        inner,
        cost,
        heuristic,
    })
}

impl<G, D, C, H> RStar<G, D, C, H>
where
    G: GraphGenerator,
    D: DistantSuccessors<G::State>,
    C: EdgeCost<G::State, G::Label> + 'static,
    H: Heuristic<G::State> + PairHeuristic<G::State> + 'static,
{
    /// Next goal, with every gamma edge replaced by its realization.
    ///
    /// A goal whose unrealized edges cannot be connected is skipped.
    ///
    /// # Errors
    ///
    /// A contract violation in the gamma search.
    pub fn next_solution(&mut self) -> Result<Option<Solution<G::State, G::Label, Cost>>, SearchError> {
        while let Some(found) = self.engine.next_solution()? {
            match self.realize(found.path()) {
                Some(path) => {
                    let cost = OrderedFloat(path_cost(self.cost.as_ref(), &path));
                    return Ok(Some(Solution::new(found.node(), path, cost)));
                }
                None => tracing::warn!(node = %found.node(), "gamma solution could not be realized"),
            }
        }
        Ok(None)
    }

    fn realize(
        &self,
        gamma: &Path<G::State, GammaEdge<G::State, G::Label>>,
    ) -> Option<Path<G::State, G::Label>> {
        let mut path = Path::new(gamma.root().clone());
        for (from, edge, to) in gamma.edges() {
            let segment = match &edge.realization {
                Some(segment) => segment.clone(),
                None => connect(&self.inner, &self.cost, &self.heuristic, from, to, None)?,
            };
            path.extend_with(segment);
        }
        Some(path)
    }

    /// The gamma-graph engine, for stepping and enforced exploration.
    pub fn engine_mut(&mut self) -> &mut BestFirst<Gamma<G, D, C, H>, RStarKey> {
        &mut self.engine
    }

    #[must_use]
    pub fn engine(&self) -> &BestFirst<Gamma<G, D, C, H>, RStarKey> {
        &self.engine
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.engine.state()
    }

    #[must_use]
    pub fn stats(&self) -> SearchStats {
        self.engine.stats()
    }

    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.engine.cancel_handle()
    }

    /// Whether gamma node `id` was ranked AVOID.
    #[must_use]
    pub fn is_avoided(&self, id: NodeId) -> Option<bool> {
        self.engine.node(id).and_then(|n| n.value().map(|k| k.avoid))
    }
}

impl<G, D, C, H> Iterator for RStar<G, D, C, H>
where
    G: GraphGenerator,
    D: DistantSuccessors<G::State>,
    C: EdgeCost<G::State, G::Label> + 'static,
    H: Heuristic<G::State> + PairHeuristic<G::State> + 'static,
{
    type Item = Solution<G::State, G::Label, Cost>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_solution().ok().flatten()
    }
}

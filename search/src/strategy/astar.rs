//! A*: `f = g + h`.
//!
//! The first solution is optimal when `h` is admissible and every edge cost
//! is non-negative. Neither is checked.

use std::sync::Arc;

use arbor_kernel::{EvaluationError, GraphGenerator, Interrupt, NodeEvaluator, Path};
use ordered_float::OrderedFloat;

use crate::error::SearchError;
use crate::policy::SearchPolicy;
use crate::search::BestFirst;

/// A* values: totally ordered `f64` (NaN sorts last).
pub type Cost = OrderedFloat<f64>;

pub trait EdgeCost<S, L>: Send + Sync {
    fn cost(&self, from: &S, label: &L, to: &S) -> f64;
}

/// Estimated remaining cost from a state to the nearest goal.
pub trait Heuristic<S>: Send + Sync {
    fn estimate(&self, state: &S) -> f64;
}

/// `h = 0`; A* degenerates to uniform-cost search.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroHeuristic;

impl<S> Heuristic<S> for ZeroHeuristic {
    fn estimate(&self, _state: &S) -> f64 {
        0.0
    }
}

/// Every edge costs `1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitCost;

impl<S, L> EdgeCost<S, L> for UnitCost {
    fn cost(&self, _from: &S, _label: &L, _to: &S) -> f64 {
        1.0
    }
}

pub struct AStarEvaluator<C, H> {
    cost: Arc<C>,
    heuristic: Arc<H>,
}

impl<C, H> AStarEvaluator<C, H> {
    #[must_use]
    pub fn new(cost: C, heuristic: H) -> Self {
        Self::from_shared(Arc::new(cost), Arc::new(heuristic))
    }

    #[must_use]
    pub fn from_shared(cost: Arc<C>, heuristic: Arc<H>) -> Self {
        Self { cost, heuristic }
    }

    /// `g`: the summed edge cost of `path`.
    pub fn path_cost<S, L>(&self, path: &Path<S, L>) -> f64
    where
        C: EdgeCost<S, L>,
    {
        path_cost(self.cost.as_ref(), path)
    }
}

/// Summed edge cost of `path` under `cost`.
pub fn path_cost<S, L, C: EdgeCost<S, L> + ?Sized>(cost: &C, path: &Path<S, L>) -> f64 {
    path.edges().map(|(from, label, to)| cost.cost(from, label, to)).sum()
}

impl<S, L, C, H> NodeEvaluator<S, L> for AStarEvaluator<C, H>
where
    C: EdgeCost<S, L>,
    H: Heuristic<S>,
{
    type Value = Cost;

    fn evaluate(&self, path: &Path<S, L>, _interrupt: &Interrupt) -> Result<Cost, EvaluationError> {
        let g = self.path_cost(path);
        let h = self.heuristic.estimate(path.head());
        Ok(OrderedFloat(g + h))
    }
}

/// An A* engine over `generator`.
///
/// # Errors
///
/// [`SearchError::InvalidPolicy`] if `policy` fails validation.
pub fn astar<G, C, H>(
    generator: G,
    cost: C,
    heuristic: H,
    policy: SearchPolicy,
) -> Result<BestFirst<G, Cost>, SearchError>
where
    G: GraphGenerator,
    C: EdgeCost<G::State, G::Label> + 'static,
    H: Heuristic<G::State> + 'static,
{
    BestFirst::new(generator, AStarEvaluator::new(cost, heuristic), policy)
}

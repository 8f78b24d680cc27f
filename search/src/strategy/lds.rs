//! Limited discrepancy search.
//!
//! Only a sibling ranking is available: the recommender says which child it
//! prefers, never by how much. [`Ranked`] tags each child with its rank among
//! its siblings (0 is the recommended one) and [`DiscrepancyVector`] orders
//! paths by how far they strayed from the recommendation.

use std::cmp::Ordering;
use std::fmt;

use arbor_kernel::{
    EvaluationError, ExpansionDescription, GoalTest, GraphGenerator, Interrupt, NodeEvaluator,
    Path, Successors,
};

use crate::error::SearchError;
use crate::policy::SearchPolicy;
use crate::search::BestFirst;
use crate::strategy::{strip_tags, Tagged};

/// Sibling preference. `Less` means `a` is preferred over `b`.
pub trait Recommender<S>: Send + Sync {
    fn compare(&self, a: &S, b: &S) -> Ordering;
}

/// Recommender backed by a comparison closure.
pub struct FnRecommender<F>(pub F);

impl<S, F> Recommender<S> for FnRecommender<F>
where
    F: Fn(&S, &S) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &S, b: &S) -> Ordering {
        (self.0)(a, b)
    }
}

/// Keeps generator order: the first child is the recommended one.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratorOrder;

impl<S> Recommender<S> for GeneratorOrder {
    fn compare(&self, _a: &S, _b: &S) -> Ordering {
        Ordering::Equal
    }
}

/// Generator wrapper that ranks each sibling list under a recommender.
///
/// Ranking needs the whole sibling list, so lazy streams are drawn in full.
/// Wrap only generators with finite successor streams.
pub struct Ranked<G, R> {
    inner: G,
    recommender: R,
}

impl<G, R> Ranked<G, R> {
    #[must_use]
    pub fn new(inner: G, recommender: R) -> Self {
        Self { inner, recommender }
    }

    #[must_use]
    pub fn inner(&self) -> &G {
        &self.inner
    }
}

impl<G, R> GraphGenerator for Ranked<G, R>
where
    G: GraphGenerator,
    R: Recommender<G::State>,
{
    type State = G::State;
    type Label = Tagged<G::Label, u32>;

    fn roots(&self) -> Vec<G::State> {
        self.inner.roots()
    }

    fn successors(&self, state: &G::State) -> Successors<'_, G::State, Self::Label> {
        let mut children = self.inner.successors(state).collect_capped(None);
        // Stable: equally preferred children keep generator order.
        children.sort_by(|a, b| self.recommender.compare(&a.state, &b.state));
        children
            .into_iter()
            .zip(0u32..)
            .map(|(d, rank)| ExpansionDescription {
                state: d.state,
                label: Tagged::new(d.label, rank),
                kind: d.kind,
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn goal_test(&self) -> GoalTest {
        self.inner.goal_test()
    }

    fn is_goal(&self, state: &G::State) -> bool {
        self.inner.is_goal(state)
    }

    fn is_goal_path(&self, path: &Path<G::State, Self::Label>) -> bool {
        self.inner.is_goal_path(&strip_tags(path))
    }
}

/// Sibling ranks along a path, root first.
///
/// Ordered by total discrepancy, then lexicographically from the root down,
/// then by length (a prefix sorts first).
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct DiscrepancyVector(pub Vec<u32>);

impl DiscrepancyVector {
    /// Sum of all ranks.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.iter().map(|&r| u64::from(r)).sum()
    }

    #[must_use]
    pub fn ranks(&self) -> &[u32] {
        &self.0
    }
}

impl Ord for DiscrepancyVector {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total()
            .cmp(&other.total())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for DiscrepancyVector {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for DiscrepancyVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}{:?}", self.total(), self.0)
    }
}

/// Reads the rank tags off a [`Ranked`] path.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscrepancyEvaluator;

impl<S, L> NodeEvaluator<S, Tagged<L, u32>> for DiscrepancyEvaluator {
    type Value = DiscrepancyVector;

    fn evaluate(
        &self,
        path: &Path<S, Tagged<L, u32>>,
        _interrupt: &Interrupt,
    ) -> Result<DiscrepancyVector, EvaluationError> {
        Ok(DiscrepancyVector(path.labels().map(|t| t.tag).collect()))
    }
}

/// An LDS engine over `generator`, ranking siblings with `recommender`.
///
/// # Errors
///
/// [`SearchError::InvalidPolicy`] if `policy` fails validation.
pub fn limited_discrepancy<G, R>(
    generator: G,
    recommender: R,
    policy: SearchPolicy,
) -> Result<BestFirst<Ranked<G, R>, DiscrepancyVector>, SearchError>
where
    G: GraphGenerator,
    R: Recommender<G::State>,
{
    BestFirst::new(Ranked::new(generator, recommender), DiscrepancyEvaluator, policy)
}

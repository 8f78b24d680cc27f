//! Graph generator contract.
//!
//! A generator owns the domain: root states, successor descriptions and goal
//! testing. The engine treats states as opaque values and only hashes them to
//! answer CLOSED membership queries.

use std::fmt::Debug;
use std::hash::Hash;

use rand::seq::SliceRandom;
use rand::RngCore;

use crate::path::Path;

/// AND/OR marker carried by an expansion. The best-first engine treats both
/// kinds as OR; the kind is kept on the node for collaborators that care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeKind {
    #[default]
    Or,
    And,
}

/// One successor of a state: pure data, equal by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpansionDescription<S, L> {
    pub state: S,
    pub label: L,
    pub kind: NodeKind,
}

impl<S, L> ExpansionDescription<S, L> {
    /// An OR successor.
    #[must_use]
    pub fn new(state: S, label: L) -> Self {
        Self {
            state,
            label,
            kind: NodeKind::Or,
        }
    }

    /// An AND successor.
    #[must_use]
    pub fn and(state: S, label: L) -> Self {
        Self {
            state,
            label,
            kind: NodeKind::And,
        }
    }
}

/// The successors of one state.
///
/// `Lazy` streams may be arbitrarily long; the engine draws at most
/// `max_successors_per_node` items from them per expansion.
pub enum Successors<'a, S, L> {
    Materialized(Vec<ExpansionDescription<S, L>>),
    Lazy(Box<dyn Iterator<Item = ExpansionDescription<S, L>> + Send + 'a>),
}

impl<'a, S, L> Successors<'a, S, L> {
    /// Wrap an iterator as a lazy stream.
    pub fn lazy<I>(iter: I) -> Self
    where
        I: Iterator<Item = ExpansionDescription<S, L>> + Send + 'a,
    {
        Self::Lazy(Box::new(iter))
    }

    /// Draw up to `cap` descriptions (all of them when `cap` is `None`).
    #[must_use]
    pub fn collect_capped(self, cap: Option<usize>) -> Vec<ExpansionDescription<S, L>> {
        match (self, cap) {
            (Self::Materialized(mut all), Some(cap)) => {
                all.truncate(cap);
                all
            }
            (Self::Materialized(all), None) => all,
            (Self::Lazy(iter), Some(cap)) => iter.take(cap).collect(),
            (Self::Lazy(iter), None) => iter.collect(),
        }
    }
}

impl<S, L> From<Vec<ExpansionDescription<S, L>>> for Successors<'_, S, L> {
    fn from(all: Vec<ExpansionDescription<S, L>>) -> Self {
        Self::Materialized(all)
    }
}

impl<S: Debug, L: Debug> Debug for Successors<'_, S, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Materialized(all) => f.debug_tuple("Materialized").field(all).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// Which goal predicate a generator answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GoalTest {
    /// Goal-ness depends on the terminal state only: [`GraphGenerator::is_goal`].
    #[default]
    State,
    /// Goal-ness depends on the whole path: [`GraphGenerator::is_goal_path`].
    Path,
}

/// Domain contract consumed by the search engine.
///
/// # Idempotency
///
/// Repeated calls to [`successors`](Self::successors) for equal states must
/// return the same multiset of descriptions (order may differ). Randomness
/// belongs in [`successors_randomized`](Self::successors_randomized), which
/// receives the engine's seeded source.
pub trait GraphGenerator: Send + Sync {
    type State: Clone + Eq + Hash + Debug + Send + Sync + 'static;
    type Label: Clone + Debug + Send + Sync + 'static;

    /// Initial states. An empty list is a contract violation.
    fn roots(&self) -> Vec<Self::State>;

    fn successors(&self, state: &Self::State) -> Successors<'_, Self::State, Self::Label>;

    /// Successors drawn with an external random source.
    ///
    /// The default shuffles materialized lists and passes lazy streams
    /// through untouched; generators with randomized lazy streams override it.
    fn successors_randomized(
        &self,
        state: &Self::State,
        rng: &mut dyn RngCore,
    ) -> Successors<'_, Self::State, Self::Label> {
        match self.successors(state) {
            Successors::Materialized(mut all) => {
                all.shuffle(rng);
                Successors::Materialized(all)
            }
            lazy @ Successors::Lazy(_) => lazy,
        }
    }

    /// Which of the two goal predicates the engine should call.
    fn goal_test(&self) -> GoalTest {
        GoalTest::State
    }

    fn is_goal(&self, state: &Self::State) -> bool;

    /// Path-dependent goal test. Defaults to testing the head state.
    fn is_goal_path(&self, path: &Path<Self::State, Self::Label>) -> bool {
        self.is_goal(path.head())
    }
}

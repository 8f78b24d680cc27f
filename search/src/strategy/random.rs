//! Random search.
//!
//! Every child draws a ticket from a sub-seed of the engine's random source.
//! The frontier is ordered deeper first, then by ticket, which makes the
//! search a seeded random depth-first walk that backtracks to a random
//! sibling whenever a branch dies out.

use std::cmp::Reverse;

use arbor_kernel::{
    EvaluationError, ExpansionDescription, GoalTest, GraphGenerator, Interrupt, NodeEvaluator,
    Path, Successors,
};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::SearchError;
use crate::policy::SearchPolicy;
use crate::search::BestFirst;
use crate::strategy::{strip_tags, Tagged};

/// Generator wrapper that tags each child with a random ticket.
///
/// Without a random source (an unseeded engine) tickets are the children's
/// positions, so the walk follows generator order.
pub struct Shuffled<G> {
    inner: G,
}

impl<G> Shuffled<G> {
    #[must_use]
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn inner(&self) -> &G {
        &self.inner
    }
}

fn tag_each<'a, S, L, F>(successors: Successors<'a, S, L>, mut ticket: F) -> Successors<'a, S, Tagged<L, u64>>
where
    S: 'a,
    L: 'a,
    F: FnMut() -> u64 + Send + 'a,
{
    let tag = move |d: ExpansionDescription<S, L>| ExpansionDescription {
        state: d.state,
        label: Tagged::new(d.label, ticket()),
        kind: d.kind,
    };
    match successors {
        Successors::Materialized(all) => Successors::Materialized(all.into_iter().map(tag).collect()),
        Successors::Lazy(stream) => Successors::lazy(stream.map(tag)),
    }
}

impl<G: GraphGenerator> GraphGenerator for Shuffled<G> {
    type State = G::State;
    type Label = Tagged<G::Label, u64>;

    fn roots(&self) -> Vec<G::State> {
        self.inner.roots()
    }

    fn successors(&self, state: &G::State) -> Successors<'_, G::State, Self::Label> {
        let mut position = 0u64;
        tag_each(self.inner.successors(state), move || {
            position += 1;
            position - 1
        })
    }

    fn successors_randomized(
        &self,
        state: &G::State,
        rng: &mut dyn RngCore,
    ) -> Successors<'_, G::State, Self::Label> {
        let mut tickets = ChaCha8Rng::seed_from_u64(rng.next_u64());
        tag_each(self.inner.successors_randomized(state, rng), move || tickets.next_u64())
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

/// Frontier priority for random search: deeper first, then lower ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RandomKey {
    pub depth: Reverse<usize>,
    pub ticket: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomWalkEvaluator;

impl<S, L> NodeEvaluator<S, Tagged<L, u64>> for RandomWalkEvaluator {
    type Value = RandomKey;

    fn evaluate(
        &self,
        path: &Path<S, Tagged<L, u64>>,
        _interrupt: &Interrupt,
    ) -> Result<RandomKey, EvaluationError> {
        Ok(RandomKey {
            depth: Reverse(path.depth()),
            ticket: path.last_label().map_or(0, |t| t.tag),
        })
    }
}

/// A random search over `generator`, reproducible from `seed`.
///
/// `seed` overrides any seed already set on `policy`.
///
/// # Errors
///
/// [`SearchError::InvalidPolicy`] if `policy` fails validation.
pub fn random_search<G: GraphGenerator>(
    generator: G,
    seed: u64,
    policy: SearchPolicy,
) -> Result<BestFirst<Shuffled<G>, RandomKey>, SearchError> {
    BestFirst::new(Shuffled::new(generator), RandomWalkEvaluator, policy.with_seed(seed))
}

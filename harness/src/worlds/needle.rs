//! `Needle`: one goal behind one branch among `width` siblings.
//!
//! The root has `width` children. Every child starts a chain `depth` states
//! long; only the chain under `branch` ends in the goal. Siblings can be
//! handed out as a lazy stream.

use arbor_kernel::{ExpansionDescription, GraphGenerator, Successors};

/// `(branch, step)`; the root is `(0, 0)` and branch ids start at 1.
pub type NeedleState = (u32, u32);

#[derive(Debug, Clone, Copy)]
pub struct Needle {
    width: u32,
    branch: u32,
    depth: u32,
    lazy: bool,
}

impl Needle {
    /// `branch` is counted from 1 and must not exceed `width`.
    #[must_use]
    pub fn new(width: u32, branch: u32, depth: u32) -> Self {
        Self {
            width,
            branch,
            depth: depth.max(1),
            lazy: false,
        }
    }

    #[must_use]
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    #[must_use]
    pub fn goal_state(&self) -> NeedleState {
        (self.branch, self.depth)
    }

    /// States in the whole graph, root included.
    #[must_use]
    pub fn state_count(&self) -> u64 {
        1 + u64::from(self.width) * u64::from(self.depth)
    }
}

impl GraphGenerator for Needle {
    type State = NeedleState;
    type Label = u32;

    fn roots(&self) -> Vec<NeedleState> {
        vec![(0, 0)]
    }

    fn successors(&self, &(branch, step): &NeedleState) -> Successors<'_, NeedleState, u32> {
        if branch == 0 {
            let siblings = (1..=self.width).map(|b| ExpansionDescription::new((b, 1), b));
            return if self.lazy {
                Successors::lazy(siblings)
            } else {
                siblings.collect::<Vec<_>>().into()
            };
        }
        if step >= self.depth {
            return Successors::Materialized(Vec::new());
        }
        vec![ExpansionDescription::new((branch, step + 1), 0)].into()
    }

    fn is_goal(&self, state: &NeedleState) -> bool {
        *state == self.goal_state()
    }
}

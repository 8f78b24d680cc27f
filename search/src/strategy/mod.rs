//! Strategy specializations.
//!
//! Each strategy is the same [`crate::search::BestFirst`] engine with a
//! different evaluator and, where the order needs data the plain generator
//! does not carry, a thin generator wrapper that tags each edge label:
//!
//! | Strategy | Wrapper | Value |
//! |---|---|---|
//! | A* | none | `g + h` |
//! | LDS | [`lds::Ranked`] (sibling rank) | [`lds::DiscrepancyVector`] |
//! | Random | [`random::Shuffled`] (random ticket) | [`random::RandomKey`] |
//! | R* | [`rstar::Gamma`] (realized gamma edge) | [`rstar::RStarKey`] |

pub mod astar;
pub mod lds;
pub mod random;
pub mod rstar;

use arbor_kernel::Path;

/// An inner edge label plus strategy data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tagged<L, T> {
    pub label: L,
    pub tag: T,
}

impl<L, T> Tagged<L, T> {
    #[must_use]
    pub fn new(label: L, tag: T) -> Self {
        Self { label, tag }
    }
}

/// Drop the tags from every edge of `path`.
#[must_use]
pub fn strip_tags<S: Clone, L: Clone, T: Clone>(path: &Path<S, Tagged<L, T>>) -> Path<S, L> {
    path.clone().map_labels(|t| t.label)
}

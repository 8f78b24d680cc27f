//! Arbor Kernel: the leaf contracts of the Arbor search engine.
//!
//! # API Surface
//!
//! - [`graph::GraphGenerator`] -- roots, successor streams, goal testing
//! - [`evaluation::NodeEvaluator`] -- scores a path with a totally ordered value
//! - [`path::Path`] -- root-to-node chain exposed to evaluators and callers
//! - [`interrupt::Interrupt`] -- cooperative cancellation token
//! - [`audit`] -- canonical JSON and domain-separated digests for search traces
//!
//! # Module Dependency Direction
//!
//! `path` ← `graph` ← `evaluation`; `audit` and `interrupt` depend on nothing
//! internal. One-way only. No cycles.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod audit;
pub mod evaluation;
pub mod graph;
pub mod interrupt;
pub mod path;

pub use evaluation::{
    ConstantEvaluator, EvaluationError, EvaluationOutcome, FnEvaluator, NodeEvaluator,
};
pub use graph::{ExpansionDescription, GoalTest, GraphGenerator, NodeKind, Successors};
pub use interrupt::Interrupt;
pub use path::Path;

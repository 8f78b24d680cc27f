//! Arbor Harness: reference worlds and run orchestration for the engine.
//!
//! The harness drives engines through the public `arbor_search` API, records
//! their traces and packages the result as a digestible run report. It does
//! NOT implement search logic; worlds provide domain data only.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod runner;
pub mod worlds;

pub use runner::{run_to_completion, RunError, RunReport};

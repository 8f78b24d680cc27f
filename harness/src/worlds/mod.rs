//! Reference worlds.
//!
//! Each world is a [`arbor_kernel::GraphGenerator`] small enough to search
//! exhaustively, with a known answer the lock tests check against.

pub mod explicit_tree;
pub mod grid;
pub mod n_queens;
pub mod needle;

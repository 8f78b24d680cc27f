//! Cooperative cancellation tokens.
//!
//! An [`Interrupt`] is a shared flag. A child token reports raised when it or
//! any ancestor is raised, so a per-evaluation token can be interrupted on its
//! own (timeout) or together with the whole search (cancellation). A token may
//! also carry a deadline, after which it reads as raised.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct Interrupt {
    chain: Vec<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl Interrupt {
    #[must_use]
    pub fn new() -> Self {
        Self {
            chain: vec![Arc::new(AtomicBool::new(false))],
            deadline: None,
        }
    }

    /// A token that is raised with `self` but can also be raised alone.
    #[must_use]
    pub fn child(&self) -> Self {
        let mut chain = self.chain.clone();
        chain.push(Arc::new(AtomicBool::new(false)));
        Self {
            chain,
            deadline: self.deadline,
        }
    }

    /// A child of `self` that is also raised with `other`. Raising the joined
    /// token raises neither source.
    #[must_use]
    pub fn joined(&self, other: &Interrupt) -> Self {
        let mut chain = self.chain.clone();
        chain.extend(other.chain.iter().cloned());
        chain.push(Arc::new(AtomicBool::new(false)));
        let deadline = match (self.deadline, other.deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self { chain, deadline }
    }

    /// A child of `self` that reads as raised from `deadline` on. An earlier
    /// inherited deadline wins.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut child = self.child();
        child.deadline = Some(child.deadline.map_or(deadline, |d| d.min(deadline)));
        child
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the deadline, if any, has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Raise this token (and therefore every child derived from it).
    pub fn raise(&self) {
        if let Some(own) = self.chain.last() {
            own.store(true, Ordering::SeqCst);
        }
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.is_expired() || self.chain.iter().any(|flag| flag.load(Ordering::SeqCst))
    }

    /// Lower this token's own flag. Ancestors are left alone.
    pub fn reset(&self) {
        if let Some(own) = self.chain.last() {
            own.store(false, Ordering::SeqCst);
        }
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

//! Search policy: budgets, timeouts, parallelism and randomization.

use std::time::Duration;

use arbor_kernel::audit::canon::canonical_json_bytes;
use arbor_kernel::audit::hash::{canonical_hash, ContentHash};
use arbor_kernel::audit::hash_domain::HashDomain;
use serde_json::json;

use crate::error::SearchError;

/// Engine configuration shared by every strategy.
///
/// The defaults describe a sequential, unbounded, deterministic search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPolicy {
    /// Whole-search wall clock budget. Expiry moves the engine to `TimedOut`.
    pub global_timeout: Option<Duration>,
    /// Per-evaluation budget. Without a fallback evaluator a timed-out node
    /// is pruned.
    pub evaluation_timeout: Option<Duration>,
    /// Nodes expanded concurrently per step. `1` is sequential.
    pub workers: usize,
    /// Seed for reproducible successor shuffling. `None` keeps generator order.
    pub seed: Option<u64>,
    /// Items drawn from one successor stream per expansion.
    pub max_successors_per_node: Option<usize>,
    /// Expansion cap. Reaching it moves the engine to `BudgetExhausted`.
    pub max_expansions: Option<u64>,
}

impl SearchPolicy {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] for zero workers, zero
    /// timeouts, a zero successor cap or a zero expansion budget.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.workers == 0 {
            return Err(SearchError::invalid("workers must be at least 1"));
        }
        if self.global_timeout == Some(Duration::ZERO) {
            return Err(SearchError::invalid("global_timeout must be positive"));
        }
        if self.evaluation_timeout == Some(Duration::ZERO) {
            return Err(SearchError::invalid("evaluation_timeout must be positive"));
        }
        if self.max_successors_per_node == Some(0) {
            return Err(SearchError::invalid("max_successors_per_node must be positive"));
        }
        if self.max_expansions == Some(0) {
            return Err(SearchError::invalid("max_expansions must be positive"));
        }
        Ok(())
    }

    /// Sequential search with every other field at its default.
    #[must_use]
    pub fn sequential() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_max_expansions(mut self, max_expansions: u64) -> Self {
        self.max_expansions = Some(max_expansions);
        self
    }

    #[must_use]
    pub fn with_global_timeout(mut self, timeout: Duration) -> Self {
        self.global_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_evaluation_timeout(mut self, timeout: Duration) -> Self {
        self.evaluation_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_max_successors_per_node(mut self, cap: usize) -> Self {
        self.max_successors_per_node = Some(cap);
        self
    }

    /// Policy echo for trace headers. Durations are integer milliseconds.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let millis = |d: Option<Duration>| d.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        json!({
            "global_timeout_ms": millis(self.global_timeout),
            "evaluation_timeout_ms": millis(self.evaluation_timeout),
            "workers": self.workers,
            "seed": self.seed,
            "max_successors_per_node": self.max_successors_per_node,
            "max_expansions": self.max_expansions,
        })
    }

    /// Digest of [`to_json`](Self::to_json) under [`HashDomain::SearchPolicy`].
    ///
    /// # Errors
    ///
    /// [`SearchError::Trace`] if canonicalization fails.
    pub fn digest(&self) -> Result<ContentHash, SearchError> {
        let bytes = canonical_json_bytes(&self.to_json())?;
        Ok(canonical_hash(HashDomain::SearchPolicy, &bytes))
    }
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            global_timeout: None,
            evaluation_timeout: None,
            workers: 1,
            seed: None,
            max_successors_per_node: None,
            max_expansions: None,
        }
    }
}

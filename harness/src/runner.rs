//! Harness runner: drives an engine and packages what it did.
//!
//! # Pipeline
//!
//! ```text
//! attach TraceRecorder → [next_solution() × N] → stats + terminal state
//!   → trace canonical JSON → trace digest → report JSON → report digest
//! ```
//!
//! The runner uses only the public engine API. Attach it to a fresh engine:
//! events emitted before the recorder is attached are not in the trace.

use std::fmt::Debug;
use std::sync::Arc;

use arbor_kernel::audit::canon::{canonical_json_bytes, CanonError};
use arbor_kernel::audit::hash::{canonical_hash, ContentHash};
use arbor_kernel::audit::hash_domain::HashDomain;
use arbor_kernel::GraphGenerator;
use arbor_search::{
    BestFirst, EngineState, SearchError, SearchObserver, SearchStats, Solution, TraceRecorder,
};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    #[error("search failed: {0}")]
    Search(#[from] SearchError),
    #[error("report is not canonical: {0}")]
    Canon(#[from] CanonError),
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunReport<S, L, V> {
    pub solutions: Vec<Solution<S, L, V>>,
    /// Engine state when the run stopped. `Running` when `max_solutions` cut it short.
    pub state: EngineState,
    pub stats: SearchStats,
    /// Canonical trace: policy header plus every lifecycle event.
    pub trace: Value,
    pub trace_digest: ContentHash,
}

impl<S: Debug, L: Debug, V: Debug> RunReport<S, L, V> {
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "schema_version": "run_report.v1",
            "state": self.state.as_str(),
            "stats": self.stats.to_json(),
            "solutions": self.solutions.iter().map(Solution::to_json).collect::<Vec<_>>(),
            "trace_digest": self.trace_digest.as_str(),
        })
    }

    /// # Errors
    ///
    /// [`RunError::Canon`] if the report holds a non-integer number.
    pub fn digest(&self) -> Result<ContentHash, RunError> {
        let bytes = canonical_json_bytes(&self.to_json())?;
        Ok(canonical_hash(HashDomain::RunReport, &bytes))
    }
}

/// Pull solutions until the engine terminates or `max_solutions` are found.
///
/// # Errors
///
/// [`RunError::Search`] on a contract violation, [`RunError::Canon`] if the
/// trace cannot be canonicalized.
pub fn run_to_completion<G, V>(
    engine: BestFirst<G, V>,
    max_solutions: Option<usize>,
) -> Result<RunReport<G::State, G::Label, V>, RunError>
where
    G: GraphGenerator,
    V: Ord + Clone + Debug + Send + Sync + 'static,
{
    let policy = engine.policy();
    let recorder = Arc::new(TraceRecorder::with_header(json!({
        "policy": policy.to_json(),
        "policy_digest": policy.digest()?.as_str(),
    })));
    let observer: Arc<dyn SearchObserver<G::State, G::Label, V>> = recorder.clone();
    let mut engine = engine.with_observer(observer);

    let mut solutions = Vec::new();
    while !max_solutions.is_some_and(|max| solutions.len() >= max) {
        match engine.next_solution()? {
            Some(solution) => solutions.push(solution),
            None => break,
        }
    }

    let trace = recorder.to_json();
    let trace_digest = recorder.digest()?;
    tracing::info!(
        state = %engine.state(),
        solutions = solutions.len(),
        trace_digest = %trace_digest,
        "run finished"
    );
    Ok(RunReport {
        solutions,
        state: engine.state(),
        stats: engine.stats(),
        trace,
        trace_digest,
    })
}

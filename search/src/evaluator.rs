//! Guarded node evaluation: panic capture, per-call time budget, fallback.
//!
//! Without a budget the evaluator runs inline on the calling thread. With a
//! budget it runs on a detached helper thread while the caller waits on a
//! channel; on expiry the helper's interrupt token is raised, the fallback
//! evaluator supplies the value, and the search moves on without joining the
//! helper. The wait also ends as soon as the caller's token is raised or its
//! deadline passes.

use std::fmt::Debug;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use arbor_kernel::{EvaluationError, EvaluationOutcome, Interrupt, NodeEvaluator, Path};

/// Type-erased evaluator shared between the engine and helper threads.
pub type SharedEvaluator<S, L, V> = Arc<dyn NodeEvaluator<S, L, Value = V>>;

/// Poll interval while waiting on a budgeted evaluation, so cancellation is
/// noticed before the budget runs out.
const CANCEL_POLL: Duration = Duration::from_millis(5);

/// The search was cancelled while this evaluation ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationCancelled;

/// One finished evaluation.
#[derive(Debug, Clone)]
pub struct Guarded<V> {
    pub outcome: EvaluationOutcome<V>,
    pub elapsed: Duration,
}

pub struct GuardedEvaluator<S, L, V> {
    primary: SharedEvaluator<S, L, V>,
    fallback: Option<SharedEvaluator<S, L, V>>,
    budget: Option<Duration>,
}

impl<S, L, V> Clone for GuardedEvaluator<S, L, V> {
    fn clone(&self) -> Self {
        Self {
            primary: Arc::clone(&self.primary),
            fallback: self.fallback.clone(),
            budget: self.budget,
        }
    }
}

impl<S, L, V> GuardedEvaluator<S, L, V>
where
    S: Clone + Send + Sync + 'static,
    L: Clone + Send + Sync + 'static,
    V: Ord + Clone + Debug + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(
        primary: SharedEvaluator<S, L, V>,
        fallback: Option<SharedEvaluator<S, L, V>>,
        budget: Option<Duration>,
    ) -> Self {
        Self {
            primary,
            fallback,
            budget,
        }
    }

    /// Replace the fallback used on timeout.
    #[must_use]
    pub fn with_fallback(mut self, fallback: SharedEvaluator<S, L, V>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    #[must_use]
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Evaluate `path`, never letting a panic or a timeout escape.
    ///
    /// # Errors
    ///
    /// [`EvaluationCancelled`] when `interrupt` was raised and the evaluation
    /// was abandoned because of it.
    pub fn evaluate(
        &self,
        path: &Path<S, L>,
        interrupt: &Interrupt,
    ) -> Result<Guarded<V>, EvaluationCancelled> {
        let started = Instant::now();
        let outcome = match self.budget {
            None => {
                let result = catch_unwind(AssertUnwindSafe(|| self.primary.evaluate(path, interrupt)));
                settle(result, interrupt)?
            }
            Some(budget) => self.evaluate_with_budget(path, interrupt, budget)?,
        };
        Ok(Guarded {
            outcome,
            elapsed: started.elapsed(),
        })
    }

    fn evaluate_with_budget(
        &self,
        path: &Path<S, L>,
        interrupt: &Interrupt,
        budget: Duration,
    ) -> Result<EvaluationOutcome<V>, EvaluationCancelled> {
        let call = interrupt.child();
        let (sender, receiver) = mpsc::channel();
        let evaluator = Arc::clone(&self.primary);
        let owned = path.clone();
        let token = call.clone();
        let spawned = thread::Builder::new()
            .name("arbor-eval".into())
            .spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(&owned, &token)));
                // The receiver is gone once the caller gave up on us.
                let _ = sender.send(result);
            });
        if let Err(e) = spawned {
            return Ok(EvaluationOutcome::Failed {
                reason: format!("could not start evaluation thread: {e}"),
            });
        }

        let deadline = Instant::now() + budget;
        loop {
            if interrupt.is_raised() {
                call.raise();
                return Err(EvaluationCancelled);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match receiver.recv_timeout(remaining.min(CANCEL_POLL)) {
                Ok(result) => return settle(result, interrupt),
                Err(RecvTimeoutError::Timeout) if remaining.is_zero() => break,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Ok(EvaluationOutcome::Failed {
                        reason: "evaluation thread exited without a result".into(),
                    });
                }
            }
        }

        call.raise();
        tracing::warn!(budget_ms = budget.as_millis(), depth = path.depth(), "evaluation timed out");
        Ok(self.fall_back(path, budget))
    }

    fn fall_back(&self, path: &Path<S, L>, budget: Duration) -> EvaluationOutcome<V> {
        let Some(fallback) = &self.fallback else {
            return EvaluationOutcome::Failed {
                reason: format!("timed out after {budget:?} with no fallback evaluator"),
            };
        };
        // The fallback gets its own token; the primary's is already raised.
        let token = Interrupt::new();
        match catch_unwind(AssertUnwindSafe(|| fallback.evaluate(path, &token))) {
            Ok(Ok(value)) => EvaluationOutcome::TimedOut { fallback: value },
            Ok(Err(e)) => EvaluationOutcome::Failed {
                reason: format!("timed out after {budget:?}; fallback failed: {e}"),
            },
            Err(_) => EvaluationOutcome::Failed {
                reason: format!("timed out after {budget:?}; fallback panicked"),
            },
        }
    }
}

fn settle<V>(
    result: std::thread::Result<Result<V, EvaluationError>>,
    interrupt: &Interrupt,
) -> Result<EvaluationOutcome<V>, EvaluationCancelled> {
    match result {
        Ok(Ok(value)) => Ok(EvaluationOutcome::Value(value)),
        Ok(Err(EvaluationError::Interrupted)) if interrupt.is_raised() => Err(EvaluationCancelled),
        Ok(Err(EvaluationError::Interrupted)) => Ok(EvaluationOutcome::Failed {
            reason: "evaluator reported an interrupt that was never raised".into(),
        }),
        Ok(Err(EvaluationError::Failed { reason })) => Ok(EvaluationOutcome::Failed { reason }),
        Err(_) => Ok(EvaluationOutcome::Failed {
            reason: "evaluator panicked".into(),
        }),
    }
}

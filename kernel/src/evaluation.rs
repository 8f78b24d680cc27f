//! Node evaluator contract and evaluation outcomes.

use std::fmt::Debug;

use crate::interrupt::Interrupt;
use crate::path::Path;

/// What an evaluator may report instead of a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    /// The node cannot be scored. The engine prunes it and continues.
    #[error("evaluation failed: {reason}")]
    Failed { reason: String },
    /// The evaluator observed its interrupt token and gave up.
    #[error("evaluation interrupted")]
    Interrupted,
}

impl EvaluationError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// Result of one guarded evaluation, as recorded by the engine.
///
/// Timeouts are not errors: a timed-out node still receives a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationOutcome<V> {
    Value(V),
    /// The per-call budget expired; the fallback evaluator supplied `fallback`.
    TimedOut { fallback: V },
    /// The node is pruned.
    Failed { reason: String },
}

impl<V> EvaluationOutcome<V> {
    /// The value the node will be ordered by, if it survives.
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        match self {
            Self::Value(v) | Self::TimedOut { fallback: v } => Some(v),
            Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Option<V> {
        match self {
            Self::Value(v) | Self::TimedOut { fallback: v } => Some(v),
            Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Scores a path with a value from one total order (lower is better).
///
/// Evaluations may be slow. Long-running evaluators should poll `interrupt`
/// and return [`EvaluationError::Interrupted`] once it is raised; the engine
/// raises it on per-call timeout and on cancellation.
pub trait NodeEvaluator<S, L>: Send + Sync {
    type Value: Ord + Clone + Debug + Send + Sync + 'static;

    /// # Errors
    ///
    /// [`EvaluationError::Failed`] prunes the node;
    /// [`EvaluationError::Interrupted`] reports a honored interrupt.
    fn evaluate(&self, path: &Path<S, L>, interrupt: &Interrupt)
        -> Result<Self::Value, EvaluationError>;
}

/// Adapts an infallible closure over paths into a [`NodeEvaluator`].
#[derive(Debug, Clone, Copy)]
pub struct FnEvaluator<F>(pub F);

impl<S, L, V, F> NodeEvaluator<S, L> for FnEvaluator<F>
where
    F: Fn(&Path<S, L>) -> V + Send + Sync,
    V: Ord + Clone + Debug + Send + Sync + 'static,
{
    type Value = V;

    fn evaluate(&self, path: &Path<S, L>, _interrupt: &Interrupt) -> Result<V, EvaluationError> {
        Ok((self.0)(path))
    }
}

/// Always answers with one fixed value. The usual timeout fallback
/// (a worst-case penalty).
#[derive(Debug, Clone)]
pub struct ConstantEvaluator<V>(pub V);

impl<S, L, V> NodeEvaluator<S, L> for ConstantEvaluator<V>
where
    V: Ord + Clone + Debug + Send + Sync + 'static,
{
    type Value = V;

    fn evaluate(&self, _path: &Path<S, L>, _interrupt: &Interrupt) -> Result<V, EvaluationError> {
        Ok(self.0.clone())
    }
}

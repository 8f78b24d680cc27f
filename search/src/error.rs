//! Typed search errors.
//!
//! `SearchError` covers policy validation, contract violations and caller
//! interruption. Exhaustion, cancellation, global timeout and budget
//! exhaustion are engine states ([`crate::search::EngineState`]), not errors.

use crate::node::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// A policy or strategy parameter is out of range.
    #[error("invalid search policy: {detail}")]
    InvalidPolicy { detail: String },

    /// The graph generator produced no root states.
    #[error("graph generator produced zero roots")]
    NoRoots,

    /// `|OPEN| + |SUSPENDED|` changed across a repartition.
    #[error("conservation violated by repartition: {before} tracked before, {after} after")]
    ConservationViolated { before: usize, after: usize },

    /// Registry bookkeeping disagrees with node statuses.
    #[error("registry partition inconsistent: {detail}")]
    PartitionInconsistent { detail: String },

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// The operation requires a node on OPEN.
    #[error("node {0} is not on OPEN")]
    NodeNotOpen(NodeId),

    /// The caller's interrupt token was raised while waiting for a solution.
    /// The engine is left resumable.
    #[error("interrupted while waiting for the next solution")]
    Interrupted,

    /// The parallel worker pool could not be started.
    #[error("worker pool unavailable: {detail}")]
    WorkerPool { detail: String },

    /// A graph generator call panicked.
    #[error("graph generator panicked during {stage}")]
    CollaboratorPanicked { stage: &'static str },

    /// Trace export failed.
    #[error("trace export failed: {0}")]
    Trace(#[from] arbor_kernel::audit::canon::CanonError),
}

impl SearchError {
    pub(crate) fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            detail: detail.into(),
        }
    }

    /// Contract violations leave the engine `Failed`; the rest do not.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::NoRoots
                | Self::ConservationViolated { .. }
                | Self::PartitionInconsistent { .. }
                | Self::CollaboratorPanicked { .. }
        )
    }
}

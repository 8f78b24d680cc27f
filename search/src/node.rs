//! Search nodes and the frontier ordering key.

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use arbor_kernel::NodeKind;

/// Arena index of a node. Ids are handed out in creation order, so the id
/// doubles as the creation sequence number used for tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Registry membership. Every node is in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    Open,
    Closed,
    Suspended,
    /// Evaluation failed; never on the frontier.
    Pruned,
}

impl NodeStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Suspended => "suspended",
            Self::Pruned => "pruned",
        }
    }
}

/// Bookkeeping attached to a node at evaluation time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeAnnotations {
    /// Wall time spent producing the value (including any fallback).
    pub evaluation_time: Duration,
    /// The value came from the fallback evaluator.
    pub timed_out: bool,
    /// Why the node was pruned.
    pub failure: Option<String>,
}

/// A node in the search tree.
///
/// The parent link is an arena index; paths are rebuilt by walking it.
/// The value is fixed at insertion and never changes; only `status` moves.
#[derive(Debug, Clone)]
pub struct SearchNode<S, L, V> {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) state: S,
    pub(crate) label: Option<L>,
    pub(crate) kind: NodeKind,
    pub(crate) depth: u32,
    pub(crate) value: Option<V>,
    pub(crate) status: NodeStatus,
    pub(crate) annotations: NodeAnnotations,
}

impl<S, L, V> SearchNode<S, L, V> {
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Label of the edge from the parent; `None` for roots.
    #[must_use]
    pub fn label(&self) -> Option<&L> {
        self.label.as_ref()
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The f-value; `None` only for pruned nodes.
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> NodeStatus {
        self.status
    }

    #[must_use]
    pub fn annotations(&self) -> &NodeAnnotations {
        &self.annotations
    }
}

/// Frontier ordering key: `(value, sequence)`.
///
/// Lower value first; among equal values the older node wins, which gives
/// FIFO fairness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierKey<V> {
    pub value: V,
    pub sequence: NodeId,
}

impl<V: Ord> Ord for FrontierKey<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .cmp(&other.value)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl<V: Ord> PartialOrd for FrontierKey<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

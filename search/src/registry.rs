//! OPEN/CLOSED/SUSPENDED registry.
//!
//! Nodes live in an arena and are never removed while the registry lives.
//! Membership is tracked twice: on the node (`status`) and in the containers
//! (the OPEN heap, the SUSPENDED list, CLOSED counters). [`Registry::check_consistency`]
//! verifies the two views agree and runs after every repartition.
//!
//! A node popped for expansion is *in flight*: off the heap, still `Open`,
//! until it is closed or reopened. Repartitioning with nodes in flight is
//! refused.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashSet};
use std::hash::Hash;
use std::time::Duration;

use arbor_kernel::{EvaluationOutcome, NodeKind, Path};

use crate::error::SearchError;
use crate::node::{FrontierKey, NodeAnnotations, NodeId, NodeStatus, SearchNode};

/// Result of a `set_temporary_root` repartition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Repartition {
    pub temporary_root: Option<NodeId>,
    /// Nodes that moved SUSPENDED → OPEN.
    pub resumed: usize,
    /// Nodes that moved OPEN → SUSPENDED.
    pub suspended: usize,
    /// `|OPEN| + |SUSPENDED|`, identical before and after.
    pub tracked: usize,
}

pub struct Registry<S, L, V> {
    nodes: Vec<SearchNode<S, L, V>>,
    open: BinaryHeap<Reverse<FrontierKey<V>>>,
    suspended: Vec<NodeId>,
    in_flight: BTreeSet<NodeId>,
    closed_count: usize,
    pruned_count: usize,
    closed_states: HashSet<S>,
    temporary_root: Option<NodeId>,
    high_water: usize,
}

impl<S, L, V> Registry<S, L, V>
where
    S: Clone + Eq + Hash,
    L: Clone,
    V: Ord + Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            open: BinaryHeap::new(),
            suspended: Vec::new(),
            in_flight: BTreeSet::new(),
            closed_count: 0,
            pruned_count: 0,
            closed_states: HashSet::new(),
            temporary_root: None,
            high_water: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Insertion and extraction
    // -----------------------------------------------------------------------

    /// Create a node from an evaluation outcome.
    ///
    /// Failed outcomes produce a `Pruned` node. Surviving nodes go to OPEN,
    /// or to SUSPENDED when a temporary root is active and the node is not
    /// below it.
    ///
    /// # Errors
    ///
    /// [`SearchError::UnknownNode`] if `parent` is not in the arena.
    pub fn insert(
        &mut self,
        parent: Option<(NodeId, L)>,
        state: S,
        kind: NodeKind,
        outcome: EvaluationOutcome<V>,
        evaluation_time: Duration,
    ) -> Result<NodeId, SearchError> {
        let id = NodeId::from_index(self.nodes.len());
        let (parent_id, label, depth) = match parent {
            Some((pid, label)) => {
                let p = self.get(pid)?;
                (Some(pid), Some(label), p.depth.saturating_add(1))
            }
            None => (None, None, 0),
        };

        let mut annotations = NodeAnnotations {
            evaluation_time,
            timed_out: outcome.is_timed_out(),
            failure: None,
        };
        let (value, status) = match outcome {
            EvaluationOutcome::Value(v) | EvaluationOutcome::TimedOut { fallback: v } => {
                let eligible = match (self.temporary_root, parent_id) {
                    (None, _) => true,
                    (Some(root), Some(pid)) => self.is_descendant(pid, root),
                    (Some(_), None) => false,
                };
                let status = if eligible {
                    NodeStatus::Open
                } else {
                    NodeStatus::Suspended
                };
                (Some(v), status)
            }
            EvaluationOutcome::Failed { reason } => {
                annotations.failure = Some(reason);
                (None, NodeStatus::Pruned)
            }
        };

        self.nodes.push(SearchNode {
            id,
            parent: parent_id,
            state,
            label,
            kind,
            depth,
            value,
            status,
            annotations,
        });

        match status {
            NodeStatus::Open => self.push_open(id),
            NodeStatus::Suspended => self.suspended.push(id),
            NodeStatus::Pruned => self.pruned_count += 1,
            NodeStatus::Closed => {}
        }
        Ok(id)
    }

    /// Remove the best OPEN node and put it in flight.
    pub fn pop_best(&mut self) -> Option<NodeId> {
        let Reverse(key) = self.open.pop()?;
        self.in_flight.insert(key.sequence);
        Some(key.sequence)
    }

    /// Remove a specific OPEN node and put it in flight.
    ///
    /// # Errors
    ///
    /// [`SearchError::NodeNotOpen`] unless the node is on the OPEN heap.
    pub fn take(&mut self, id: NodeId) -> Result<(), SearchError> {
        if self.get(id)?.status != NodeStatus::Open || self.in_flight.contains(&id) {
            return Err(SearchError::NodeNotOpen(id));
        }
        self.open.retain(|Reverse(k)| k.sequence != id);
        self.in_flight.insert(id);
        Ok(())
    }

    /// Finish an in-flight node: it becomes CLOSED.
    ///
    /// # Errors
    ///
    /// [`SearchError::PartitionInconsistent`] if the node is not in flight.
    pub fn close(&mut self, id: NodeId) -> Result<(), SearchError> {
        self.leave_flight(id)?;
        let node = &mut self.nodes[id.index()];
        node.status = NodeStatus::Closed;
        self.closed_count += 1;
        self.closed_states.insert(node.state.clone());
        Ok(())
    }

    /// Finish an in-flight goal. It becomes CLOSED without counting as an
    /// expansion of its state.
    ///
    /// # Errors
    ///
    /// [`SearchError::PartitionInconsistent`] if the node is not in flight.
    pub fn close_goal(&mut self, id: NodeId) -> Result<(), SearchError> {
        self.leave_flight(id)?;
        self.nodes[id.index()].status = NodeStatus::Closed;
        self.closed_count += 1;
        Ok(())
    }

    /// Return an in-flight node to OPEN with its original key.
    ///
    /// # Errors
    ///
    /// [`SearchError::PartitionInconsistent`] if the node is not in flight.
    pub fn reopen(&mut self, id: NodeId) -> Result<(), SearchError> {
        self.leave_flight(id)?;
        self.push_open(id);
        Ok(())
    }

    fn leave_flight(&mut self, id: NodeId) -> Result<(), SearchError> {
        if self.in_flight.remove(&id) {
            Ok(())
        } else {
            Err(SearchError::PartitionInconsistent {
                detail: format!("{id} is not in flight"),
            })
        }
    }

    fn push_open(&mut self, id: NodeId) {
        let node = &self.nodes[id.index()];
        if let Some(value) = &node.value {
            self.open.push(Reverse(FrontierKey {
                value: value.clone(),
                sequence: id,
            }));
            self.high_water = self.high_water.max(self.open.len());
        }
    }

    // -----------------------------------------------------------------------
    // Enforced exploration
    // -----------------------------------------------------------------------

    /// Restrict the frontier to the subtree below `root` (inclusive).
    ///
    /// Every node on OPEN or SUSPENDED is re-filed: OPEN if its ancestor
    /// chain passes through `root`, SUSPENDED otherwise. Each parent chain is
    /// walked at most once across the whole repartition.
    ///
    /// # Errors
    ///
    /// - [`SearchError::UnknownNode`] for an id outside the arena.
    /// - [`SearchError::PartitionInconsistent`] while nodes are in flight, or
    ///   if the post-repartition consistency check fails.
    /// - [`SearchError::ConservationViolated`] if `|OPEN| + |SUSPENDED|` changed.
    pub fn set_temporary_root(&mut self, root: NodeId) -> Result<Repartition, SearchError> {
        self.get(root)?;
        let mut memo: Vec<Option<bool>> = vec![None; self.nodes.len()];
        memo[root.index()] = Some(true);
        let mut repartition = self.repartition(|registry, id| registry.below(id, &mut memo))?;
        self.temporary_root = Some(root);
        repartition.temporary_root = Some(root);
        Ok(repartition)
    }

    /// Lift any restriction: every SUSPENDED node returns to OPEN.
    ///
    /// # Errors
    ///
    /// Same as [`set_temporary_root`](Self::set_temporary_root).
    pub fn clear_temporary_root(&mut self) -> Result<Repartition, SearchError> {
        let repartition = self.repartition(|_, _| true)?;
        self.temporary_root = None;
        Ok(repartition)
    }

    fn repartition(
        &mut self,
        mut eligible: impl FnMut(&Self, NodeId) -> bool,
    ) -> Result<Repartition, SearchError> {
        if !self.in_flight.is_empty() {
            return Err(SearchError::PartitionInconsistent {
                detail: format!("{} node(s) in flight during repartition", self.in_flight.len()),
            });
        }

        let before = self.open.len() + self.suspended.len();
        let tracked: Vec<NodeId> = self
            .open
            .drain()
            .map(|Reverse(k)| k.sequence)
            .chain(self.suspended.drain(..))
            .collect();

        let mut resumed = 0;
        let mut suspended = 0;
        for id in tracked {
            let was = self.nodes[id.index()].status;
            if eligible(self, id) {
                if was == NodeStatus::Suspended {
                    resumed += 1;
                }
                self.nodes[id.index()].status = NodeStatus::Open;
                self.push_open(id);
            } else {
                if was == NodeStatus::Open {
                    suspended += 1;
                }
                self.nodes[id.index()].status = NodeStatus::Suspended;
                self.suspended.push(id);
            }
        }
        self.suspended.sort_unstable();

        let after = self.open.len() + self.suspended.len();
        if before != after {
            return Err(SearchError::ConservationViolated { before, after });
        }
        self.check_consistency()?;

        Ok(Repartition {
            temporary_root: None,
            resumed,
            suspended,
            tracked: after,
        })
    }

    /// Whether `id` lies below the root already marked `true` in `memo`.
    /// Explicit loop over parent links; every visited node is memoized.
    fn below(&self, id: NodeId, memo: &mut [Option<bool>]) -> bool {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        let verdict = loop {
            let Some(current) = cursor else { break false };
            if let Some(known) = memo[current.index()] {
                break known;
            }
            chain.push(current);
            cursor = self.nodes[current.index()].parent;
        };
        for visited in chain {
            memo[visited.index()] = Some(verdict);
        }
        verdict
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self
                .nodes
                .get(current.index())
                .and_then(|n| n.parent);
        }
        false
    }

    /// Verify that node statuses and container membership agree and that the
    /// four sets are disjoint.
    ///
    /// # Errors
    ///
    /// [`SearchError::PartitionInconsistent`] naming the first disagreement.
    pub fn check_consistency(&self) -> Result<(), SearchError> {
        let inconsistent = |detail: String| Err(SearchError::PartitionInconsistent { detail });

        let mut seen = HashSet::with_capacity(self.open.len() + self.suspended.len());
        for Reverse(key) in &self.open {
            let id = key.sequence;
            if !seen.insert(id) {
                return inconsistent(format!("{id} appears twice on the frontier"));
            }
            if self.nodes[id.index()].status != NodeStatus::Open {
                return inconsistent(format!("{id} on OPEN heap has status {:?}", self.nodes[id.index()].status));
            }
        }
        for &id in &self.suspended {
            if !seen.insert(id) {
                return inconsistent(format!("{id} is both OPEN and SUSPENDED"));
            }
            if self.nodes[id.index()].status != NodeStatus::Suspended {
                return inconsistent(format!("{id} on SUSPENDED has status {:?}", self.nodes[id.index()].status));
            }
        }

        let mut counts = [0usize; 4];
        for node in &self.nodes {
            let slot = match node.status {
                NodeStatus::Open => 0,
                NodeStatus::Closed => 1,
                NodeStatus::Suspended => 2,
                NodeStatus::Pruned => 3,
            };
            counts[slot] += 1;
        }
        let expected = [
            self.open.len() + self.in_flight.len(),
            self.closed_count,
            self.suspended.len(),
            self.pruned_count,
        ];
        if counts != expected {
            return inconsistent(format!(
                "status counts {counts:?} disagree with containers {expected:?}"
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    fn get(&self, id: NodeId) -> Result<&SearchNode<S, L, V>, SearchError> {
        self.nodes.get(id.index()).ok_or(SearchError::UnknownNode(id))
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SearchNode<S, L, V>> {
        self.nodes.get(id.index())
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &SearchNode<S, L, V>> + '_ {
        self.nodes.iter()
    }

    /// Rebuild the root-to-`id` path by walking parent links.
    ///
    /// # Errors
    ///
    /// [`SearchError::UnknownNode`] for an id outside the arena.
    pub fn path(&self, id: NodeId) -> Result<Path<S, L>, SearchError> {
        let mut chain = Vec::new();
        let mut cursor = Some(self.get(id)?);
        while let Some(node) = cursor {
            chain.push(node);
            cursor = node.parent.and_then(|p| self.nodes.get(p.index()));
        }

        let mut nodes = chain.into_iter().rev();
        let Some(root) = nodes.next() else {
            return Err(SearchError::UnknownNode(id));
        };
        let mut path = Path::new(root.state.clone());
        for node in nodes {
            if let Some(label) = &node.label {
                path.push(label.clone(), node.state.clone());
            }
        }
        Ok(path)
    }

    /// Key of the best OPEN node without removing it.
    #[must_use]
    pub fn peek_best(&self) -> Option<&FrontierKey<V>> {
        self.open.peek().map(|Reverse(k)| k)
    }

    /// OPEN ids in frontier order (best first).
    #[must_use]
    pub fn open_ids(&self) -> Vec<NodeId> {
        let mut keys: Vec<&FrontierKey<V>> = self.open.iter().map(|Reverse(k)| k).collect();
        keys.sort();
        keys.into_iter().map(|k| k.sequence).collect()
    }

    /// SUSPENDED ids in creation order.
    #[must_use]
    pub fn suspended_ids(&self) -> &[NodeId] {
        &self.suspended
    }

    #[must_use]
    pub fn is_state_closed(&self, state: &S) -> bool {
        self.closed_states.contains(state)
    }

    #[must_use]
    pub fn temporary_root(&self) -> Option<NodeId> {
        self.temporary_root
    }

    /// Total nodes ever created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn open_len(&self) -> usize {
        self.open.len()
    }

    #[must_use]
    pub fn closed_len(&self) -> usize {
        self.closed_count
    }

    #[must_use]
    pub fn suspended_len(&self) -> usize {
        self.suspended.len()
    }

    #[must_use]
    pub fn pruned_len(&self) -> usize {
        self.pruned_count
    }

    #[must_use]
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Largest OPEN size observed.
    #[must_use]
    pub fn high_water(&self) -> usize {
        self.high_water
    }
}

impl<S, L, V> Default for Registry<S, L, V>
where
    S: Clone + Eq + Hash,
    L: Clone,
    V: Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

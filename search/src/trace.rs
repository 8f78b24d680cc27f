//! Event trace recording and digests.
//!
//! [`TraceRecorder`] is an observer that keeps an ordered event log. The log
//! renders to canonical JSON and hashes under [`HashDomain::SearchTrace`], so
//! two runs can be compared by a single digest. Values are recorded through
//! their `Debug` rendering; canonical JSON carries no floats.

use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard, PoisonError};

use arbor_kernel::audit::canon::canonical_json_bytes;
use arbor_kernel::audit::hash::{canonical_hash, ContentHash};
use arbor_kernel::audit::hash_domain::HashDomain;
use serde_json::{json, Value};

use crate::error::SearchError;
use crate::node::{NodeId, SearchNode};
use crate::observer::SearchObserver;
use crate::registry::Repartition;
use crate::search::EngineState;
use crate::solution::Solution;
use crate::stats::SearchStats;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Started {
        roots: usize,
    },
    Created {
        node: usize,
        parent: Option<usize>,
        depth: u32,
        status: &'static str,
        value: Option<String>,
        timed_out: bool,
    },
    Expanded {
        node: usize,
        children: Vec<usize>,
    },
    Solution {
        node: usize,
        depth: usize,
        value: String,
    },
    Repartition {
        root: Option<usize>,
        resumed: usize,
        suspended: usize,
        tracked: usize,
    },
    Terminated {
        state: &'static str,
        stats: SearchStats,
    },
}

impl TraceEvent {
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Started { roots } => json!({ "event": "started", "roots": roots }),
            Self::Created {
                node,
                parent,
                depth,
                status,
                value,
                timed_out,
            } => json!({
                "event": "created",
                "node": node,
                "parent": parent,
                "depth": depth,
                "status": status,
                "value": value,
                "timed_out": timed_out,
            }),
            Self::Expanded { node, children } => {
                json!({ "event": "expanded", "node": node, "children": children })
            }
            Self::Solution { node, depth, value } => {
                json!({ "event": "solution", "node": node, "depth": depth, "value": value })
            }
            Self::Repartition {
                root,
                resumed,
                suspended,
                tracked,
            } => json!({
                "event": "repartition",
                "root": root,
                "resumed": resumed,
                "suspended": suspended,
                "tracked": tracked,
            }),
            Self::Terminated { state, stats } => {
                json!({ "event": "terminated", "state": state, "stats": stats.to_json() })
            }
        }
    }
}

/// Observer that records every lifecycle event in order.
#[derive(Debug)]
pub struct TraceRecorder {
    header: Value,
    events: Mutex<Vec<TraceEvent>>,
}

impl TraceRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_header(Value::Null)
    }

    /// A recorder whose JSON export carries `header` (e.g. a policy echo).
    #[must_use]
    pub fn with_header(header: Value) -> Self {
        Self {
            header,
            events: Mutex::new(Vec::new()),
        }
    }

    fn log(&self) -> MutexGuard<'_, Vec<TraceEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, event: TraceEvent) {
        self.log().push(event);
    }

    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.log().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.log().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log().is_empty()
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let events: Vec<Value> = self.log().iter().map(TraceEvent::to_json).collect();
        json!({ "header": self.header, "events": events })
    }

    /// # Errors
    ///
    /// [`SearchError::Trace`] if the header holds a non-integer number.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, SearchError> {
        Ok(canonical_json_bytes(&self.to_json())?)
    }

    /// # Errors
    ///
    /// [`SearchError::Trace`] if the header holds a non-integer number.
    pub fn digest(&self) -> Result<ContentHash, SearchError> {
        Ok(canonical_hash(HashDomain::SearchTrace, &self.to_canonical_bytes()?))
    }
}

impl Default for TraceRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, L, V: Debug> SearchObserver<S, L, V> for TraceRecorder {
    fn name(&self) -> &str {
        "trace-recorder"
    }

    fn on_search_started(&self, roots: usize) {
        self.record(TraceEvent::Started { roots });
    }

    fn on_node_created(&self, node: &SearchNode<S, L, V>) {
        self.record(TraceEvent::Created {
            node: node.id().index(),
            parent: node.parent().map(NodeId::index),
            depth: node.depth(),
            status: node.status().as_str(),
            value: node.value().map(|v| format!("{v:?}")),
            timed_out: node.annotations().timed_out,
        });
    }

    fn on_node_expanded(&self, node: NodeId, children: &[NodeId]) {
        self.record(TraceEvent::Expanded {
            node: node.index(),
            children: children.iter().map(|c| c.index()).collect(),
        });
    }

    fn on_solution_found(&self, solution: &Solution<S, L, V>) {
        self.record(TraceEvent::Solution {
            node: solution.node().index(),
            depth: solution.path().depth(),
            value: format!("{:?}", solution.value()),
        });
    }

    fn on_repartition(&self, repartition: &Repartition) {
        self.record(TraceEvent::Repartition {
            root: repartition.temporary_root.map(NodeId::index),
            resumed: repartition.resumed,
            suspended: repartition.suspended,
            tracked: repartition.tracked,
        });
    }

    fn on_search_terminated(&self, state: EngineState, stats: &SearchStats) {
        self.record(TraceEvent::Terminated {
            state: state.as_str(),
            stats: *stats,
        });
    }
}

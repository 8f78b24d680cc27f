//! Solutions yielded by the engine.

use std::fmt::Debug;

use arbor_kernel::audit::canon::canonical_json_bytes;
use arbor_kernel::audit::hash::{canonical_hash, ContentHash};
use arbor_kernel::audit::hash_domain::HashDomain;
use arbor_kernel::Path;
use serde_json::json;

use crate::error::SearchError;
use crate::node::NodeId;

/// A root-to-goal path and the goal node's f-value. Immutable once yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution<S, L, V> {
    node: NodeId,
    path: Path<S, L>,
    value: V,
}

impl<S, L, V> Solution<S, L, V> {
    #[must_use]
    pub fn new(node: NodeId, path: Path<S, L>, value: V) -> Self {
        Self { node, path, value }
    }

    /// The goal node in the registry that produced this solution.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn path(&self) -> &Path<S, L> {
        &self.path
    }

    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[must_use]
    pub fn goal(&self) -> &S {
        self.path.head()
    }

    #[must_use]
    pub fn into_path(self) -> Path<S, L> {
        self.path
    }

    #[must_use]
    pub fn map_labels<M>(self, f: impl FnMut(L) -> M) -> Solution<S, M, V> {
        Solution {
            node: self.node,
            path: self.path.map_labels(f),
            value: self.value,
        }
    }
}

impl<S: Debug, L: Debug, V: Debug> Solution<S, L, V> {
    /// JSON view with states, labels and value rendered through `Debug`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let steps: Vec<serde_json::Value> = self
            .path
            .steps()
            .map(|(state, label)| {
                json!({
                    "state": format!("{state:?}"),
                    "label": label.map(|l| format!("{l:?}")),
                })
            })
            .collect();
        json!({
            "node": self.node.index(),
            "steps": steps,
            "value": format!("{:?}", self.value),
        })
    }

    /// # Errors
    ///
    /// [`SearchError::Trace`] if canonicalization fails.
    pub fn digest(&self) -> Result<ContentHash, SearchError> {
        let bytes = canonical_json_bytes(&self.to_json())?;
        Ok(canonical_hash(HashDomain::Solution, &bytes))
    }
}

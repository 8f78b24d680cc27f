//! Search counters.

/// Counters maintained by the engine. Cheap to copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Nodes created, roots included, pruned nodes included.
    pub created: u64,
    pub expanded: u64,
    pub pruned: u64,
    /// Evaluations answered by the fallback evaluator.
    pub timed_out: u64,
    pub solutions: u64,
    /// Largest OPEN size observed.
    pub open_high_water: usize,
}

impl SearchStats {
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "created": self.created,
            "expanded": self.expanded,
            "pruned": self.pruned,
            "timed_out": self.timed_out,
            "solutions": self.solutions,
            "open_high_water": self.open_high_water,
        })
    }
}

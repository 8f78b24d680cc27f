//! `ExplicitTree`: a hand-written labeled graph.
//!
//! Nodes are names, edges are `(from, label, to)` triples. Used for the
//! enforced-exploration scenario and for order-independence checks, where the
//! same graph is consumed with successor lists reversed.

use std::collections::{BTreeMap, BTreeSet};

use arbor_kernel::{ExpansionDescription, GraphGenerator, Successors};

#[derive(Debug, Clone, Default)]
pub struct ExplicitTree {
    roots: Vec<String>,
    edges: BTreeMap<String, Vec<(String, String)>>,
    goals: BTreeSet<String>,
    reversed: bool,
    lazy: bool,
}

impl ExplicitTree {
    #[must_use]
    pub fn new(root: &str) -> Self {
        Self {
            roots: vec![root.to_owned()],
            ..Self::default()
        }
    }

    /// A, with children B and C; B with children D and E.
    #[must_use]
    pub fn abcde() -> Self {
        Self::new("A")
            .edge("A", "ab", "B")
            .edge("A", "ac", "C")
            .edge("B", "bd", "D")
            .edge("B", "be", "E")
    }

    #[must_use]
    pub fn edge(mut self, from: &str, label: &str, to: &str) -> Self {
        self.edges
            .entry(from.to_owned())
            .or_default()
            .push((label.to_owned(), to.to_owned()));
        self
    }

    #[must_use]
    pub fn goal(mut self, name: &str) -> Self {
        self.goals.insert(name.to_owned());
        self
    }

    /// Hand out every successor list back to front.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.reversed = !self.reversed;
        self
    }

    /// Hand out successors as lazy streams.
    #[must_use]
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }
}

impl GraphGenerator for ExplicitTree {
    type State = String;
    type Label = String;

    fn roots(&self) -> Vec<String> {
        self.roots.clone()
    }

    fn successors(&self, state: &String) -> Successors<'_, String, String> {
        let Some(out) = self.edges.get(state) else {
            return Successors::Materialized(Vec::new());
        };
        let describe = |(label, to): &(String, String)| ExpansionDescription::new(to.clone(), label.clone());
        match (self.lazy, self.reversed) {
            (true, true) => Successors::lazy(out.iter().rev().map(describe)),
            (true, false) => Successors::lazy(out.iter().map(describe)),
            (false, true) => out.iter().rev().map(describe).collect::<Vec<_>>().into(),
            (false, false) => out.iter().map(describe).collect::<Vec<_>>().into(),
        }
    }

    fn is_goal(&self, state: &String) -> bool {
        self.goals.contains(state)
    }
}

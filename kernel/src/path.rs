//! Root-to-node paths.
//!
//! A path is never stored on a node; the search registry rebuilds one on
//! demand by walking parent links. The type is non-empty by construction:
//! it always holds its root state.

/// Ordered `(state, incoming label)` chain from a root to some node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path<S, L> {
    root: S,
    steps: Vec<(L, S)>,
}

impl<S, L> Path<S, L> {
    /// A single-state path.
    #[must_use]
    pub fn new(root: S) -> Self {
        Self {
            root,
            steps: Vec::new(),
        }
    }

    /// Append an edge `label` leading to `state`.
    pub fn push(&mut self, label: L, state: S) {
        self.steps.push((label, state));
    }

    /// Number of edges on the path (the depth of its head node).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    /// Number of states on the path. Always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len() + 1
    }

    /// Always `false`; a path holds at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub fn root(&self) -> &S {
        &self.root
    }

    /// The last state on the path.
    #[must_use]
    pub fn head(&self) -> &S {
        self.steps.last().map_or(&self.root, |(_, s)| s)
    }

    /// The label of the edge into the head, `None` for a root-only path.
    #[must_use]
    pub fn last_label(&self) -> Option<&L> {
        self.steps.last().map(|(l, _)| l)
    }

    /// States from root to head.
    pub fn states(&self) -> impl Iterator<Item = &S> + '_ {
        std::iter::once(&self.root).chain(self.steps.iter().map(|(_, s)| s))
    }

    /// Edge labels from root to head.
    pub fn labels(&self) -> impl Iterator<Item = &L> + '_ {
        self.steps.iter().map(|(l, _)| l)
    }

    /// `(state, incoming label)` pairs; the root has no incoming label.
    pub fn steps(&self) -> impl Iterator<Item = (&S, Option<&L>)> + '_ {
        std::iter::once((&self.root, None)).chain(self.steps.iter().map(|(l, s)| (s, Some(l))))
    }

    /// `(from, label, to)` triples for every edge.
    pub fn edges(&self) -> impl Iterator<Item = (&S, &L, &S)> + '_ {
        self.states()
            .zip(self.steps.iter())
            .map(|(from, (label, to))| (from, label, to))
    }

    /// Replace every label through `f`, keeping the states.
    #[must_use]
    pub fn map_labels<M>(self, mut f: impl FnMut(L) -> M) -> Path<S, M> {
        Path {
            root: self.root,
            steps: self.steps.into_iter().map(|(l, s)| (f(l), s)).collect(),
        }
    }

    /// Append every edge of `segment`, whose root is taken to be this path's head.
    pub fn extend_with(&mut self, segment: Path<S, L>) {
        self.steps.extend(segment.steps);
    }

    /// Decompose into the root and its `(label, state)` steps.
    #[must_use]
    pub fn into_parts(self) -> (S, Vec<(L, S)>) {
        (self.root, self.steps)
    }
}

impl<S: Clone, L: Clone> Path<S, L> {
    /// A copy of this path extended by one edge.
    #[must_use]
    pub fn extended(&self, label: L, state: S) -> Self {
        let mut next = self.clone();
        next.push(label, state);
        next
    }
}

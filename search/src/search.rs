//! Best-first engine: pop → goal test → expand → evaluate → insert.
//!
//! # State machine
//!
//! ```text
//! Initialized → Running → { Exhausted | Cancelled | TimedOut | BudgetExhausted | Failed }
//! ```
//!
//! Solutions are pulled one at a time; between pulls the engine is idle in
//! `Running`. Terminal states are sticky. Only contract violations are errors
//! (the engine is then `Failed` and keeps returning the same error).
//!
//! # Parallel expansion
//!
//! With `workers > 1` each step pops up to `workers` nodes and expands them on
//! the engine's rayon pool, built once with `workers` threads. Workers touch
//! the registry only to rebuild their node's path; all mutations happen on the
//! driving thread, in pop order, so the registry sees the same sequence of
//! operations on every run.
//!
//! # Interruption
//!
//! Every step hands its evaluations one token joining the cancel switch, the
//! caller's interrupt and the global deadline. Work abandoned because of it
//! goes back to OPEN; the cause decides between `Cancelled`, `TimedOut` and
//! [`SearchError::Interrupted`].
//!
//! # Enforced exploration
//!
//! A temporary root confines expansion to its subtree. Once that subtree has
//! nothing left on OPEN the root is lifted automatically and the suspended
//! frontier resumes, so restricting the search never ends it early.

use std::collections::VecDeque;
use std::fmt::{self, Debug};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use arbor_kernel::{
    ExpansionDescription, GoalTest, GraphGenerator, Interrupt, NodeEvaluator, Path,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::SearchError;
use crate::evaluator::{EvaluationCancelled, Guarded, GuardedEvaluator, SharedEvaluator};
use crate::node::{NodeId, NodeStatus, SearchNode};
use crate::observer::SearchObserver;
use crate::policy::SearchPolicy;
use crate::registry::{Registry, Repartition};
use crate::solution::Solution;
use crate::stats::SearchStats;

/// Engine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    Initialized,
    Running,
    /// OPEN ran empty.
    Exhausted,
    /// Stopped through the [`CancelHandle`].
    Cancelled,
    /// The global timeout expired. Registry contents are preserved.
    TimedOut,
    /// `max_expansions` was reached.
    BudgetExhausted,
    /// A contract violation; see [`BestFirst::failure`].
    Failed,
}

impl EngineState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Initialized | Self::Running)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Exhausted => "exhausted",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed_out",
            Self::BudgetExhausted => "budget_exhausted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One expanded node and what came of its successors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub node: NodeId,
    /// Children that entered OPEN (or SUSPENDED).
    pub children: Vec<NodeId>,
    /// Children whose evaluation failed.
    pub pruned: Vec<NodeId>,
}

/// What a single [`BestFirst::step`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome<S, L, V> {
    Expanded(Vec<Expansion>),
    Solution(Solution<S, L, V>),
    Terminated(EngineState),
}

/// Cooperative stop switch for a running engine. Clone it into other threads.
#[derive(Debug, Clone)]
pub struct CancelHandle(Interrupt);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.raise();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.is_raised()
    }
}

type ExpandResult<S, L, V> = Result<Vec<(ExpansionDescription<S, L>, Guarded<V>)>, ExpandFailure>;

enum ExpandFailure {
    /// The step's interrupt was raised mid-expansion.
    Abandoned,
    Panicked(&'static str),
    Registry(SearchError),
}

struct Job {
    node: NodeId,
    seed: Option<u64>,
}

/// Outcome of applying one batch of expansion results.
struct Applied {
    expansions: Vec<Expansion>,
    abandoned: bool,
    failure: Option<SearchError>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The best-first search engine, generic over its graph generator `G` and
/// value order `V`. Strategies are configurations of this one type.
pub struct BestFirst<G: GraphGenerator, V> {
    generator: G,
    evaluator: GuardedEvaluator<G::State, G::Label, V>,
    policy: SearchPolicy,
    registry: Mutex<Registry<G::State, G::Label, V>>,
    observers: Vec<Arc<dyn SearchObserver<G::State, G::Label, V>>>,
    state: EngineState,
    failure: Option<SearchError>,
    cancel: Interrupt,
    pool: Option<ThreadPool>,
    rng: Option<ChaCha8Rng>,
    pending_goals: VecDeque<NodeId>,
    forced: Option<NodeId>,
    deadline: Option<Instant>,
    stats: SearchStats,
}

impl<G, V> BestFirst<G, V>
where
    G: GraphGenerator,
    V: Ord + Clone + Debug + Send + Sync + 'static,
{
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// [`SearchError::InvalidPolicy`] if `policy` fails validation;
    /// [`SearchError::WorkerPool`] if the worker threads cannot be started.
    pub fn new<E>(generator: G, evaluator: E, policy: SearchPolicy) -> Result<Self, SearchError>
    where
        E: NodeEvaluator<G::State, G::Label, Value = V> + 'static,
    {
        Self::from_shared(generator, Arc::new(evaluator), policy)
    }

    /// Like [`new`](Self::new) with an evaluator already behind an `Arc`.
    ///
    /// # Errors
    ///
    /// As [`new`](Self::new).
    pub fn from_shared(
        generator: G,
        evaluator: SharedEvaluator<G::State, G::Label, V>,
        policy: SearchPolicy,
    ) -> Result<Self, SearchError> {
        policy.validate()?;
        let pool = if policy.workers > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(policy.workers)
                .thread_name(|i| format!("arbor-worker-{i}"))
                .build()
                .map_err(|e| SearchError::WorkerPool {
                    detail: e.to_string(),
                })?;
            Some(pool)
        } else {
            None
        };
        Ok(Self {
            generator,
            evaluator: GuardedEvaluator::new(evaluator, None, policy.evaluation_timeout),
            policy,
            registry: Mutex::new(Registry::new()),
            observers: Vec::new(),
            state: EngineState::Initialized,
            failure: None,
            cancel: Interrupt::new(),
            pool,
            rng: None,
            pending_goals: VecDeque::new(),
            forced: None,
            deadline: None,
            stats: SearchStats::default(),
        })
    }

    /// Evaluator consulted when a call exceeds `evaluation_timeout`. Without
    /// one, timed-out nodes are pruned.
    #[must_use]
    pub fn with_timeout_fallback<F>(mut self, fallback: F) -> Self
    where
        F: NodeEvaluator<G::State, G::Label, Value = V> + 'static,
    {
        self.evaluator = self.evaluator.with_fallback(Arc::new(fallback));
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver<G::State, G::Label, V>>) -> Self {
        self.observers.push(observer);
        self
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The contract violation that moved the engine to `Failed`.
    #[must_use]
    pub fn failure(&self) -> Option<&SearchError> {
        self.failure.as_ref()
    }

    #[must_use]
    pub fn stats(&self) -> SearchStats {
        let mut stats = self.stats;
        stats.open_high_water = lock(&self.registry).high_water();
        stats
    }

    #[must_use]
    pub fn policy(&self) -> &SearchPolicy {
        &self.policy
    }

    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(self.cancel.clone())
    }

    /// Run `f` against the registry under its lock.
    pub fn with_registry<R>(&self, f: impl FnOnce(&Registry<G::State, G::Label, V>) -> R) -> R {
        f(&lock(&self.registry))
    }

    /// A copy of one node, for callers that do not want to hold the lock.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<SearchNode<G::State, G::Label, V>> {
        lock(&self.registry).node(id).cloned()
    }

    /// # Errors
    ///
    /// [`SearchError::UnknownNode`] for an id outside the registry.
    pub fn path(&self, id: NodeId) -> Result<Path<G::State, G::Label>, SearchError> {
        lock(&self.registry).path(id)
    }

    /// Whether a node wrapping `state` has been expanded.
    #[must_use]
    pub fn is_state_closed(&self, state: &G::State) -> bool {
        lock(&self.registry).is_state_closed(state)
    }

    // -----------------------------------------------------------------------
    // Solution iteration
    // -----------------------------------------------------------------------

    /// Run until the next solution or a terminal state.
    ///
    /// `Ok(None)` means the engine is in a terminal state; see [`state`](Self::state).
    ///
    /// # Errors
    ///
    /// A contract violation. The engine is `Failed` afterwards.
    pub fn next_solution(&mut self) -> Result<Option<Solution<G::State, G::Label, V>>, SearchError> {
        self.next_solution_inner(None)
    }

    /// [`next_solution`](Self::next_solution) that gives up when `interrupt` is raised.
    ///
    /// # Errors
    ///
    /// [`SearchError::Interrupted`] when `interrupt` is raised, between steps or
    /// during an evaluation that honors it. Abandoned nodes return to OPEN;
    /// the engine stays `Running` and can be resumed. Otherwise as
    /// [`next_solution`](Self::next_solution).
    pub fn next_solution_interruptible(
        &mut self,
        interrupt: &Interrupt,
    ) -> Result<Option<Solution<G::State, G::Label, V>>, SearchError> {
        self.next_solution_inner(Some(interrupt))
    }

    fn next_solution_inner(
        &mut self,
        caller: Option<&Interrupt>,
    ) -> Result<Option<Solution<G::State, G::Label, V>>, SearchError> {
        loop {
            match self.step_inner(caller)? {
                StepOutcome::Solution(solution) => return Ok(Some(solution)),
                StepOutcome::Terminated(_) => return Ok(None),
                StepOutcome::Expanded(_) => {}
            }
        }
    }

    /// Pull solutions until the best one found so far is no worse than every
    /// node left on OPEN, then return it. Returns the best found if the engine
    /// terminates first, `None` if it found nothing.
    ///
    /// # Errors
    ///
    /// As [`next_solution`](Self::next_solution).
    pub fn next_solution_that_dominates_open(
        &mut self,
    ) -> Result<Option<Solution<G::State, G::Label, V>>, SearchError> {
        let mut best: Option<Solution<G::State, G::Label, V>> = None;
        loop {
            if let Some(found) = &best {
                let open_dominated = match lock(&self.registry).peek_best() {
                    Some(key) => found.value() <= &key.value,
                    None => true,
                };
                if open_dominated && self.pending_goals.is_empty() && self.forced.is_none() {
                    return Ok(best);
                }
            }
            match self.next_solution()? {
                Some(solution) => match &best {
                    Some(b) if b.value() <= solution.value() => {}
                    _ => best = Some(solution),
                },
                None => return Ok(best),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Perform one unit of work: yield a pending solution, or pop and expand
    /// one batch, or report a terminal state.
    ///
    /// # Errors
    ///
    /// A contract violation. The engine is `Failed` afterwards.
    pub fn step(&mut self) -> Result<StepOutcome<G::State, G::Label, V>, SearchError> {
        self.step_inner(None)
    }

    fn step_inner(
        &mut self,
        caller: Option<&Interrupt>,
    ) -> Result<StepOutcome<G::State, G::Label, V>, SearchError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        if self.state == EngineState::Initialized {
            self.initialize()?;
        }
        if self.state.is_terminal() {
            return Ok(StepOutcome::Terminated(self.state));
        }

        if let Some(goal) = self.pending_goals.pop_front() {
            return self.yield_solution(goal).map(StepOutcome::Solution);
        }
        if caller.is_some_and(Interrupt::is_raised) {
            return Err(SearchError::Interrupted);
        }
        if let Some(state) = self.stop_reason() {
            return Ok(self.terminate(state));
        }
        let (open, suspended) = {
            let registry = lock(&self.registry);
            (registry.open_len(), registry.suspended_len())
        };
        if self.forced.is_none() && open == 0 {
            if suspended == 0 {
                return Ok(self.terminate(EngineState::Exhausted));
            }
            // The temporary root's subtree is done; the rest of the frontier resumes.
            tracing::debug!(suspended, "temporary root exhausted, lifting it");
            self.repartition(Registry::clear_temporary_root)?;
        }
        let remaining = match self.policy.max_expansions {
            Some(max) if self.stats.expanded >= max => {
                return Ok(self.terminate(EngineState::BudgetExhausted));
            }
            Some(max) => usize::try_from(max - self.stats.expanded).unwrap_or(usize::MAX),
            None => usize::MAX,
        };

        let jobs = self.pop_batch(self.policy.workers.min(remaining))?;
        if jobs.is_empty() {
            return match self.pending_goals.pop_front() {
                Some(goal) => self.yield_solution(goal).map(StepOutcome::Solution),
                None => Ok(self.terminate(EngineState::Exhausted)),
            };
        }

        let interrupt = self.step_interrupt(caller);
        let results = self.run_jobs(&jobs, &interrupt);
        let applied = self.apply_in_pop_order(&jobs, results);
        let expansions = match applied {
            Ok(Applied {
                expansions,
                abandoned,
                failure: None,
            }) => {
                if abandoned {
                    return match self.stop_reason() {
                        Some(state) => Ok(self.terminate(state)),
                        None => Err(SearchError::Interrupted),
                    };
                }
                expansions
            }
            Ok(Applied {
                failure: Some(error),
                ..
            })
            | Err(error) => return Err(self.fail(error)),
        };
        if self.state.is_terminal() {
            return Ok(StepOutcome::Terminated(self.state));
        }
        Ok(StepOutcome::Expanded(expansions))
    }

    /// The terminal state the engine's own switches call for, if any.
    fn stop_reason(&self) -> Option<EngineState> {
        if self.cancel.is_raised() {
            Some(EngineState::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(EngineState::TimedOut)
        } else {
            None
        }
    }

    /// Token for one step's evaluations: raised by cancellation, by the
    /// caller's interrupt and by the global deadline.
    fn step_interrupt(&self, caller: Option<&Interrupt>) -> Interrupt {
        let token = match caller {
            Some(caller) => self.cancel.joined(caller),
            None => self.cancel.child(),
        };
        match self.deadline {
            Some(deadline) => token.with_deadline(deadline),
            None => token,
        }
    }

    fn initialize(&mut self) -> Result<(), SearchError> {
        let roots = match catch_unwind(AssertUnwindSafe(|| self.generator.roots())) {
            Ok(roots) => roots,
            Err(_) => return Err(self.fail(SearchError::CollaboratorPanicked { stage: "roots" })),
        };
        if roots.is_empty() {
            return Err(self.fail(SearchError::NoRoots));
        }

        self.deadline = self.policy.global_timeout.map(|t| Instant::now() + t);
        self.rng = self.policy.seed.map(ChaCha8Rng::seed_from_u64);
        self.state = EngineState::Running;
        tracing::info!(
            roots = roots.len(),
            workers = self.policy.workers,
            seed = ?self.policy.seed,
            "search started"
        );
        for observer in &self.observers {
            observer.on_search_started(roots.len());
        }

        let interrupt = self.step_interrupt(None);
        for root in roots {
            let path = Path::new(root.clone());
            let Ok(guarded) = self.evaluator.evaluate(&path, &interrupt) else {
                self.terminate(self.stop_reason().unwrap_or(EngineState::Cancelled));
                return Ok(());
            };
            let mut registry = lock(&self.registry);
            let inserted = registry.insert(
                None,
                root,
                arbor_kernel::NodeKind::Or,
                guarded.outcome,
                guarded.elapsed,
            );
            match inserted {
                Ok(id) => Self::record_created(&mut self.stats, &self.observers, &registry, id),
                Err(error) => {
                    drop(registry);
                    return Err(self.fail(error));
                }
            }
        }
        Ok(())
    }

    /// Pop up to `limit` nodes. A goal popped first is closed and queued for
    /// yielding; a goal popped behind other nodes goes back to OPEN until
    /// their children are in, so solutions surface in frontier order.
    ///
    /// On error every node popped so far is back on OPEN and the engine is
    /// `Failed`.
    fn pop_batch(&mut self, limit: usize) -> Result<Vec<Job>, SearchError> {
        let mut jobs = Vec::new();
        let popped = self.pop_into(&mut jobs, limit);
        let Err(error) = popped else {
            return Ok(jobs);
        };
        let mut registry = lock(&self.registry);
        for job in &jobs {
            // Already failing; a second error would say nothing new.
            let _ = registry.reopen(job.node);
        }
        drop(registry);
        Err(self.fail(error))
    }

    fn pop_into(&mut self, jobs: &mut Vec<Job>, limit: usize) -> Result<(), SearchError> {
        let mut registry = lock(&self.registry);
        while jobs.len() < limit {
            let Some(id) = self.forced.take().or_else(|| registry.pop_best()) else {
                break;
            };

            let goal = match self.generator.goal_test() {
                GoalTest::State => {
                    let Some(node) = registry.node(id) else {
                        return Err(SearchError::UnknownNode(id));
                    };
                    catch_unwind(AssertUnwindSafe(|| self.generator.is_goal(node.state())))
                }
                GoalTest::Path => {
                    let path = registry.path(id)?;
                    catch_unwind(AssertUnwindSafe(|| self.generator.is_goal_path(&path)))
                }
            };
            let Ok(goal) = goal else {
                registry.reopen(id)?;
                return Err(SearchError::CollaboratorPanicked { stage: "goal test" });
            };

            if goal && !jobs.is_empty() {
                // Nodes popped ahead of it may still lead somewhere better.
                registry.reopen(id)?;
                break;
            }
            if goal {
                registry.close_goal(id)?;
                self.pending_goals.push_back(id);
                break;
            }
            let seed = self.rng.as_mut().map(|rng| rng.gen::<u64>());
            jobs.push(Job { node: id, seed });
        }
        Ok(())
    }

    fn run_jobs(&self, jobs: &[Job], interrupt: &Interrupt) -> Vec<ExpandResult<G::State, G::Label, V>> {
        match &self.pool {
            Some(pool) if jobs.len() > 1 => pool.install(|| {
                jobs.par_iter()
                    .map(|job| {
                        catch_unwind(AssertUnwindSafe(|| self.expand(job, interrupt)))
                            .unwrap_or_else(|_| Err(ExpandFailure::Panicked("expansion")))
                    })
                    .collect::<Vec<_>>()
            }),
            _ => jobs.iter().map(|job| self.expand(job, interrupt)).collect(),
        }
    }

    /// Successor generation and child evaluation for one node. Runs outside
    /// the registry lock except for rebuilding the node's path.
    fn expand(&self, job: &Job, interrupt: &Interrupt) -> ExpandResult<G::State, G::Label, V> {
        let path = lock(&self.registry)
            .path(job.node)
            .map_err(ExpandFailure::Registry)?;
        let cap = self.policy.max_successors_per_node;

        let descriptions = catch_unwind(AssertUnwindSafe(|| match job.seed {
            Some(seed) => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                self.generator
                    .successors_randomized(path.head(), &mut rng)
                    .collect_capped(cap)
            }
            None => self.generator.successors(path.head()).collect_capped(cap),
        }))
        .map_err(|_| ExpandFailure::Panicked("successor generation"))?;

        let mut children = Vec::with_capacity(descriptions.len());
        for description in descriptions {
            if interrupt.is_raised() {
                return Err(ExpandFailure::Abandoned);
            }
            let child = path.extended(description.label.clone(), description.state.clone());
            let guarded = self
                .evaluator
                .evaluate(&child, interrupt)
                .map_err(|EvaluationCancelled| ExpandFailure::Abandoned)?;
            children.push((description, guarded));
        }
        Ok(children)
    }

    /// Insert results in pop order. Abandoned jobs put their node back on
    /// OPEN. Registry errors are returned for the caller to fail on.
    fn apply_in_pop_order(
        &mut self,
        jobs: &[Job],
        results: Vec<ExpandResult<G::State, G::Label, V>>,
    ) -> Result<Applied, SearchError> {
        let mut applied = Applied {
            expansions: Vec::with_capacity(jobs.len()),
            abandoned: false,
            failure: None,
        };

        let mut registry = lock(&self.registry);
        for (job, result) in jobs.iter().zip(results) {
            let children = match result {
                Ok(children) => children,
                Err(ExpandFailure::Abandoned) => {
                    registry.reopen(job.node)?;
                    applied.abandoned = true;
                    continue;
                }
                Err(ExpandFailure::Panicked(stage)) => {
                    registry.reopen(job.node)?;
                    if applied.failure.is_none() {
                        applied.failure = Some(SearchError::CollaboratorPanicked { stage });
                    }
                    continue;
                }
                Err(ExpandFailure::Registry(e)) => {
                    registry.reopen(job.node)?;
                    if applied.failure.is_none() {
                        applied.failure = Some(e);
                    }
                    continue;
                }
            };

            let mut expansion = Expansion {
                node: job.node,
                children: Vec::new(),
                pruned: Vec::new(),
            };
            for (description, guarded) in children {
                if guarded.outcome.is_timed_out() {
                    self.stats.timed_out += 1;
                }
                let id = registry.insert(
                    Some((job.node, description.label)),
                    description.state,
                    description.kind,
                    guarded.outcome,
                    guarded.elapsed,
                )?;
                Self::record_created(&mut self.stats, &self.observers, &registry, id);
                if registry.node(id).map(SearchNode::status) == Some(NodeStatus::Pruned) {
                    expansion.pruned.push(id);
                } else {
                    expansion.children.push(id);
                }
            }
            registry.close(job.node)?;
            self.stats.expanded += 1;
            tracing::debug!(
                node = %job.node,
                children = expansion.children.len(),
                pruned = expansion.pruned.len(),
                "node expanded"
            );
            for observer in &self.observers {
                observer.on_node_expanded(job.node, &expansion.children);
            }
            applied.expansions.push(expansion);
        }
        Ok(applied)
    }

    fn record_created(
        stats: &mut SearchStats,
        observers: &[Arc<dyn SearchObserver<G::State, G::Label, V>>],
        registry: &Registry<G::State, G::Label, V>,
        id: NodeId,
    ) {
        let Some(node) = registry.node(id) else { return };
        stats.created += 1;
        if node.status() == NodeStatus::Pruned {
            stats.pruned += 1;
            tracing::warn!(
                node = %id,
                reason = node.annotations().failure.as_deref().unwrap_or(""),
                "node pruned"
            );
        } else {
            tracing::trace!(node = %id, depth = node.depth(), value = ?node.value(), "node created");
        }
        for observer in observers {
            observer.on_node_created(node);
        }
    }

    fn yield_solution(
        &mut self,
        goal: NodeId,
    ) -> Result<Solution<G::State, G::Label, V>, SearchError> {
        let found = {
            let registry = lock(&self.registry);
            registry.path(goal).and_then(|path| {
                match registry.node(goal).and_then(|n| n.value().cloned()) {
                    Some(value) => Ok((path, value)),
                    None => Err(SearchError::PartitionInconsistent {
                        detail: format!("goal {goal} has no value"),
                    }),
                }
            })
        };
        let (path, value) = match found {
            Ok(found) => found,
            Err(error) => return Err(self.fail(error)),
        };

        let solution = Solution::new(goal, path, value);
        self.stats.solutions += 1;
        tracing::info!(
            node = %goal,
            depth = solution.path().depth(),
            value = ?solution.value(),
            "solution found"
        );
        for observer in &self.observers {
            observer.on_solution_found(&solution);
        }
        Ok(solution)
    }

    fn terminate(&mut self, state: EngineState) -> StepOutcome<G::State, G::Label, V> {
        self.state = state;
        let stats = self.stats();
        tracing::info!(
            state = %state,
            expanded = stats.expanded,
            created = stats.created,
            solutions = stats.solutions,
            "search terminated"
        );
        for observer in &self.observers {
            observer.on_search_terminated(state, &stats);
        }
        StepOutcome::Terminated(state)
    }

    /// Move to `Failed`. Only the first failure is recorded and announced.
    fn fail(&mut self, error: SearchError) -> SearchError {
        if self.failure.is_none() {
            tracing::error!(error = %error, "search failed");
            self.failure = Some(error.clone());
            self.terminate(EngineState::Failed);
        }
        error
    }

    // -----------------------------------------------------------------------
    // Enforced exploration and external selection
    // -----------------------------------------------------------------------

    /// Restrict expansion to the subtree below `root`; see
    /// [`Registry::set_temporary_root`]. A pending forced selection is
    /// released back to OPEN first.
    ///
    /// # Errors
    ///
    /// [`SearchError::UnknownNode`] leaves the engine untouched; a
    /// conservation or consistency breach moves it to `Failed`.
    pub fn set_temporary_root(&mut self, root: NodeId) -> Result<Repartition, SearchError> {
        self.repartition(|registry| registry.set_temporary_root(root))
    }

    /// Lift any temporary root; every SUSPENDED node returns to OPEN.
    ///
    /// # Errors
    ///
    /// As [`set_temporary_root`](Self::set_temporary_root).
    pub fn clear_temporary_root(&mut self) -> Result<Repartition, SearchError> {
        self.repartition(Registry::clear_temporary_root)
    }

    fn repartition(
        &mut self,
        apply: impl FnOnce(
            &mut Registry<G::State, G::Label, V>,
        ) -> Result<Repartition, SearchError>,
    ) -> Result<Repartition, SearchError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        if self.state == EngineState::Initialized {
            self.initialize()?;
        }

        let mut registry = lock(&self.registry);
        if let Some(forced) = self.forced.take() {
            registry.reopen(forced)?;
        }
        match apply(&mut registry) {
            Ok(repartition) => {
                drop(registry);
                tracing::debug!(
                    root = ?repartition.temporary_root,
                    resumed = repartition.resumed,
                    suspended = repartition.suspended,
                    tracked = repartition.tracked,
                    "frontier repartitioned"
                );
                for observer in &self.observers {
                    observer.on_repartition(&repartition);
                }
                Ok(repartition)
            }
            Err(error) if error.is_contract_violation() => {
                drop(registry);
                Err(self.fail(error))
            }
            Err(error) => Err(error),
        }
    }

    /// Make `id` the next node expanded, ahead of frontier order.
    ///
    /// # Errors
    ///
    /// [`SearchError::NodeNotOpen`] unless `id` is on OPEN;
    /// [`SearchError::UnknownNode`] for an id outside the registry.
    pub fn select_node_for_next_expansion(&mut self, id: NodeId) -> Result<(), SearchError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        if self.state == EngineState::Initialized {
            self.initialize()?;
        }
        let mut registry = lock(&self.registry);
        if self.forced == Some(id) {
            return Ok(());
        }
        registry.take(id)?;
        if let Some(previous) = self.forced.replace(id) {
            registry.reopen(previous)?;
        }
        Ok(())
    }
}

impl<G, V> Iterator for BestFirst<G, V>
where
    G: GraphGenerator,
    V: Ord + Clone + Debug + Send + Sync + 'static,
{
    type Item = Solution<G::State, G::Label, V>;

    /// Solutions until a terminal state. Contract violations end the
    /// iteration; inspect [`BestFirst::failure`] afterwards.
    fn next(&mut self) -> Option<Self::Item> {
        self.next_solution().ok().flatten()
    }
}

impl<G: GraphGenerator, V> Debug for BestFirst<G, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BestFirst")
            .field("state", &self.state)
            .field("policy", &self.policy)
            .field("stats", &self.stats)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

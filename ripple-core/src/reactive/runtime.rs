//! Reactive Runtime
//!
//! The runtime is the context object that owns one dependency graph and its
//! scheduler. Every cell, reader and observer belongs to exactly one runtime.
//!
//! # How It Works
//!
//! 1. Creating a cell or attaching an edge registers a node in the runtime's
//!    arena.
//!
//! 2. When a cell's value changes, the runtime:
//!    a. Marks the cell as fired for the current round (once only)
//!    b. Queues its dependents with their current heights
//!    c. Drains the queue, highest edge first
//!
//! 3. Writes made while a round is draining only add to its queue. The whole
//!    cascade settles before the outermost `write` returns.
//!
//! # Threading
//!
//! The runtime is single-threaded. It is built on `Rc` and `RefCell`, so it is
//! neither `Send` nor `Sync` and callers cannot share it across threads.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::collection::ArrayWithHistory;
use crate::error::{EngineError, Result};
use crate::graph::{FireAction, Graph, Height, NodeId, NodeKind, NotifyFn, ReadFn, Scheduler};

use super::cell::Cell;
use super::input::Input;

/// Tuning knobs for a runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum number of edges a single round may fire.
    ///
    /// `None` leaves rounds unbounded, so a cyclic graph never terminates.
    /// With a limit, the offending round is aborted and the outermost write
    /// reports [`EngineError::CycleDetected`].
    pub fire_limit: Option<usize>,
}

impl RuntimeConfig {
    /// Abort any round that fires more than `limit` edges.
    #[must_use]
    pub fn with_fire_limit(mut self, limit: usize) -> Self {
        self.fire_limit = Some(limit);
        self
    }
}

/// Counters describing a runtime's activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Propagation rounds completed.
    pub rounds: u64,
    /// Edges fired across all rounds.
    pub edges_fired: u64,
    /// Live cells in the graph.
    pub cells: usize,
    /// Live readers in the graph.
    pub readers: usize,
    /// Live observers in the graph.
    pub observers: usize,
    /// Every live node: cells, readers and observers together.
    pub live_nodes: usize,
}

struct RuntimeInner {
    config: RuntimeConfig,
    graph: RefCell<Graph>,
    scheduler: RefCell<Scheduler>,
}

/// Handle to a dependency graph and its scheduler.
///
/// Cloning a runtime yields another handle to the same graph.
///
/// # Example
///
/// ```rust
/// use ripple_core::Runtime;
///
/// let runtime = Runtime::new();
/// let celsius = runtime.cell(20.0_f64);
/// let fahrenheit = celsius.map(|c| c * 9.0 / 5.0 + 32.0);
///
/// celsius.write(100.0);
/// assert_eq!(fahrenheit.get(), 212.0);
/// ```
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with an explicit configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                graph: RefCell::new(Graph::new()),
                scheduler: RefCell::new(Scheduler::new()),
            }),
        }
    }

    /// The configuration this runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Create a cell whose cutoff uses `PartialEq`.
    pub fn cell<A>(&self, value: A) -> Cell<A>
    where
        A: Clone + PartialEq + 'static,
    {
        Cell::new(self, value, |a: &A, b: &A| a == b, false)
    }

    /// Create a cell with a custom equality used for cutoff.
    pub fn cell_with_eq<A, E>(&self, value: A, eq: E) -> Cell<A>
    where
        A: Clone + 'static,
        E: Fn(&A, &A) -> bool + 'static,
    {
        Cell::new(self, value, eq, false)
    }

    /// Create a cell that can never be written and never fires.
    pub fn constant<A>(&self, value: A) -> Cell<A>
    where
        A: Clone + PartialEq + 'static,
    {
        Cell::new(self, value, |a: &A, b: &A| a == b, true)
    }

    /// Create an input: a cell with a read-modify-write helper.
    pub fn input<A>(&self, value: A) -> Input<A>
    where
        A: Clone + PartialEq + 'static,
    {
        Input::new(self.cell(value))
    }

    /// Create an incremental collection seeded with `initial`.
    pub fn array<A>(&self, initial: Vec<A>) -> ArrayWithHistory<A>
    where
        A: Clone + 'static,
    {
        ArrayWithHistory::new(self, initial)
    }

    /// Whether a propagation round is currently draining.
    pub fn in_round(&self) -> bool {
        self.inner.scheduler.borrow().is_processing()
    }

    /// Snapshot of the runtime's counters.
    pub fn stats(&self) -> RuntimeStats {
        let scheduler = self.inner.scheduler.borrow();
        let graph = self.inner.graph.borrow();
        RuntimeStats {
            rounds: scheduler.rounds(),
            edges_fired: scheduler.edges_fired(),
            cells: graph.count(NodeKind::Cell),
            readers: graph.count(NodeKind::Reader),
            observers: graph.count(NodeKind::Observer),
            live_nodes: graph.len(),
        }
    }

    /// Whether two handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Graph registration
    // ------------------------------------------------------------------

    pub(crate) fn register_cell(&self) -> NodeId {
        self.inner.graph.borrow_mut().add_cell()
    }

    /// Evaluate `read` once to find its first target, then register it as a
    /// dependent of `source`.
    pub(crate) fn attach_reader(&self, source: NodeId, read: ReadFn) -> NodeId {
        let target = (read.borrow_mut())();
        let id = self.inner.graph.borrow_mut().add_reader(source, target, read);
        trace!(reader = %id, %source, %target, "reader attached");
        id
    }

    /// Run `notify` once, then register it as a dependent of `source`.
    pub(crate) fn attach_observer(&self, source: NodeId, notify: NotifyFn) -> NodeId {
        (notify.borrow_mut())();
        let id = self.inner.graph.borrow_mut().add_observer(source, notify);
        trace!(observer = %id, %source, "observer attached");
        id
    }

    /// Remove a node from the graph.
    ///
    /// The node's closures are dropped only after the graph borrow is
    /// released, because they may own cells that remove their own nodes.
    pub(crate) fn detach(&self, id: NodeId) {
        let removed = self.inner.graph.borrow_mut().remove(id);
        if removed.is_some() {
            debug!(node = %id, "node detached");
        }
        drop(removed);
    }

    pub(crate) fn height(&self, id: NodeId) -> Height {
        self.inner.graph.borrow().height(id)
    }

    pub(crate) fn dependent_count(&self, id: NodeId) -> usize {
        self.inner.graph.borrow().dependent_count(id)
    }

    // ------------------------------------------------------------------
    // Propagation
    // ------------------------------------------------------------------

    /// Queue the dependents of a cell whose value just changed and drive the
    /// scheduler.
    ///
    /// A cell that already fired this round does not queue again; its
    /// dependents are still pending and will read the newest value.
    pub(crate) fn cell_changed(&self, cell: NodeId) -> Result<()> {
        let batch: SmallVec<[(NodeId, Height); 4]> = {
            let mut graph = self.inner.graph.borrow_mut();
            let Some(dependents) = graph.mark_fired(cell) else {
                trace!(%cell, "cell already fired this round");
                return Ok(());
            };
            dependents
                .into_iter()
                .map(|edge| (edge, graph.height(edge)))
                .collect()
        };

        {
            let mut scheduler = self.inner.scheduler.borrow_mut();
            scheduler.record_fired_cell(cell);
            for (edge, height) in &batch {
                trace!(%cell, %edge, %height, "enqueue edge");
            }
            scheduler.enqueue(batch);
        }

        self.process()
    }

    /// Drain the worklist, unless a round is already draining.
    fn process(&self) -> Result<()> {
        if !self.inner.scheduler.borrow_mut().begin_round() {
            return Ok(());
        }
        let round = RoundGuard { runtime: self };
        debug!("propagation round started");
        let outcome = self.drain();
        drop(round);
        outcome
    }

    fn drain(&self) -> Result<()> {
        loop {
            let (next, fired) = {
                let mut scheduler = self.inner.scheduler.borrow_mut();
                (scheduler.pop_next(), scheduler.fired_this_round())
            };
            let Some((edge, height)) = next else {
                return Ok(());
            };

            if let Some(limit) = self.inner.config.fire_limit {
                if fired > limit {
                    warn!(fired, limit, "propagation round aborted by fire limit");
                    return Err(EngineError::CycleDetected { fired, limit });
                }
            }

            let action = self.inner.graph.borrow().fire_action(edge);
            match action {
                Some(FireAction::Read(read)) => {
                    trace!(reader = %edge, %height, "fire reader");
                    let target = (read.borrow_mut())();
                    self.inner.graph.borrow_mut().retarget(edge, target);
                }
                Some(FireAction::Notify(notify)) => {
                    trace!(observer = %edge, %height, "fire observer");
                    (notify.borrow_mut())();
                }
                None => trace!(node = %edge, "skip detached edge"),
            }
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .field("nodes", &self.inner.graph.borrow().len())
            .field("in_round", &self.in_round())
            .finish()
    }
}

/// Ends the round when dropped, even if an edge panicked.
struct RoundGuard<'a> {
    runtime: &'a Runtime,
}

impl Drop for RoundGuard<'_> {
    fn drop(&mut self) {
        let inner = &self.runtime.inner;
        let (fired, edges) = {
            let mut scheduler = inner.scheduler.borrow_mut();
            let edges = scheduler.fired_this_round();
            (scheduler.finish_round(), edges)
        };
        inner.graph.borrow_mut().clear_fired(&fired);
        debug!(cells = fired.len(), edges, "propagation round finished");
    }
}

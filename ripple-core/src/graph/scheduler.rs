//! Propagation Scheduler
//!
//! The scheduler holds the worklist for one propagation round.
//!
//! # Algorithm
//!
//! 1. A cell that changes enqueues its direct dependents, each paired with its
//!    height at that moment, and the pending list is re-sorted ascending.
//! 2. The round pops from the end of the list, so the highest edge fires first.
//! 3. An edge reachable along several paths is fired at most once per round;
//!    later pops of the same id are skipped.
//! 4. Firing an edge may write more cells, which enqueue into the same list.
//!    Nested rounds never start: [`Scheduler::begin_round`] refuses while one
//!    is draining.
//! 5. When the list is empty the round ends and every per-round record is
//!    cleared, including the list of cells that fired.
//!
//! Firing the far-from-sink edges first is what keeps the graph glitch-free:
//! no edge runs while an edge that could still change its inputs is pending.

use std::collections::HashSet;

use super::height::Height;
use super::node::NodeId;

/// Height-ordered worklist and per-round bookkeeping.
#[derive(Debug, Default)]
pub struct Scheduler {
    /// Pending edges, kept sorted ascending by height.
    pending: Vec<(NodeId, Height)>,

    /// Edges already fired in the current round.
    processed: HashSet<NodeId>,

    /// Cells that fired in the current round and must be reset when it ends.
    fired_cells: Vec<NodeId>,

    /// Whether a round is currently draining.
    processing: bool,

    /// Edges fired so far in the current round.
    fired_this_round: usize,

    /// Rounds completed over the scheduler's lifetime.
    rounds: u64,

    /// Edges fired over the scheduler's lifetime.
    edges_fired: u64,
}

impl Scheduler {
    /// Create an idle scheduler with an empty worklist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add edges with their current heights and re-sort the worklist.
    ///
    /// The sort is stable, so edges of equal height keep their relative
    /// enqueue order.
    pub fn enqueue<I>(&mut self, edges: I)
    where
        I: IntoIterator<Item = (NodeId, Height)>,
    {
        self.pending.extend(edges);
        self.pending.sort_by_key(|(_, height)| *height);
    }

    /// Start a round.
    ///
    /// Returns `false` if a round is already draining; the caller must then
    /// leave the queued work to the running round.
    pub fn begin_round(&mut self) -> bool {
        if self.processing {
            return false;
        }
        self.processing = true;
        self.fired_this_round = 0;
        true
    }

    /// Whether a round is currently draining.
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Pop the highest pending edge that has not fired yet this round.
    ///
    /// The edge is recorded as processed before it is returned, along with
    /// the height it was enqueued at.
    pub fn pop_next(&mut self) -> Option<(NodeId, Height)> {
        while let Some((id, height)) = self.pending.pop() {
            if self.processed.insert(id) {
                self.fired_this_round += 1;
                self.edges_fired += 1;
                return Some((id, height));
            }
        }
        None
    }

    /// Remember a cell whose fired flag must be cleared at the end of the round.
    pub fn record_fired_cell(&mut self, cell: NodeId) {
        self.fired_cells.push(cell);
    }

    /// End the round and hand back the cells whose fired flags need resetting.
    ///
    /// Any work still pending is discarded; on a normal finish the list is
    /// already empty.
    pub fn finish_round(&mut self) -> Vec<NodeId> {
        self.pending.clear();
        self.processed.clear();
        self.processing = false;
        self.rounds += 1;
        std::mem::take(&mut self.fired_cells)
    }

    /// Number of edges waiting to fire.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Edges fired so far in the current round.
    pub fn fired_this_round(&self) -> usize {
        self.fired_this_round
    }

    /// Rounds completed over the scheduler's lifetime.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Edges fired over the scheduler's lifetime.
    pub fn edges_fired(&self) -> u64 {
        self.edges_fired
    }
}

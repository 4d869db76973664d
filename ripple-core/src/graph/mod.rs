//! Dependency Graph
//!
//! This module implements the propagation network's bookkeeping: node
//! heights, the node arena, and the height-ordered scheduler.
//!
//! # Overview
//!
//! The graph is a directed acyclic graph where:
//!
//! - Cell nodes hold values
//! - Reader nodes are edges from a cell to the node they currently feed
//! - Observer nodes are terminal edges that run side effects
//!
//! A node's height is its distance from the nearest observer. When a cell
//! changes, its dependents are queued by height and drained greatest first,
//! which is enough to rule out glitches without a global topological sort.
//!
//! # Design Decisions
//!
//! 1. Nodes live in an arena owned by one runtime and are addressed by
//!    [`NodeId`]. Dependent sets hold ids, so there are no ownership cycles
//!    between a cell and the edges that read it.
//!
//! 2. Heights are recomputed on demand from the current graph shape. A reader
//!    that rebinds to a new target reports its new height the next time it is
//!    queued.
//!
//! 3. The graph is not checked for cycles. A cyclic graph never drains unless
//!    the runtime is configured with a fire limit.

mod height;
mod node;
mod scheduler;

pub use height::Height;
pub use node::{NodeId, NodeKind};
pub use scheduler::Scheduler;

pub(crate) use node::{FireAction, Graph, NotifyFn, ReadFn};

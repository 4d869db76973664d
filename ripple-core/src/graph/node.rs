//! Graph Nodes
//!
//! This module defines the node arena that backs a runtime's dependency graph.
//! Cells, readers and observers all live here, addressed by [`NodeId`].
//! Dependent sets store ids rather than owning pointers, so a cell never keeps
//! the edges that read it alive.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use super::height::Height;

/// Unique identifier for a node in the dependency graph.
///
/// Ids are handed out by a runtime's graph and are never reused, so a stale
/// id simply fails to resolve once its node has been removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A value holder. Its height is one above its highest dependent.
    Cell,

    /// A rebindable edge. Its height is one above its current target.
    Reader,

    /// A terminal edge running a side effect. Always at [`Height::MIN`].
    Observer,
}

/// Closure re-evaluated each time a reader fires; returns the new target.
pub(crate) type ReadFn = Rc<RefCell<dyn FnMut() -> NodeId>>;

/// Callback run each time an observer fires.
pub(crate) type NotifyFn = Rc<RefCell<dyn FnMut()>>;

/// Dependents collected when a cell fires.
pub(crate) type Dependents = SmallVec<[NodeId; 4]>;

/// A node in the dependency graph.
pub(crate) enum Node {
    Cell {
        /// Readers and observers registered on this cell, in registration order.
        dependents: IndexSet<NodeId>,
        /// Set once the cell has enqueued its dependents in the current round.
        fired: bool,
    },
    Reader {
        /// The cell whose dependent set holds this reader.
        source: NodeId,
        /// The node the last evaluation bound to.
        target: NodeId,
        read: ReadFn,
    },
    Observer {
        source: NodeId,
        notify: NotifyFn,
    },
}

impl Node {
    fn kind(&self) -> NodeKind {
        match self {
            Node::Cell { .. } => NodeKind::Cell,
            Node::Reader { .. } => NodeKind::Reader,
            Node::Observer { .. } => NodeKind::Observer,
        }
    }

    /// The cell this edge is registered on, if this node is an edge.
    fn source(&self) -> Option<NodeId> {
        match self {
            Node::Cell { .. } => None,
            Node::Reader { source, .. } | Node::Observer { source, .. } => Some(*source),
        }
    }
}

/// What the scheduler should run for a dequeued edge.
pub(crate) enum FireAction {
    Read(ReadFn),
    Notify(NotifyFn),
}

/// Arena of every live node belonging to one runtime.
///
/// Arena order carries no meaning, so removal swaps the last node into the
/// freed slot. Dependent sets keep registration order.
pub(crate) struct Graph {
    nodes: IndexMap<NodeId, Node>,
    next_id: u64,
}

impl Graph {
    pub(crate) fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            next_id: 0,
        }
    }

    fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a cell node with no dependents.
    pub(crate) fn add_cell(&mut self) -> NodeId {
        let id = self.allocate();
        self.nodes.insert(
            id,
            Node::Cell {
                dependents: IndexSet::new(),
                fired: false,
            },
        );
        id
    }

    /// Add a reader registered on `source`, currently bound to `target`.
    pub(crate) fn add_reader(&mut self, source: NodeId, target: NodeId, read: ReadFn) -> NodeId {
        let id = self.allocate();
        self.nodes.insert(id, Node::Reader { source, target, read });
        self.link(source, id);
        id
    }

    /// Add an observer registered on `source`.
    pub(crate) fn add_observer(&mut self, source: NodeId, notify: NotifyFn) -> NodeId {
        let id = self.allocate();
        self.nodes.insert(id, Node::Observer { source, notify });
        self.link(source, id);
        id
    }

    fn link(&mut self, source: NodeId, edge: NodeId) {
        if let Some(Node::Cell { dependents, .. }) = self.nodes.get_mut(&source) {
            dependents.insert(edge);
        }
    }

    /// Remove a node, unlinking it from its source cell.
    ///
    /// The removed node is handed back so the caller can drop its closures
    /// after releasing the graph borrow; closures may own cells whose own
    /// teardown needs the graph again.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.swap_remove(&id)?;
        if let Some(source) = node.source() {
            if let Some(Node::Cell { dependents, .. }) = self.nodes.get_mut(&source) {
                dependents.shift_remove(&id);
            }
        }
        Some(node)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[cfg(test)]
    pub(crate) fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&id).map(Node::kind)
    }

    /// Compute a node's height from the current shape of the graph.
    ///
    /// Unknown ids report [`Height::MIN`]; this only happens transiently while
    /// a reader is rebinding.
    pub(crate) fn height(&self, id: NodeId) -> Height {
        match self.nodes.get(&id) {
            Some(Node::Cell { dependents, .. }) => dependents
                .iter()
                .map(|dependent| self.height(*dependent))
                .collect::<Height>()
                .incremented(),
            Some(Node::Reader { target, .. }) => self.height(*target).incremented(),
            Some(Node::Observer { .. }) | None => Height::MIN,
        }
    }

    /// Mark a cell as fired for this round.
    ///
    /// Returns its dependents, or `None` if the cell already fired this round.
    pub(crate) fn mark_fired(&mut self, id: NodeId) -> Option<Dependents> {
        match self.nodes.get_mut(&id) {
            Some(Node::Cell { dependents, fired }) => {
                if *fired {
                    None
                } else {
                    *fired = true;
                    Some(dependents.iter().copied().collect())
                }
            }
            _ => None,
        }
    }

    /// Return fired cells to the not-yet-fired state.
    pub(crate) fn clear_fired(&mut self, cells: &[NodeId]) {
        for id in cells {
            if let Some(Node::Cell { fired, .. }) = self.nodes.get_mut(id) {
                *fired = false;
            }
        }
    }

    pub(crate) fn fire_action(&self, id: NodeId) -> Option<FireAction> {
        match self.nodes.get(&id)? {
            Node::Cell { .. } => None,
            Node::Reader { read, .. } => Some(FireAction::Read(Rc::clone(read))),
            Node::Observer { notify, .. } => Some(FireAction::Notify(Rc::clone(notify))),
        }
    }

    /// Adopt a reader's new target after it fired.
    pub(crate) fn retarget(&mut self, id: NodeId, new_target: NodeId) {
        if let Some(Node::Reader { target, .. }) = self.nodes.get_mut(&id) {
            *target = new_target;
        }
    }

    pub(crate) fn dependent_count(&self, id: NodeId) -> usize {
        match self.nodes.get(&id) {
            Some(Node::Cell { dependents, .. }) => dependents.len(),
            _ => 0,
        }
    }

    /// Count live nodes of the given kind.
    pub(crate) fn count(&self, kind: NodeKind) -> usize {
        self.nodes.values().filter(|node| node.kind() == kind).count()
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader_to(target: NodeId) -> ReadFn {
        Rc::new(RefCell::new(move || target))
    }

    fn silent() -> NotifyFn {
        Rc::new(RefCell::new(|| {}))
    }

    #[test]
    fn node_ids_are_unique() {
        let mut graph = Graph::new();
        let a = graph.add_cell();
        let b = graph.add_cell();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "#0");
    }

    #[test]
    fn lone_cell_sits_one_above_min() {
        let mut graph = Graph::new();
        let cell = graph.add_cell();
        assert_eq!(graph.height(cell), Height::MIN.incremented());
    }

    #[test]
    fn heights_follow_reader_chains() {
        // source -> reader -> derived -> observer
        let mut graph = Graph::new();
        let source = graph.add_cell();
        let derived = graph.add_cell();
        let observer = graph.add_observer(derived, silent());
        let reader = graph.add_reader(source, derived, reader_to(derived));

        assert_eq!(graph.height(observer), Height::new(0));
        assert_eq!(graph.height(derived), Height::new(1));
        assert_eq!(graph.height(reader), Height::new(2));
        assert_eq!(graph.height(source), Height::new(3));
    }

    #[test]
    fn cell_height_tracks_its_highest_dependent() {
        let mut graph = Graph::new();
        let source = graph.add_cell();
        let near = graph.add_cell();
        let far = graph.add_cell();
        let far_next = graph.add_cell();
        graph.add_reader(far, far_next, reader_to(far_next));

        graph.add_reader(source, near, reader_to(near));
        let to_far = graph.add_reader(source, far, reader_to(far));
        assert_eq!(graph.height(source), Height::new(5));

        graph.remove(to_far);
        assert_eq!(graph.height(source), Height::new(3));
    }

    #[test]
    fn removing_an_edge_unlinks_it() {
        let mut graph = Graph::new();
        let cell = graph.add_cell();
        let observer = graph.add_observer(cell, silent());
        assert_eq!(graph.dependent_count(cell), 1);

        assert!(graph.remove(observer).is_some());
        assert_eq!(graph.dependent_count(cell), 0);
        assert!(!graph.contains(observer));
        assert!(graph.remove(observer).is_none());
    }

    #[test]
    fn removal_keeps_the_rest_of_the_arena_intact() {
        let mut graph = Graph::new();
        let first = graph.add_cell();
        let cells: Vec<NodeId> = (0..100).map(|_| graph.add_cell()).collect();
        let last = cells[cells.len() - 1];
        let readers: Vec<NodeId> = cells
            .windows(2)
            .map(|pair| graph.add_reader(pair[0], pair[1], reader_to(pair[1])))
            .collect();
        let observer = graph.add_observer(last, silent());
        let keep = graph.add_observer(first, silent());
        let dropped = graph.add_observer(first, silent());

        // Removing early nodes moves later ones around in the arena.
        assert!(graph.remove(first).is_some());
        assert!(graph.remove(readers[0]).is_some());
        assert!(graph.remove(dropped).is_some());

        assert_eq!(graph.len(), 100 + 98 + 2);
        assert!(graph.contains(keep));
        assert_eq!(graph.kind(observer), Some(NodeKind::Observer));
        assert_eq!(graph.dependent_count(cells[0]), 0);
        assert_eq!(graph.dependent_count(cells[1]), 1);
        assert_eq!(graph.height(cells[1]), Height::new(197));
        assert_eq!(graph.height(last), Height::new(1));
    }

    #[test]
    fn cells_fire_once_until_cleared() {
        let mut graph = Graph::new();
        let cell = graph.add_cell();
        let observer = graph.add_observer(cell, silent());

        let dependents = graph.mark_fired(cell).unwrap();
        assert_eq!(dependents.as_slice(), &[observer]);
        assert!(graph.mark_fired(cell).is_none());

        graph.clear_fired(&[cell]);
        assert!(graph.mark_fired(cell).is_some());
    }

    #[test]
    fn retarget_changes_reader_height() {
        let mut graph = Graph::new();
        let source = graph.add_cell();
        let low = graph.add_cell();
        let high = graph.add_cell();
        let above = graph.add_cell();
        graph.add_reader(high, above, reader_to(above));

        let reader = graph.add_reader(source, low, reader_to(low));
        assert_eq!(graph.height(reader), Height::new(2));

        graph.retarget(reader, high);
        assert_eq!(graph.height(reader), Height::new(4));
    }

    #[test]
    fn counts_nodes_by_kind() {
        let mut graph = Graph::new();
        let cell = graph.add_cell();
        graph.add_observer(cell, silent());
        graph.add_observer(cell, silent());

        assert_eq!(graph.count(NodeKind::Cell), 1);
        assert_eq!(graph.count(NodeKind::Observer), 2);
        assert_eq!(graph.count(NodeKind::Reader), 0);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.kind(cell), Some(NodeKind::Cell));
    }
}

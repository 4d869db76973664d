//! Cell Implementation
//!
//! A Cell is the fundamental reactive primitive. It holds a value, an equality
//! used for cutoff, and a node in its runtime's graph listing the edges that
//! depend on it.
//!
//! # How Cells Work
//!
//! 1. Writing a value equal to the stored one does nothing.
//!
//! 2. Writing a different value stores it and, unless the cell already fired
//!    in the current round, queues every dependent edge.
//!
//! 3. Derived cells (`map`, `flat_map`, `zip2`, ...) are fed by a reader that
//!    writes into them, so their own cutoff decides whether propagation
//!    continues past them.
//!
//! # Ownership
//!
//! A derived cell owns the edges that feed it. Dropping the last handle to a
//! derived cell detaches its reader, which in turn releases the upstream
//! cells the reader was holding. Upstream cells never keep their dependents
//! alive.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::error;

use crate::error::{EngineError, Result};
use crate::graph::{Height, NodeId};

use super::disposable::Disposable;
use super::observer::Observer;
use super::reader::Reader;
use super::runtime::Runtime;

type EqFn<A> = Rc<dyn Fn(&A, &A) -> bool>;

struct CellState<A> {
    /// This cell's node in the runtime's graph.
    id: NodeId,

    runtime: Runtime,

    /// The current value. `None` until the first write.
    value: RefCell<Option<A>>,

    /// Equality used for cutoff.
    eq: EqFn<A>,

    /// Constant cells reject writes and never fire.
    constant: bool,

    /// Subscriptions feeding this cell. Released when the cell is dropped.
    upstream: RefCell<SmallVec<[Disposable; 1]>>,
}

impl<A> Drop for CellState<A> {
    fn drop(&mut self) {
        // Tear down the feeding edges before the node itself.
        self.upstream.get_mut().clear();
        self.runtime.detach(self.id);
    }
}

/// A time-varying value in the dependency graph.
///
/// Cloning a cell yields another handle to the same value.
///
/// # Example
///
/// ```rust
/// use ripple_core::Runtime;
///
/// let runtime = Runtime::new();
/// let count = runtime.cell(1);
/// let label = count.map(|n| format!("{n} items"));
///
/// count.write(3);
/// assert_eq!(label.get(), "3 items");
/// ```
pub struct Cell<A> {
    state: Rc<CellState<A>>,
}

/// A non-owning handle to a cell, used by the edges that feed it.
pub(crate) struct WeakCell<A> {
    state: Weak<CellState<A>>,
}

impl<A> WeakCell<A> {
    pub(crate) fn upgrade(&self) -> Option<Cell<A>> {
        self.state.upgrade().map(|state| Cell { state })
    }
}

impl<A> Clone for WeakCell<A> {
    fn clone(&self) -> Self {
        Self {
            state: Weak::clone(&self.state),
        }
    }
}

impl<A> Cell<A>
where
    A: Clone + 'static,
{
    pub(crate) fn new<E>(runtime: &Runtime, value: A, eq: E, constant: bool) -> Self
    where
        E: Fn(&A, &A) -> bool + 'static,
    {
        Self::from_parts(runtime, Some(value), Rc::new(eq), constant)
    }

    /// A cell with no value yet, to be filled by the edge that feeds it.
    pub(crate) fn derived<E>(runtime: &Runtime, eq: E) -> Self
    where
        E: Fn(&A, &A) -> bool + 'static,
    {
        Self::from_parts(runtime, None, Rc::new(eq), false)
    }

    fn from_parts(runtime: &Runtime, value: Option<A>, eq: EqFn<A>, constant: bool) -> Self {
        Self {
            state: Rc::new(CellState {
                id: runtime.register_cell(),
                runtime: runtime.clone(),
                value: RefCell::new(value),
                eq,
                constant,
                upstream: RefCell::new(SmallVec::new()),
            }),
        }
    }

    /// Get this cell's node ID.
    pub fn id(&self) -> NodeId {
        self.state.id
    }

    /// The runtime this cell belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.state.runtime
    }

    /// Whether this cell was created with [`Runtime::constant`].
    pub fn is_constant(&self) -> bool {
        self.state.constant
    }

    /// Whether the cell has been written at least once.
    pub fn has_value(&self) -> bool {
        self.state.value.borrow().is_some()
    }

    /// Get a clone of the current value.
    ///
    /// # Panics
    ///
    /// Panics if the cell has never been written.
    pub fn get(&self) -> A {
        self.try_get().unwrap_or_else(|err| panic!("{err}"))
    }

    /// Get a clone of the current value, or an error if there is none yet.
    pub fn try_get(&self) -> Result<A> {
        self.state
            .value
            .borrow()
            .clone()
            .ok_or(EngineError::Uninitialized { node: self.state.id })
    }

    /// Borrow the current value.
    ///
    /// The closure must not write to this same cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell has never been written.
    pub fn with<R>(&self, f: impl FnOnce(&A) -> R) -> R {
        let value = self.state.value.borrow();
        match value.as_ref() {
            Some(value) => f(value),
            None => panic!("{}", EngineError::Uninitialized { node: self.state.id }),
        }
    }

    /// Write a new value and propagate it.
    ///
    /// # Panics
    ///
    /// Panics if the cell is constant, or if the runtime's fire limit aborts
    /// the round this write started.
    pub fn write(&self, value: A) {
        if let Err(err) = self.try_write(value) {
            panic!("{err}");
        }
    }

    /// Write a new value and propagate it, reporting misuse as an error.
    ///
    /// Writing a value equal to the current one is a no-op. When called while
    /// a round is draining, the write joins that round and returns once its
    /// dependents are queued.
    pub fn try_write(&self, value: A) -> Result<()> {
        let state = &self.state;
        if state.constant {
            return Err(EngineError::ConstantMutation { node: state.id });
        }
        {
            let mut current = state.value.borrow_mut();
            if let Some(existing) = current.as_ref() {
                if (state.eq)(existing, &value) {
                    return Ok(());
                }
            }
            *current = Some(value);
        }
        state.runtime.cell_changed(state.id)
    }

    /// Write from an edge that feeds this cell.
    pub(crate) fn publish(&self, value: A) {
        if let Err(err) = self.try_write(value) {
            error!(cell = %self.state.id, %err, "derived write failed");
        }
    }

    /// Call `callback` now with the current value, and again after every
    /// change, until the returned [`Disposable`] is dropped or disposed.
    ///
    /// The callback is skipped while the cell has no value.
    pub fn observe<F>(&self, mut callback: F) -> Disposable
    where
        F: FnMut(&A) + 'static,
    {
        let source = self.clone();
        Observer::attach(self, move || {
            if let Ok(value) = source.try_get() {
                callback(&value);
            }
        })
    }

    /// Derive a cell by applying `transform` to this one, cutting off on
    /// `PartialEq`.
    pub fn map<B, F>(&self, transform: F) -> Cell<B>
    where
        B: Clone + PartialEq + 'static,
        F: Fn(&A) -> B + 'static,
    {
        self.map_with_eq(|a: &B, b: &B| a == b, transform)
    }

    /// Derive a cell by applying `transform` to this one, cutting off on `eq`.
    pub fn map_with_eq<B, E, F>(&self, eq: E, transform: F) -> Cell<B>
    where
        B: Clone + 'static,
        E: Fn(&B, &B) -> bool + 'static,
        F: Fn(&A) -> B + 'static,
    {
        let result = Cell::derived(self.runtime(), eq);
        let target = result.downgrade();
        let result_id = result.id();
        let source = self.clone();
        let reader = Reader::attach(self, move || {
            if let Some(result) = target.upgrade() {
                result.publish(source.with(&transform));
            }
            result_id
        });
        result.retain_upstream(reader.into_disposable());
        result
    }

    /// Derive a cell that follows whichever cell `transform` selects.
    ///
    /// Each time this cell changes, the subscription to the previously
    /// selected cell is torn down before the new one is established, so the
    /// shape of the graph can change at runtime.
    pub fn flat_map<B, F>(&self, transform: F) -> Cell<B>
    where
        B: Clone + PartialEq + 'static,
        F: Fn(&A) -> Cell<B> + 'static,
    {
        self.flat_map_with_eq(|a: &B, b: &B| a == b, transform)
    }

    /// [`Cell::flat_map`] with a custom cutoff equality.
    pub fn flat_map_with_eq<B, E, F>(&self, eq: E, transform: F) -> Cell<B>
    where
        B: Clone + 'static,
        E: Fn(&B, &B) -> bool + 'static,
        F: Fn(&A) -> Cell<B> + 'static,
    {
        let result = Cell::derived(self.runtime(), eq);
        let target = result.downgrade();
        let result_id = result.id();
        let source = self.clone();

        // The inner cell is kept alive alongside the reader bound to it.
        let mut inner: Option<(Disposable, Cell<B>)> = None;
        let outer = Reader::attach(self, move || {
            drop(inner.take());
            if target.upgrade().is_none() {
                return result_id;
            }

            let selected = source.with(&transform);
            let feed = selected.clone();
            let sink = target.clone();
            let reader = Reader::attach(&selected, move || {
                if let (Some(result), Ok(value)) = (sink.upgrade(), feed.try_get()) {
                    result.publish(value);
                }
                result_id
            });
            let bound = reader.id();
            inner = Some((reader.into_disposable(), selected));
            bound
        });
        result.retain_upstream(outer.into_disposable());
        result
    }

    /// Height of this cell in the current graph.
    pub fn height(&self) -> Height {
        self.state.runtime.height(self.state.id)
    }

    /// Number of readers and observers currently registered on this cell.
    pub fn dependent_count(&self) -> usize {
        self.state.runtime.dependent_count(self.state.id)
    }

    pub(crate) fn downgrade(&self) -> WeakCell<A> {
        WeakCell {
            state: Rc::downgrade(&self.state),
        }
    }

    /// Keep a feeding subscription alive for as long as this cell lives.
    pub(crate) fn retain_upstream(&self, subscription: Disposable) {
        self.state.upstream.borrow_mut().push(subscription);
    }

    /// Whether two handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Cell<A>) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl<A> Clone for Cell<A> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<A> Cell<A> {
    /// Move the value out, but only through the last handle to the cell.
    pub(crate) fn take_if_unique(&self) -> Option<A> {
        if Rc::strong_count(&self.state) != 1 {
            return None;
        }
        self.state.value.try_borrow_mut().ok()?.take()
    }
}

impl<A> Debug for Cell<A>
where
    A: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.state.id)
            .field("value", &self.state.value.borrow())
            .field("constant", &self.state.constant)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

//! Reader Implementation
//!
//! A Reader is a dependency edge whose target can change between firings.
//! Each firing re-runs its read closure, which does the edge's work (usually
//! writing a derived cell) and returns the node the reader now feeds.
//!
//! The reader's height is one above its current target, so a reader that
//! rebinds to a taller part of the graph is scheduled accordingly the next
//! time it is queued. `flat_map` relies on this: its outer reader targets the
//! inner reader, which targets the result, so the rebinding always happens
//! before the inner edge could fire with a stale binding.

use std::cell::RefCell;
use std::rc::Rc;

use crate::graph::{NodeId, ReadFn};
#[cfg(test)]
use crate::graph::Height;

use super::cell::Cell;
use super::disposable::Disposable;
use super::runtime::Runtime;

/// A live edge registered on one cell.
pub(crate) struct Reader {
    runtime: Runtime,
    id: NodeId,
}

impl Reader {
    /// Evaluate `read` once to find the first target, then register the
    /// reader as a dependent of `source`.
    pub(crate) fn attach<A, F>(source: &Cell<A>, read: F) -> Self
    where
        A: Clone + 'static,
        F: FnMut() -> NodeId + 'static,
    {
        let read: ReadFn = Rc::new(RefCell::new(read));
        let runtime = source.runtime().clone();
        let id = runtime.attach_reader(source.id(), read);
        Self { runtime, id }
    }

    /// This reader's node ID.
    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    #[cfg(test)]
    pub(crate) fn height(&self) -> Height {
        self.runtime.height(self.id)
    }

    /// Hand ownership of the edge to a [`Disposable`].
    pub(crate) fn into_disposable(self) -> Disposable {
        Disposable::detach(&self.runtime, self.id)
    }
}

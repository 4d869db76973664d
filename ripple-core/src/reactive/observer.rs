//! Observer Implementation
//!
//! An Observer is a terminal edge: it runs a side effect whenever the cell it
//! is registered on changes, and nothing depends on it.
//!
//! # How Observers Work
//!
//! 1. When attached, the callback runs once immediately (the observer is
//!    "primed").
//!
//! 2. Observers sit at [`Height::MIN`](crate::graph::Height::MIN), so in any
//!    round they fire after every reader that could still change their cell.
//!
//! 3. The returned [`Disposable`] removes the observer from its cell.

use std::cell::RefCell;
use std::rc::Rc;

use crate::graph::NotifyFn;

use super::cell::Cell;
use super::disposable::Disposable;

/// Factory for terminal edges.
pub(crate) struct Observer;

impl Observer {
    /// Prime `notify`, register it on `source` and return its teardown.
    pub(crate) fn attach<A, F>(source: &Cell<A>, notify: F) -> Disposable
    where
        A: Clone + 'static,
        F: FnMut() + 'static,
    {
        let notify: NotifyFn = Rc::new(RefCell::new(notify));
        let runtime = source.runtime();
        let id = runtime.attach_observer(source.id(), notify);
        Disposable::detach(runtime, id)
    }
}

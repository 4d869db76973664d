//! Append-only change log.
//!
//! A log is a chain of cells, each holding either [`ChangeList::Empty`] or a
//! [`ChangeList::Cons`] of one change and the cell for the rest of the log.
//! Only the empty tail is ever written, and a cons cell is never rewritten,
//! so the log can be shared by any number of readers, each walking it at its
//! own pace.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::reactive::{Cell, Disposable, Runtime};

use super::change::ArrayChange;

/// One link of a change log.
pub enum ChangeList<A> {
    /// The end of the log as currently known.
    Empty,

    /// A recorded change and the cell holding the rest of the log.
    Cons(ArrayChange<A>, Cell<ChangeList<A>>),
}

impl<A> Clone for ChangeList<A>
where
    A: Clone,
{
    fn clone(&self) -> Self {
        match self {
            ChangeList::Empty => ChangeList::Empty,
            ChangeList::Cons(change, next) => ChangeList::Cons(change.clone(), next.clone()),
        }
    }
}

impl<A> fmt::Debug for ChangeList<A>
where
    A: fmt::Debug + Clone + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeList::Empty => f.write_str("Empty"),
            ChangeList::Cons(change, next) => f
                .debug_tuple("Cons")
                .field(change)
                .field(&next.id())
                .finish(),
        }
    }
}

impl<A> ChangeList<A> {
    pub fn is_empty(&self) -> bool {
        matches!(self, ChangeList::Empty)
    }
}

/// Unlinks the rest of the log one link at a time.
///
/// Dropping a cons drops its next cell, whose value drops the cell after
/// that, so a plain drop recurses once per change. Each link that no one else
/// holds is emptied before it goes, which keeps the depth constant. A link
/// that is still shared stops the walk; its last holder unlinks the rest.
impl<A> Drop for ChangeList<A> {
    fn drop(&mut self) {
        let ChangeList::Cons(_, next) = self else {
            return;
        };
        let mut rest = next.take_if_unique();
        while let Some(list) = rest {
            rest = match &list {
                ChangeList::Cons(_, next) => next.take_if_unique(),
                ChangeList::Empty => None,
            };
        }
    }
}

/// Two links are equal only if both are still empty.
///
/// A link changes exactly once, from empty to cons, and that transition must
/// always propagate.
fn link_eq<A>(a: &ChangeList<A>, b: &ChangeList<A>) -> bool {
    a.is_empty() && b.is_empty()
}

/// A fresh empty link.
pub(crate) fn empty_link<A>(runtime: &Runtime) -> Cell<ChangeList<A>>
where
    A: Clone + 'static,
{
    runtime.cell_with_eq(ChangeList::Empty, link_eq::<A>)
}

/// The change recorded in `link` and the link after it, if any.
fn step<A>(link: &Cell<ChangeList<A>>) -> Option<(ArrayChange<A>, Cell<ChangeList<A>>)>
where
    A: Clone + 'static,
{
    link.with(|list| match list {
        ChangeList::Empty => None,
        ChangeList::Cons(change, next) => Some((change.clone(), next.clone())),
    })
}

/// Append `change` at the end of the log reachable from `link`.
///
/// Walks past links that are already cons before writing the empty tail.
/// Returns the new empty tail.
pub(crate) fn append<A>(link: &Cell<ChangeList<A>>, change: ArrayChange<A>) -> Cell<ChangeList<A>>
where
    A: Clone + 'static,
{
    let end = walk(link, |_| {});
    let tail = empty_link(end.runtime());
    end.write(ChangeList::Cons(change, tail.clone()));
    tail
}

/// Visit every change recorded from `link` onward.
///
/// Returns the empty link the walk stopped at.
pub(crate) fn walk<A, F>(link: &Cell<ChangeList<A>>, mut visit: F) -> Cell<ChangeList<A>>
where
    A: Clone + 'static,
    F: FnMut(&ArrayChange<A>),
{
    let mut link = link.clone();
    while let Some((change, next)) = step(&link) {
        visit(&change);
        link = next;
    }
    link
}

/// What a log follower is told.
pub(crate) enum LogEvent<A> {
    /// The next change in append order.
    Change(ArrayChange<A>),

    /// Every change known so far has been delivered.
    Settled,
}

type Handler<A> = Rc<RefCell<dyn FnMut(LogEvent<A>)>>;
type Slot = Rc<RefCell<Option<Disposable>>>;

/// Deliver every change from `link` onward, now and as it is appended.
///
/// Changes already recorded are delivered synchronously, followed by
/// [`LogEvent::Settled`]. After that, each time the tail resolves, the new
/// changes are delivered in append order, exactly once each, followed by
/// another `Settled`.
pub(crate) fn follow<A, F>(link: &Cell<ChangeList<A>>, handler: F) -> Disposable
where
    A: Clone + 'static,
    F: FnMut(LogEvent<A>) + 'static,
{
    let handler: Handler<A> = Rc::new(RefCell::new(handler));
    let slot: Slot = Rc::new(RefCell::new(None));
    let first = watch(link, handler, Rc::downgrade(&slot));
    *slot.borrow_mut() = Some(first);
    Disposable::new(move || {
        let current = slot.borrow_mut().take();
        drop(current);
    })
}

/// Catch up from `link`, then observe the empty tail it ends at.
fn watch<A>(
    link: &Cell<ChangeList<A>>,
    handler: Handler<A>,
    slot: Weak<RefCell<Option<Disposable>>>,
) -> Disposable
where
    A: Clone + 'static,
{
    let tail = {
        let mut deliver = handler.borrow_mut();
        let tail = walk(link, |change| deliver(LogEvent::Change(change.clone())));
        deliver(LogEvent::Settled);
        tail
    };

    let watched = tail.clone();
    tail.observe(move |list| {
        // Priming sees the empty tail; there is nothing to deliver yet.
        if list.is_empty() {
            return;
        }
        let Some(slot) = slot.upgrade() else {
            return;
        };
        let next = watch(&watched, Rc::clone(&handler), Rc::downgrade(&slot));
        // Replacing the slot detaches this observer.
        *slot.borrow_mut() = Some(next);
    })
}

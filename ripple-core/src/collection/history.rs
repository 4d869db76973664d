//! Collections with history.
//!
//! An [`ArrayWithHistory`] is an immutable initial snapshot plus a shared,
//! append-only log of edits. Subscribers replay the log once and then hear
//! about each new edit as it is appended, so nobody has to rescan the whole
//! collection on every change.
//!
//! # Derived views
//!
//! - [`map`](ArrayWithHistory::map) mirrors the log with each payload
//!   transformed.
//! - [`filter`](ArrayWithHistory::filter) re-expresses edits in filtered index
//!   space and emits diffs when its predicate changes.
//! - [`reduce`](ArrayWithHistory::reduce) folds each edit exactly once.
//!
//! Each view owns the subscriptions that feed it and releases them when the
//! last handle to it is dropped.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::reactive::{Cell, Disposable, Runtime};

use super::change::ArrayChange;
use super::list::{self, ChangeList, LogEvent};

struct History<A> {
    runtime: Runtime,

    /// The collection before any change in the log.
    initial: Vec<A>,

    /// First link of the change log.
    head: Cell<ChangeList<A>>,

    /// Last link known to be empty. Appends start walking from here.
    tail: RefCell<Cell<ChangeList<A>>>,

    /// Subscriptions feeding this collection, for derived views.
    upstream: RefCell<SmallVec<[Disposable; 2]>>,
}

/// A collection whose edits are observable incrementally.
///
/// Cloning yields another handle to the same collection and log.
///
/// # Example
///
/// ```rust
/// use ripple_core::{ArrayChange, Runtime};
///
/// let runtime = Runtime::new();
/// let names = runtime.array(vec!["ada", "grace"]);
/// let latest = names.latest();
///
/// names.change(ArrayChange::insert("barbara", 1));
/// assert_eq!(latest.get(), vec!["ada", "barbara", "grace"]);
/// ```
pub struct ArrayWithHistory<A> {
    inner: Rc<History<A>>,
}

/// A non-owning handle to a collection, used by the drivers that feed it.
pub(crate) struct WeakHistory<A> {
    inner: Weak<History<A>>,
}

impl<A> WeakHistory<A> {
    pub(crate) fn upgrade(&self) -> Option<ArrayWithHistory<A>> {
        self.inner.upgrade().map(|inner| ArrayWithHistory { inner })
    }
}

impl<A> Clone for WeakHistory<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<A> ArrayWithHistory<A>
where
    A: Clone + 'static,
{
    /// Create a collection seeded with `initial` and an empty log.
    pub fn new(runtime: &Runtime, initial: Vec<A>) -> Self {
        let head = list::empty_link(runtime);
        Self {
            inner: Rc::new(History {
                runtime: runtime.clone(),
                initial,
                tail: RefCell::new(head.clone()),
                head,
                upstream: RefCell::new(SmallVec::new()),
            }),
        }
    }

    /// The runtime this collection belongs to.
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// The collection before any change in the log.
    pub fn initial(&self) -> &[A] {
        &self.inner.initial
    }

    /// First link of the change log.
    pub fn changes(&self) -> Cell<ChangeList<A>> {
        self.inner.head.clone()
    }

    /// Append an edit to the log and propagate it.
    pub fn change(&self, change: ArrayChange<A>) {
        // Clone the cached tail first: propagation may append re-entrantly.
        let tail = self.inner.tail.borrow().clone();
        let next = list::append(&tail, change);
        *self.inner.tail.borrow_mut() = next;
    }

    /// The current contents, computed by replaying the log.
    pub fn snapshot(&self) -> Vec<A> {
        let mut snapshot = self.inner.initial.clone();
        list::walk(&self.inner.head, |change| change.apply_to(&mut snapshot));
        snapshot
    }

    /// Number of edits recorded so far.
    pub fn change_count(&self) -> usize {
        let mut count = 0;
        list::walk(&self.inner.head, |_| count += 1);
        count
    }

    /// Replay the collection into `current`, then report each later edit.
    ///
    /// `current` runs immediately with the initial snapshot plus every change
    /// recorded so far. `handle_change` then runs once per appended edit, in
    /// append order, until the returned [`Disposable`] is dropped.
    pub fn observe<C, H>(&self, current: C, mut handle_change: H) -> Disposable
    where
        C: FnOnce(&[A]),
        H: FnMut(&ArrayChange<A>) + 'static,
    {
        let mut snapshot = self.inner.initial.clone();
        let tail = list::walk(&self.inner.head, |change| change.apply_to(&mut snapshot));
        current(&snapshot);
        list::follow(&tail, move |event| {
            if let LogEvent::Change(change) = event {
                handle_change(&change);
            }
        })
    }

    /// Fold the log into a cell, starting from `initial`.
    ///
    /// Each change is combined exactly once. The cell is written whenever the
    /// fold catches up with the end of the log, so a round that appends
    /// several edits writes it once.
    pub fn reduce<B, F>(&self, initial: B, combine: F) -> Cell<B>
    where
        B: Clone + PartialEq + 'static,
        F: Fn(B, &ArrayChange<A>) -> B + 'static,
    {
        self.reduce_with_eq(initial, |a: &B, b: &B| a == b, combine)
    }

    /// [`reduce`](Self::reduce) with a custom cutoff equality.
    pub fn reduce_with_eq<B, E, F>(&self, initial: B, eq: E, combine: F) -> Cell<B>
    where
        B: Clone + 'static,
        E: Fn(&B, &B) -> bool + 'static,
        F: Fn(B, &ArrayChange<A>) -> B + 'static,
    {
        let result = self.inner.runtime.cell_with_eq(initial.clone(), eq);
        let target = result.downgrade();
        let mut accumulator = Some(initial);
        let subscription = list::follow(&self.inner.head, move |event| match event {
            LogEvent::Change(change) => {
                accumulator = accumulator.take().map(|acc| combine(acc, &change));
            }
            LogEvent::Settled => {
                if let (Some(result), Some(acc)) = (target.upgrade(), accumulator.as_ref()) {
                    result.publish(acc.clone());
                }
            }
        });
        result.retain_upstream(subscription);
        result
    }

    /// A cell holding the up-to-date contents.
    pub fn latest(&self) -> Cell<Vec<A>>
    where
        A: PartialEq,
    {
        self.reduce(self.inner.initial.clone(), |mut snapshot, change| {
            change.apply_to(&mut snapshot);
            snapshot
        })
    }

    /// A collection whose log mirrors this one with each payload transformed.
    ///
    /// Positions and edit kinds are unchanged; map never changes cardinality
    /// or order.
    pub fn map<B, F>(&self, transform: F) -> ArrayWithHistory<B>
    where
        B: Clone + 'static,
        F: Fn(&A) -> B + 'static,
    {
        let result = ArrayWithHistory::new(
            &self.inner.runtime,
            self.inner.initial.iter().map(&transform).collect(),
        );
        let target = result.downgrade();
        let subscription = list::follow(&self.inner.head, move |event| {
            if let (LogEvent::Change(change), Some(target)) = (event, target.upgrade()) {
                target.change(change.map(&transform));
            }
        });
        result.retain_upstream(subscription);
        result
    }

    pub(crate) fn downgrade(&self) -> WeakHistory<A> {
        WeakHistory {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Keep a feeding subscription alive for as long as this collection lives.
    pub(crate) fn retain_upstream(&self, subscription: Disposable) {
        self.inner.upstream.borrow_mut().push(subscription);
    }

    /// Whether two handles refer to the same collection.
    pub fn ptr_eq(&self, other: &ArrayWithHistory<A>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<A> Clone for ArrayWithHistory<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Collections compare by identity.
impl<A> PartialEq for ArrayWithHistory<A> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<A> Debug for ArrayWithHistory<A>
where
    A: Debug + Clone + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayWithHistory")
            .field("initial", &self.inner.initial)
            .field("head", &self.inner.head.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_changes<A: Clone + 'static>(
        history: &ArrayWithHistory<A>,
    ) -> Vec<ArrayChange<A>> {
        let mut changes = Vec::new();
        list::walk(&history.changes(), |change| changes.push(change.clone()));
        changes
    }

    #[test]
    fn observe_replays_then_streams() {
        let runtime = Runtime::new();
        let history = runtime.array(vec![1, 2]);
        history.change(ArrayChange::insert(3, 2));

        let replayed = Rc::new(RefCell::new(Vec::new()));
        let streamed = Rc::new(RefCell::new(Vec::new()));
        let replay_sink = replayed.clone();
        let stream_sink = streamed.clone();
        let _subscription = history.observe(
            move |current| replay_sink.borrow_mut().extend_from_slice(current),
            move |change| stream_sink.borrow_mut().push(change.clone()),
        );
        assert_eq!(*replayed.borrow(), vec![1, 2, 3]);
        assert!(streamed.borrow().is_empty());

        history.change(ArrayChange::remove(0));
        history.change(ArrayChange::insert(9, 0));
        assert_eq!(
            *streamed.borrow(),
            vec![ArrayChange::remove(0), ArrayChange::insert(9, 0)]
        );
    }

    #[test]
    fn latest_tracks_every_change() {
        let runtime = Runtime::new();
        let history = runtime.array(vec!['a']);
        let latest = history.latest();
        assert_eq!(latest.get(), vec!['a']);

        history.change(ArrayChange::insert('b', 1));
        assert_eq!(latest.get(), vec!['a', 'b']);
        history.change(ArrayChange::remove(0));
        assert_eq!(latest.get(), vec!['b']);
        assert_eq!(history.snapshot(), vec!['b']);
        assert_eq!(history.change_count(), 2);
    }

    #[test]
    fn latest_created_late_sees_history() {
        let runtime = Runtime::new();
        let history = runtime.array(vec![10, 20, 30]);
        history.change(ArrayChange::remove(1));
        history.change(ArrayChange::insert(25, 1));

        assert_eq!(history.latest().get(), vec![10, 25, 30]);
    }

    #[test]
    fn reduce_folds_each_change_once() {
        let runtime = Runtime::new();
        let history = runtime.array(vec![5, 5]);
        let combines = Rc::new(RefCell::new(0));
        let combines_clone = combines.clone();
        let inserted = history.reduce(0, move |total, change| {
            *combines_clone.borrow_mut() += 1;
            match change {
                ArrayChange::Insert { element, .. } => total + element,
                ArrayChange::Remove { .. } => total,
            }
        });
        assert_eq!(inserted.get(), 0);

        history.change(ArrayChange::insert(3, 0));
        history.change(ArrayChange::insert(4, 0));
        history.change(ArrayChange::remove(0));
        assert_eq!(inserted.get(), 7);
        assert_eq!(*combines.borrow(), 3);
    }

    #[test]
    fn map_mirrors_the_log() {
        let runtime = Runtime::new();
        let history = runtime.array(vec![1, 2]);
        history.change(ArrayChange::insert(3, 0));

        let labels = history.map(|n| format!("#{n}"));
        assert_eq!(labels.initial(), &["#1".to_string(), "#2".to_string()]);

        history.change(ArrayChange::remove(1));
        assert_eq!(
            collect_changes(&labels),
            vec![ArrayChange::insert("#3".to_string(), 0), ArrayChange::remove(1)]
        );
        assert_eq!(labels.snapshot(), vec!["#3".to_string(), "#2".to_string()]);
    }

    #[test]
    fn dropping_a_mapped_view_releases_its_follower() {
        let runtime = Runtime::new();
        let history = runtime.array(vec![1]);
        let before = runtime.stats().observers;

        let mapped = history.map(|n| n * 2);
        assert_eq!(runtime.stats().observers, before + 1);

        drop(mapped);
        assert_eq!(runtime.stats().observers, before);
        history.change(ArrayChange::insert(2, 1));
    }

    #[test]
    fn long_histories_drop_with_their_views() {
        let runtime = Runtime::new();
        let history = runtime.array(Vec::<u32>::new());
        let mapped = history.map(|n| n + 1);
        for i in 0..100_000 {
            history.change(ArrayChange::insert(i, 0));
        }
        assert_eq!(mapped.change_count(), 100_000);

        drop(history);
        drop(mapped);
        let stats = runtime.stats();
        assert_eq!((stats.cells, stats.observers), (0, 0));
    }

    #[test]
    fn collections_compare_by_identity() {
        let runtime = Runtime::new();
        let a = runtime.array(vec![1]);
        let b = runtime.array(vec![1]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}

//! Filtered views.
//!
//! A filtered view is driven from two sides:
//!
//! 1. When the predicate cell changes, every element of the unfiltered
//!    snapshot whose membership flips yields one edit. Applied in order to the
//!    old filtered contents, the edits produce exactly the new ones.
//!
//! 2. When the source log grows, each edit is re-expressed in filtered index
//!    space using the predicate active at that moment. Edits touching elements
//!    outside the filter are dropped.
//!
//! The index of a flip is the number of elements before it that the new
//! predicate keeps. [`FilterDiff`] picks how that count is obtained.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::reactive::Cell;

use super::change::ArrayChange;
use super::history::ArrayWithHistory;
use super::list::{self, LogEvent};

/// A shareable element test.
///
/// Predicates compare by identity, so writing the same predicate back into a
/// cell is cut off while any new closure counts as a change.
pub struct Predicate<A> {
    test: Rc<dyn Fn(&A) -> bool>,
}

impl<A> Predicate<A> {
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&A) -> bool + 'static,
    {
        Self {
            test: Rc::new(test),
        }
    }

    /// Whether `element` passes.
    pub fn test(&self, element: &A) -> bool {
        (self.test)(element)
    }

    pub fn ptr_eq(&self, other: &Predicate<A>) -> bool {
        Rc::ptr_eq(&self.test, &other.test)
    }
}

impl<A> Clone for Predicate<A> {
    fn clone(&self) -> Self {
        Self {
            test: Rc::clone(&self.test),
        }
    }
}

impl<A> PartialEq for Predicate<A> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<A> fmt::Debug for Predicate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("test", &Rc::as_ptr(&self.test).cast::<()>())
            .finish()
    }
}

/// How a predicate switch computes the position of each flipped element.
///
/// Both strategies emit the same edits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterDiff {
    /// Recount the kept prefix for every flip. Quadratic in the worst case.
    #[default]
    Rescan,

    /// Carry the kept count along the scan. Linear.
    Running,
}

impl FilterDiff {
    /// Edits that turn `snapshot` filtered by `old` into `snapshot` filtered
    /// by `new`.
    pub fn diff<A>(
        self,
        snapshot: &[A],
        old: &Predicate<A>,
        new: &Predicate<A>,
    ) -> Vec<ArrayChange<A>>
    where
        A: Clone,
    {
        let mut edits = Vec::new();
        let mut kept = 0;
        for (index, element) in snapshot.iter().enumerate() {
            let now = new.test(element);
            if old.test(element) != now {
                let at = match self {
                    FilterDiff::Rescan => {
                        snapshot[..index].iter().filter(|e| new.test(e)).count()
                    }
                    FilterDiff::Running => kept,
                };
                edits.push(if now {
                    ArrayChange::insert(element.clone(), at)
                } else {
                    ArrayChange::remove(at)
                });
            }
            if now {
                kept += 1;
            }
        }
        edits
    }
}

/// Bookkeeping shared by a filtered view's two drivers.
struct FilterState<A> {
    active: Predicate<A>,

    /// The unfiltered contents as of the last source edit seen.
    snapshot: Vec<A>,

    diff: FilterDiff,
}

impl<A> FilterState<A>
where
    A: Clone,
{
    /// Number of elements before `end` that the active predicate keeps.
    fn kept_before(&self, end: usize) -> usize {
        self.snapshot[..end].iter().filter(|e| self.active.test(e)).count()
    }

    /// Install `next` as the active predicate and return the edits it causes.
    fn switch(&mut self, next: &Predicate<A>) -> Vec<ArrayChange<A>> {
        if self.active.ptr_eq(next) {
            return Vec::new();
        }
        let edits = self.diff.diff(&self.snapshot, &self.active, next);
        self.active = next.clone();
        edits
    }

    /// Apply a source edit and return its filtered counterpart, if any.
    fn translate(&mut self, change: &ArrayChange<A>) -> Option<ArrayChange<A>> {
        match change {
            ArrayChange::Insert { element, at } => {
                if *at > self.snapshot.len() {
                    warn!(at, len = self.snapshot.len(), "filter source insert out of range");
                    return None;
                }
                let forwarded = self
                    .active
                    .test(element)
                    .then(|| ArrayChange::insert(element.clone(), self.kept_before(*at)));
                self.snapshot.insert(*at, element.clone());
                forwarded
            }
            ArrayChange::Remove { at } => {
                let Some(element) = self.snapshot.get(*at) else {
                    warn!(at, len = self.snapshot.len(), "filter source remove out of range");
                    return None;
                };
                let forwarded = self
                    .active
                    .test(element)
                    .then(|| ArrayChange::remove(self.kept_before(*at)));
                self.snapshot.remove(*at);
                forwarded
            }
        }
    }
}

impl<A> ArrayWithHistory<A>
where
    A: Clone + 'static,
{
    /// A view holding the elements that pass the current predicate.
    ///
    /// The view lives in a constant cell and keeps itself current: switching
    /// the predicate appends the diff to its log, and source edits are
    /// forwarded when they touch a kept element.
    pub fn filter(&self, predicate: &Cell<Predicate<A>>) -> Cell<ArrayWithHistory<A>> {
        self.filter_with(predicate, FilterDiff::default())
    }

    /// [`filter`](Self::filter) with an explicit diff strategy.
    pub fn filter_with(
        &self,
        predicate: &Cell<Predicate<A>>,
        diff: FilterDiff,
    ) -> Cell<ArrayWithHistory<A>> {
        let active = predicate.get();
        let mut snapshot = self.initial().to_vec();
        let tail = list::walk(&self.changes(), |change| change.apply_to(&mut snapshot));

        let kept = snapshot.iter().filter(|e| active.test(e)).cloned().collect();
        let result = ArrayWithHistory::new(self.runtime(), kept);
        let state = Rc::new(RefCell::new(FilterState {
            active,
            snapshot,
            diff,
        }));

        let target = result.downgrade();
        let shared = Rc::clone(&state);
        let on_predicate = predicate.observe(move |next| {
            let Some(target) = target.upgrade() else {
                return;
            };
            // Release the state before appending; appends may re-enter.
            let edits = shared.borrow_mut().switch(next);
            if !edits.is_empty() {
                trace!(edits = edits.len(), ?diff, "filter predicate switched");
            }
            for edit in edits {
                target.change(edit);
            }
        });

        let target = result.downgrade();
        let on_source = list::follow(&tail, move |event| {
            let LogEvent::Change(change) = event else {
                return;
            };
            let Some(target) = target.upgrade() else {
                return;
            };
            let forwarded = state.borrow_mut().translate(&change);
            if let Some(edit) = forwarded {
                target.change(edit);
            }
        });

        result.retain_upstream(on_predicate);
        result.retain_upstream(on_source);
        self.runtime().constant(result)
    }
}

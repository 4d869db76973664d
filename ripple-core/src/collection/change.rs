//! Array edits.
//!
//! An [`ArrayChange`] is one edit to a collection. Its index refers to the
//! array as it stands after every earlier change in the same log has been
//! applied; indices are never renumbered afterwards.

use serde::{Deserialize, Serialize};

/// One edit to an incremental collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArrayChange<A> {
    /// Insert `element` so that it ends up at index `at`.
    Insert { element: A, at: usize },

    /// Remove the element at index `at`.
    Remove { at: usize },
}

impl<A> ArrayChange<A> {
    /// Shorthand for [`ArrayChange::Insert`].
    pub fn insert(element: A, at: usize) -> Self {
        ArrayChange::Insert { element, at }
    }

    /// Shorthand for [`ArrayChange::Remove`].
    pub fn remove(at: usize) -> Self {
        ArrayChange::Remove { at }
    }

    /// The index this change applies to.
    pub fn index(&self) -> usize {
        match self {
            ArrayChange::Insert { at, .. } | ArrayChange::Remove { at } => *at,
        }
    }

    /// The same edit with its payload transformed. Positions are unchanged.
    pub fn map<B, F>(&self, transform: F) -> ArrayChange<B>
    where
        F: FnOnce(&A) -> B,
    {
        match self {
            ArrayChange::Insert { element, at } => ArrayChange::Insert {
                element: transform(element),
                at: *at,
            },
            ArrayChange::Remove { at } => ArrayChange::Remove { at: *at },
        }
    }

    /// Apply this edit to `array` in place.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds for `array`, like
    /// [`Vec::insert`] and [`Vec::remove`].
    pub fn apply_to(&self, array: &mut Vec<A>)
    where
        A: Clone,
    {
        match self {
            ArrayChange::Insert { element, at } => array.insert(*at, element.clone()),
            ArrayChange::Remove { at } => {
                array.remove(*at);
            }
        }
    }

    /// A copy of `array` with this edit applied.
    #[must_use]
    pub fn applied(&self, array: &[A]) -> Vec<A>
    where
        A: Clone,
    {
        let mut next = array.to_vec();
        self.apply_to(&mut next);
        next
    }
}

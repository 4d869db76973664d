//! Input cells.
//!
//! An [`Input`] is the writable end application code holds: a cell plus a
//! read-modify-write helper.

use std::fmt::{self, Debug};

use super::cell::Cell;

/// A writable cell with a read-modify-write helper.
pub struct Input<A> {
    cell: Cell<A>,
}

impl<A> Input<A>
where
    A: Clone + 'static,
{
    /// Wrap an existing cell.
    pub fn new(cell: Cell<A>) -> Self {
        Self { cell }
    }

    /// The underlying cell, for deriving from or observing.
    pub fn cell(&self) -> &Cell<A> {
        &self.cell
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> A {
        self.cell.get()
    }

    /// Replace the value.
    pub fn write(&self, value: A) {
        self.cell.write(value);
    }

    /// Update the value in place and write the result in a single call.
    ///
    /// The new value goes through the cell's cutoff like any other write.
    pub fn change<F>(&self, mutate: F)
    where
        F: FnOnce(&mut A),
    {
        let mut value = self.cell.get();
        mutate(&mut value);
        self.cell.write(value);
    }
}

impl<A> Clone for Input<A> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<A> Debug for Input<A>
where
    A: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Input").field(&self.cell).finish()
    }
}

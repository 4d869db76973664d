//! Incremental Collections
//!
//! Collections built on top of the reactive primitives. Instead of
//! republishing a whole array on every edit, a collection records each edit
//! in an append-only log whose links are cells, and consumers follow the log.
//!
//! # Concepts
//!
//! ## Change log
//!
//! Each link is a [`Cell`](crate::Cell) holding a [`ChangeList`]: either the
//! empty tail or an [`ArrayChange`] plus the next link. Appending writes the
//! empty tail exactly once; earlier links never change again. An edit's index
//! refers to the array as it stands after every earlier edit in the log.
//!
//! ## Views
//!
//! [`ArrayWithHistory::map`], [`ArrayWithHistory::filter`] and
//! [`ArrayWithHistory::reduce`] are plain subscribers of the log. They are
//! fed through the same scheduler as any other cell, so a view never observes
//! a half-applied round.

mod change;
mod filter;
mod history;
mod list;

pub use change::ArrayChange;
pub use filter::{FilterDiff, Predicate};
pub use history::ArrayWithHistory;
pub use list::ChangeList;

//! Reactive Primitives
//!
//! This module implements the propagation network: cells, the readers and
//! observers that depend on them, and the runtime that schedules updates.
//!
//! # Concepts
//!
//! ## Cells
//!
//! A [`Cell`] holds a value that changes over time. Writing a value equal to
//! the current one is cut off; writing a different one queues every edge that
//! depends on the cell.
//!
//! ## Readers
//!
//! A reader is an edge that re-evaluates a closure each time its cell changes.
//! `map` uses one to keep a derived cell up to date; `flat_map` uses two, and
//! rebinds the inner one whenever the outer value changes.
//!
//! ## Observers
//!
//! An observer runs a side effect after its cell changes. It is primed on
//! creation and lives for as long as its [`Disposable`] does.
//!
//! # Implementation Notes
//!
//! Dependencies are explicit: derived cells are built with `map`, `flat_map`
//! and the `zip` helpers rather than discovered by tracking reads. Each round
//! fires edges greatest height first, and each cell fires at most once per
//! round, so diamond-shaped graphs never deliver a glitched combination.

mod cell;
mod disposable;
mod input;
mod observer;
mod reader;
mod runtime;
mod zip;

pub use cell::Cell;
pub use disposable::Disposable;
pub use input::Input;
pub use runtime::{Runtime, RuntimeConfig, RuntimeStats};
pub use zip::{zip2, zip3};

//! Ripple Core
//!
//! This crate provides a single-threaded self-adjusting computation engine.
//! It implements:
//!
//! - Cells: time-varying values with equality cutoff
//! - A height-ordered scheduler that keeps propagation glitch-free
//! - Dynamic dependencies through `flat_map` rebinding
//! - Incremental collections with map, filter and reduce views
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: node arena, heights and the propagation scheduler
//! - `reactive`: cells, readers, observers and the runtime that drives them
//! - `collection`: append-only change logs and the views built on them
//! - `error`: the error type shared by the fallible entry points
//!
//! # Example
//!
//! ```rust
//! use ripple_core::{zip2, Runtime};
//!
//! let runtime = Runtime::new();
//! let price = runtime.cell(4);
//! let quantity = runtime.cell(3);
//! let total = zip2(&price, &quantity, |p, q| p * q);
//!
//! let _report = total.observe(|t| println!("total: {t}"));
//!
//! // One write, one round, one report.
//! quantity.write(5);
//! assert_eq!(total.get(), 20);
//! ```

pub mod collection;
pub mod error;
pub mod graph;
pub mod reactive;

pub use collection::{ArrayChange, ArrayWithHistory, ChangeList, FilterDiff, Predicate};
pub use error::{EngineError, Result};
pub use graph::{Height, NodeId, NodeKind};
pub use reactive::{zip2, zip3, Cell, Disposable, Input, Runtime, RuntimeConfig, RuntimeStats};

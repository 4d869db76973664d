//! Topological Height
//!
//! A node's height is its distance from the nearest sink. Observers sit at
//! [`Height::MIN`]; every other node is strictly higher than each edge that
//! currently depends on it. The scheduler fires the highest pending edge
//! first, so by the time a near-sink edge runs, every path that could still
//! feed it has already been applied.

use std::fmt;

/// Distance from the nearest terminal observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Height(u32);

impl Height {
    /// The height of a terminal observer.
    pub const MIN: Height = Height(0);

    /// Create a height from a raw magnitude.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The next height up.
    #[must_use]
    pub fn incremented(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Least upper bound of two heights.
    #[must_use]
    pub fn join(self, other: Height) -> Self {
        self.max(other)
    }

    /// Get the raw magnitude.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

impl FromIterator<Height> for Height {
    /// Join of every height in the iterator, or [`Height::MIN`] when empty.
    fn from_iter<I: IntoIterator<Item = Height>>(iter: I) -> Self {
        iter.into_iter().fold(Height::MIN, Height::join)
    }
}

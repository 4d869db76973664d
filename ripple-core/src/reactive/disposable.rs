//! Subscription teardown.
//!
//! A [`Disposable`] is the single point of teardown for one subscription.
//! The owner keeps it for as long as the subscription should stay live;
//! dropping it or calling [`Disposable::dispose`] severs the edge.

use std::fmt;

use crate::graph::NodeId;

use super::runtime::Runtime;

/// Handle that tears down a subscription exactly once.
///
/// Disposing is idempotent: the teardown closure runs on the first call to
/// [`dispose`](Disposable::dispose) or on drop, whichever comes first.
#[must_use = "dropping a Disposable immediately ends the subscription"]
pub struct Disposable {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Disposable {
    /// Wrap a teardown closure.
    pub fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A handle with nothing to tear down.
    pub fn empty() -> Self {
        Self { teardown: None }
    }

    /// Detach a graph edge when disposed.
    pub(crate) fn detach(runtime: &Runtime, edge: NodeId) -> Self {
        let runtime = runtime.clone();
        Self::new(move || runtime.detach(edge))
    }

    /// Run the teardown if it has not run yet.
    pub fn dispose(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }

    /// Whether the teardown has already run.
    pub fn is_disposed(&self) -> bool {
        self.teardown.is_none()
    }
}

impl Drop for Disposable {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

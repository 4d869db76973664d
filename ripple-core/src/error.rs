//! Engine Errors
//!
//! Every failure the engine can report is a misuse of the graph: writing a
//! constant, reading a cell before its first write, or (when a fire limit is
//! configured) a propagation round that never settles.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors raised by cells and the propagation scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A write was attempted on a cell created with [`Runtime::constant`].
    ///
    /// [`Runtime::constant`]: crate::reactive::Runtime::constant
    #[error("cannot write to constant cell {node}")]
    ConstantMutation { node: NodeId },

    /// The cell has never been written, so it has no value to read.
    #[error("cell {node} was read before it was ever written")]
    Uninitialized { node: NodeId },

    /// A round fired more edges than the configured limit allows.
    ///
    /// This almost always means the dependency graph contains a cycle.
    #[error("propagation round fired {fired} edges, exceeding the limit of {limit}; the graph is likely cyclic")]
    CycleDetected { fired: usize, limit: usize },
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_node() {
        let node = NodeId::from(7);
        let err = EngineError::ConstantMutation { node };
        assert_eq!(err.to_string(), "cannot write to constant cell #7");

        let err = EngineError::Uninitialized { node };
        assert!(err.to_string().contains("#7"));
    }

    #[test]
    fn cycle_message_reports_counts() {
        let err = EngineError::CycleDetected { fired: 101, limit: 100 };
        let text = err.to_string();
        assert!(text.contains("101"));
        assert!(text.contains("100"));
    }
}

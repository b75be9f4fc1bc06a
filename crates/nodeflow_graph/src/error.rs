// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types shared by the graph engine.

use crate::node::NodeId;
use crate::scheduler::LifecycleEvent;

/// Error when mutating the graph structure
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The graph already holds the configured maximum number of nodes
    #[error("Maximum number of nodes reached ({0})")]
    CapacityExceeded(usize),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
}

/// Error raised by a node callback
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NodeError {
    /// Missing required input
    #[error("Missing required input on slot {0}")]
    MissingInput(usize),

    /// A property is missing or holds the wrong kind of value
    #[error("Invalid property: {0}")]
    InvalidProperty(String),

    /// Type mismatch
    #[error("Type mismatch on slot {slot}: expected {expected}")]
    TypeMismatch {
        /// Offending slot index
        slot: usize,
        /// Expected type name
        expected: String,
    },

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

/// A node callback failed while the graph was dispatching a lifecycle event
#[derive(Debug, Clone, thiserror::Error)]
#[error("Node {node} failed during {event}: {source}")]
pub struct ExecutionError {
    /// Node whose callback failed
    pub node: NodeId,
    /// Event being dispatched
    pub event: LifecycleEvent,
    /// The node's error
    #[source]
    pub source: NodeError,
}

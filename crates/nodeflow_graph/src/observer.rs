// SPDX-License-Identifier: MIT OR Apache-2.0
//! Hooks for collaborators that watch a graph (editors, canvases, profilers).
//!
//! Notifications are fire-and-forget; the graph never waits on an observer.

use crate::node::NodeId;

/// Watches a graph
pub trait GraphObserver {
    /// The graph changed and anything drawn from it is stale
    fn set_dirty(&self) {}

    /// A node was attached
    fn node_added(&self, _node: NodeId) {}

    /// A node was removed
    fn node_removed(&self, _node: NodeId) {}

    /// The scheduler started or stopped
    fn running_changed(&self, _running: bool) {}

    /// One tick finished
    fn after_step(&self, _iteration: u64) {}

    /// A `run_step` call finished all of its ticks
    fn after_execute(&self) {}

    /// Whether the observer presents the graph in live mode
    fn is_live(&self) -> bool {
        false
    }
}

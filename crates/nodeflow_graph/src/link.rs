// SPDX-License-Identifier: MIT OR Apache-2.0
//! Link (edge) definitions for the graph.

use crate::node::NodeId;
use crate::slot::SlotType;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a link. Allocated from the graph's counter, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub u32);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A link from an output slot to an input slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Unique link ID
    pub id: LinkId,
    /// Source node ID
    pub origin_id: NodeId,
    /// Source output slot index
    pub origin_slot: usize,
    /// Target node ID
    pub target_id: NodeId,
    /// Target input slot index
    pub target_slot: usize,
    /// Type of the data travelling over the link
    #[serde(rename = "type", default)]
    pub link_type: SlotType,
    /// Data written by the origin node during the last tick. Never persisted.
    #[serde(skip)]
    pub data: Option<Value>,
}

impl Link {
    /// Create a new link
    pub fn new(
        id: LinkId,
        origin_id: NodeId,
        origin_slot: usize,
        target_id: NodeId,
        target_slot: usize,
        link_type: SlotType,
    ) -> Self {
        Self {
            id,
            origin_id,
            origin_slot,
            target_id,
            target_slot,
            link_type,
            data: None,
        }
    }

    /// Check if this link involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.origin_id == node_id || self.target_id == node_id
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node behaviour and the context handed to node callbacks.

use crate::error::NodeError;
use crate::graph::Graph;
use crate::link::Link;
use crate::node::{Node, NodeId};
use crate::serialization::NodeSnapshot;
use crate::slot::{SlotDirection, SlotType};
use crate::value::Value;

/// Lifecycle capabilities of a node.
///
/// Every method has a no-op default, so a behaviour only implements the
/// events it cares about.
pub trait NodeBehavior {
    /// The node was attached to a graph
    fn on_added(&mut self, _ctx: &mut NodeContext<'_>) {}

    /// The node is about to leave the graph; its links are already gone
    fn on_removed(&mut self, _ctx: &mut NodeContext<'_>) {}

    /// The scheduler started
    fn on_start(&mut self, _ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        Ok(())
    }

    /// The scheduler stopped
    fn on_stop(&mut self, _ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        Ok(())
    }

    /// One tick
    fn on_execute(&mut self, _ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        Ok(())
    }

    /// A link was attached to or detached from one of the node's slots
    fn on_connections_change(
        &mut self,
        _ctx: &mut NodeContext<'_>,
        _direction: SlotDirection,
        _slot: usize,
        _connected: bool,
    ) {
    }

    /// Restore node-specific state after the node was attached during a restore
    fn on_configure(&mut self, _ctx: &mut NodeContext<'_>, _snapshot: &NodeSnapshot) {}

    /// External value injection through `Graph::set_input_data`
    fn set_value(&mut self, ctx: &mut NodeContext<'_>, value: Value) {
        ctx.set_property("value", value);
    }
}

/// Behaviour that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct Inert;

impl NodeBehavior for Inert {}

/// View of the graph from one node, handed to every callback
pub struct NodeContext<'g> {
    graph: &'g mut Graph,
    node: NodeId,
}

impl<'g> NodeContext<'g> {
    pub(crate) fn new(graph: &'g mut Graph, node: NodeId) -> Self {
        Self { graph, node }
    }

    /// ID of the node being called
    pub fn id(&self) -> NodeId {
        self.node
    }

    /// The graph
    pub fn graph(&self) -> &Graph {
        &*self.graph
    }

    /// The graph, mutably
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut *self.graph
    }

    /// The node being called. `None` once the callback removed it.
    pub fn node(&self) -> Option<&Node> {
        self.graph.node(self.node)
    }

    /// Position of the node in the current execution order
    pub fn order(&self) -> usize {
        self.node().map_or(0, Node::order)
    }

    /// Get a property of the node
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.node()?.properties.get(name)
    }

    /// Set a property of the node
    pub fn set_property(&mut self, name: impl Into<String>, value: Value) {
        if let Some(node) = self.graph.nodes.get_mut(&self.node) {
            node.properties.insert(name.into(), value);
        }
    }

    /// Link attached to an input slot
    pub fn input_link(&self, slot: usize) -> Option<&Link> {
        let link_id = self.node()?.inputs.get(slot)?.link?;
        self.graph.links.get(&link_id)
    }

    /// Check whether an input slot has a link
    pub fn is_input_connected(&self, slot: usize) -> bool {
        self.node().is_some_and(|node| node.is_input_connected(slot))
    }

    /// Declared type of an input slot
    pub fn input_type(&self, slot: usize) -> Option<&SlotType> {
        Some(&self.node()?.inputs.get(slot)?.slot_type)
    }

    /// Data the upstream node wrote to the link on an input slot
    pub fn input_data(&self, slot: usize) -> Option<&Value> {
        self.input_link(slot)?.data.as_ref()
    }

    /// Write data to an output slot and every link leaving it
    pub fn set_output_data(&mut self, slot: usize, value: Value) {
        self.write_output(slot, Some(value));
    }

    /// Clear the data of an output slot and every link leaving it
    pub fn clear_output_data(&mut self, slot: usize) {
        self.write_output(slot, None);
    }

    fn write_output(&mut self, slot: usize, value: Option<Value>) {
        let Some(output) = self
            .graph
            .nodes
            .get_mut(&self.node)
            .and_then(|node| node.outputs.get_mut(slot))
        else {
            return;
        };
        output.data.clone_from(&value);
        let links = output.links.clone();
        for link_id in links {
            if let Some(link) = self.graph.links.get_mut(&link_id) {
                link.data.clone_from(&value);
            }
        }
    }
}

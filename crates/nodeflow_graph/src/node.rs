// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph engine.

use crate::evaluation::NodeBehavior;
use crate::slot::{InputSlot, OutputSlot, SlotType};
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node. Assigned once by the owning graph, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Input nodes (constants, parameters, graph inputs)
    Input,
    /// Output nodes (result, graph outputs)
    Output,
    /// Math operations
    Math,
    /// Shader code generators
    Shader,
    /// Utility nodes
    Utility,
    /// Custom/user-defined
    Custom,
}

/// When a node takes part in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeMode {
    /// Executed on every tick
    #[default]
    Always,
    /// Never executed; still receives start/stop events
    Never,
}

/// A node instance
pub struct Node {
    pub(crate) id: Option<NodeId>,
    /// Node type ID
    pub node_type: String,
    /// Display title
    pub title: String,
    /// Execution mode
    pub mode: NodeMode,
    /// Input slots
    pub inputs: Vec<InputSlot>,
    /// Output slots
    pub outputs: Vec<OutputSlot>,
    pub(crate) order: usize,
    /// Free-form properties, persisted with the node
    pub properties: IndexMap<String, Value>,
    /// Whether `Graph::remove` may remove this node
    pub removable: bool,
    pub(crate) behavior: Option<Box<dyn NodeBehavior>>,
}

impl Node {
    /// Create a detached node with the given behaviour. The title defaults to the type.
    pub fn new(node_type: impl Into<String>, behavior: impl NodeBehavior + 'static) -> Self {
        Self::with_boxed_behavior(node_type, Box::new(behavior))
    }

    /// Create a detached node from an already boxed behaviour
    pub fn with_boxed_behavior(
        node_type: impl Into<String>,
        behavior: Box<dyn NodeBehavior>,
    ) -> Self {
        let node_type = node_type.into();
        Self {
            id: None,
            title: node_type.clone(),
            node_type,
            mode: NodeMode::Always,
            inputs: Vec::new(),
            outputs: Vec::new(),
            order: 0,
            properties: IndexMap::new(),
            removable: true,
            behavior: Some(behavior),
        }
    }

    /// Preassign an ID. `Graph::add` keeps it unless it is already taken.
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Append an input slot
    pub fn with_input(mut self, name: impl Into<String>, slot_type: SlotType) -> Self {
        self.inputs.push(InputSlot::new(name, slot_type));
        self
    }

    /// Append an output slot
    pub fn with_output(mut self, name: impl Into<String>, slot_type: SlotType) -> Self {
        self.outputs.push(OutputSlot::new(name, slot_type));
        self
    }

    /// Set a property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Set the execution mode
    pub fn with_mode(mut self, mode: NodeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Mark the node as non-removable
    pub fn pinned(mut self) -> Self {
        self.removable = false;
        self
    }

    /// Assigned ID, `None` while detached
    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    /// Position in the last computed execution order
    pub fn order(&self) -> usize {
        self.order
    }

    /// Get an input slot by index
    pub fn input(&self, index: usize) -> Option<&InputSlot> {
        self.inputs.get(index)
    }

    /// Get an output slot by index
    pub fn output(&self, index: usize) -> Option<&OutputSlot> {
        self.outputs.get(index)
    }

    /// Check whether an input slot has a link
    pub fn is_input_connected(&self, index: usize) -> bool {
        self.inputs.get(index).is_some_and(InputSlot::is_connected)
    }

    /// Last value the node wrote to an output slot
    pub fn output_data(&self, index: usize) -> Option<&Value> {
        self.outputs.get(index)?.data.as_ref()
    }

    /// Get a property
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Number of inputs that currently hold a link
    pub fn connected_input_count(&self) -> usize {
        self.inputs.iter().filter(|slot| slot.is_connected()).count()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("node_type", &self.node_type)
            .field("title", &self.title)
            .field("mode", &self.mode)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("order", &self.order)
            .field("properties", &self.properties)
            .field("removable", &self.removable)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Inert;

    #[test]
    fn test_builder() {
        let node = Node::new("math/add", Inert)
            .with_title("sum")
            .with_input("a", SlotType::Number)
            .with_input("b", SlotType::Number)
            .with_output("out", SlotType::Number)
            .with_property("precision", 2);

        assert_eq!(node.id(), None);
        assert_eq!(node.title, "sum");
        assert_eq!(node.inputs.len(), 2);
        assert!(!node.is_input_connected(0));
        assert_eq!(node.property("precision"), Some(&Value::Int(2)));
        assert!(node.removable);
    }
}

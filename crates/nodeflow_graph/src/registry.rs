// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of node types, used to create nodes by type string.

use crate::evaluation::NodeBehavior;
use crate::node::{Node, NodeCategory};
use crate::slot::{InputSlot, OutputSlot, SlotType};
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Creates the behaviour of a fresh node
pub type BehaviorFactory = Rc<dyn Fn() -> Box<dyn NodeBehavior>>;

/// Node type definition (template for creating nodes)
#[derive(Clone)]
pub struct NodeType {
    /// Unique type ID, e.g. `math/add`
    pub id: String,
    /// Display name, used as the title of new nodes
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Input slots
    pub inputs: Vec<InputSlot>,
    /// Output slots
    pub outputs: Vec<OutputSlot>,
    /// Default properties
    pub properties: IndexMap<String, Value>,
    factory: BehaviorFactory,
}

impl NodeType {
    /// Create a node type
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: NodeCategory,
        factory: impl Fn() -> Box<dyn NodeBehavior> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            properties: IndexMap::new(),
            factory: Rc::new(factory),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
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

    /// Set a default property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Create a detached node of this type
    pub fn instantiate(&self) -> Node {
        let mut node = Node::with_boxed_behavior(self.id.clone(), (self.factory)()).with_title(self.name.clone());
        node.inputs.clone_from(&self.inputs);
        node.outputs.clone_from(&self.outputs);
        node.properties.clone_from(&self.properties);
        node
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// Registry of available node types
#[derive(Debug, Default)]
pub struct NodeRegistry {
    /// Registered node types by ID
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type, replacing any type with the same ID
    pub fn register(&mut self, node_type: NodeType) {
        if self.types.contains_key(&node_type.id) {
            tracing::debug!(node_type = %node_type.id, "Replacing registered node type");
        }
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Check whether a type is registered
    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Create a node from a type ID
    pub fn create_node(&self, type_id: &str) -> Option<Node> {
        self.get(type_id).map(NodeType::instantiate)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if no type is registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Inert;

    #[test]
    fn test_create_node_from_type() {
        let mut registry = NodeRegistry::new();
        registry.register(
            NodeType::new("test/scale", "Scale", NodeCategory::Math, || Box::new(Inert))
                .with_input("in", SlotType::Number)
                .with_output("out", SlotType::Number)
                .with_property("factor", 2.0),
        );

        let node = registry.create_node("test/scale").unwrap();
        assert_eq!(node.node_type, "test/scale");
        assert_eq!(node.title, "Scale");
        assert_eq!(node.inputs.len(), 1);
        assert_eq!(node.property("factor"), Some(&Value::Float(2.0)));
        assert!(node.id().is_none());

        assert!(registry.create_node("test/missing").is_none());
        assert_eq!(registry.types_in_category(NodeCategory::Math).count(), 1);
        assert_eq!(registry.types_in_category(NodeCategory::Shader).count(), 0);
    }
}

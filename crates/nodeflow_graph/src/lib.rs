// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dataflow graph engine.
//!
//! This crate provides a graph of typed nodes connected by links that:
//! - Computes a deterministic execution order, tolerating cycles
//! - Drives a tick-based execution loop with lifecycle events
//! - Lets shader nodes compose GLSL fragments into complete programs
//!
//! ## Architecture
//!
//! The framework is built on a generic graph model with:
//! - Typed input/output slots and link validation
//! - Node behaviour through the [`NodeBehavior`] trait
//! - Node creation by type string through a [`NodeRegistry`]
//! - Structural save/restore through [`GraphSnapshot`]

pub mod error;
pub mod evaluation;
pub mod globals;
pub mod graph;
pub mod link;
pub mod node;
pub mod nodes;
pub mod observer;
pub mod order;
pub mod registry;
pub mod scheduler;
pub mod serialization;
pub mod settings;
pub mod shader;
pub mod slot;
pub mod value;

pub use error::{ExecutionError, GraphError, NodeError};
pub use evaluation::{Inert, NodeBehavior, NodeContext};
pub use globals::GlobalSlot;
pub use graph::{ConnectionError, Graph};
pub use link::{Link, LinkId};
pub use node::{Node, NodeCategory, NodeId, NodeMode};
pub use observer::GraphObserver;
pub use registry::{NodeRegistry, NodeType};
pub use scheduler::{LifecycleEvent, RunState};
pub use serialization::{GraphSnapshot, NodeSnapshot, SnapshotError};
pub use settings::{ErrorPolicy, Settings};
pub use shader::{CodeBlock, CodePiece, ComposerLibrary, FunctionComposer, Scope, ShaderCode};
pub use slot::{InputSlot, OutputSlot, SlotDirection, SlotType};
pub use value::Value;

/// Registry with every built-in node type, including one shader function
/// node per composer in `library`
pub fn create_default_registry(library: &ComposerLibrary) -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    nodes::register_basic_nodes(&mut registry);
    shader::register_shader_nodes(&mut registry, library);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let library = ComposerLibrary::builtin();
        let registry = create_default_registry(&library);

        for type_id in ["basic/const", "basic/watch", "math/add", "graph/input", "graph/output"] {
            assert!(registry.contains(type_id), "missing {type_id}");
        }
        assert!(registry.contains("shader/output"));
        assert_eq!(registry.types_in_category(NodeCategory::Shader).count(), library.len());
    }
}

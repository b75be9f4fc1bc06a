// SPDX-License-Identifier: MIT OR Apache-2.0
//! General purpose nodes: constants, watches, arithmetic and graph I/O.

use crate::error::NodeError;
use crate::evaluation::{NodeBehavior, NodeContext};
use crate::node::NodeCategory;
use crate::registry::{NodeRegistry, NodeType};
use crate::serialization::NodeSnapshot;
use crate::slot::SlotType;
use crate::value::Value;

/// Emits property `value` on every tick
#[derive(Debug, Default)]
pub struct Const;

impl NodeBehavior for Const {
    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let value = ctx.property("value").cloned().unwrap_or_default();
        ctx.set_output_data(0, value);
        Ok(())
    }
}

/// Keeps the last value seen on its input in property `value`
#[derive(Debug, Default)]
pub struct Watch;

impl NodeBehavior for Watch {
    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let value = ctx.input_data(0).cloned().unwrap_or_default();
        ctx.set_property("value", value);
        Ok(())
    }
}

/// Adds its two inputs. A disconnected input reads property `a` or `b`.
#[derive(Debug, Default)]
pub struct Add;

impl Add {
    fn operand(ctx: &NodeContext<'_>, slot: usize, property: &str) -> Result<f32, NodeError> {
        let value = match ctx.input_data(slot) {
            Some(value) => value,
            None => match ctx.property(property) {
                Some(value) => value,
                None => return Err(NodeError::MissingInput(slot)),
            },
        };
        value.as_float().ok_or_else(|| NodeError::TypeMismatch {
            slot,
            expected: SlotType::Number.to_string(),
        })
    }
}

impl NodeBehavior for Add {
    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let sum = Self::operand(ctx, 0, "a")? + Self::operand(ctx, 1, "b")?;
        ctx.set_output_data(0, Value::Float(sum));
        Ok(())
    }
}

fn global_name(ctx: &NodeContext<'_>) -> Option<String> {
    ctx.property("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn declared_type(ctx: &NodeContext<'_>) -> SlotType {
    ctx.property("type")
        .and_then(Value::as_str)
        .map(SlotType::from)
        .unwrap_or(SlotType::Number)
}

/// Reads the global input named by property `name`.
/// The global is registered when the node joins the graph.
#[derive(Debug, Default)]
pub struct GraphInput;

impl GraphInput {
    fn register(ctx: &mut NodeContext<'_>) {
        let Some(name) = global_name(ctx) else {
            return;
        };
        let slot_type = declared_type(ctx);
        ctx.graph_mut().add_global_input(name, slot_type, Value::Null);
    }
}

impl NodeBehavior for GraphInput {
    fn on_added(&mut self, ctx: &mut NodeContext<'_>) {
        Self::register(ctx);
    }

    fn on_configure(&mut self, ctx: &mut NodeContext<'_>, _snapshot: &NodeSnapshot) {
        Self::register(ctx);
    }

    fn on_removed(&mut self, ctx: &mut NodeContext<'_>) {
        if let Some(name) = global_name(ctx) {
            ctx.graph_mut().remove_global_input(&name);
        }
    }

    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let value = global_name(ctx)
            .and_then(|name| ctx.graph().global_input(&name))
            .map(|slot| slot.value.clone())
            .unwrap_or_default();
        ctx.set_output_data(0, value);
        Ok(())
    }

    /// Values injected by title go straight into the global
    fn set_value(&mut self, ctx: &mut NodeContext<'_>, value: Value) {
        if let Some(name) = global_name(ctx) {
            ctx.graph_mut().set_global_input(&name, value);
        }
    }
}

/// Writes its input to the global output named by property `name`
#[derive(Debug, Default)]
pub struct GraphOutput;

impl GraphOutput {
    fn register(ctx: &mut NodeContext<'_>) {
        let Some(name) = global_name(ctx) else {
            return;
        };
        let slot_type = declared_type(ctx);
        ctx.graph_mut().add_global_output(name, slot_type, Value::Null);
    }
}

impl NodeBehavior for GraphOutput {
    fn on_added(&mut self, ctx: &mut NodeContext<'_>) {
        Self::register(ctx);
    }

    fn on_configure(&mut self, ctx: &mut NodeContext<'_>, _snapshot: &NodeSnapshot) {
        Self::register(ctx);
    }

    fn on_removed(&mut self, ctx: &mut NodeContext<'_>) {
        if let Some(name) = global_name(ctx) {
            ctx.graph_mut().remove_global_output(&name);
        }
    }

    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let Some(name) = global_name(ctx) else {
            return Ok(());
        };
        let value = ctx.input_data(0).cloned().unwrap_or_default();
        ctx.graph_mut().set_global_output(&name, value);
        Ok(())
    }
}

/// Register the general purpose node types
pub fn register_basic_nodes(registry: &mut NodeRegistry) {
    registry.register(
        NodeType::new("basic/const", "Const", NodeCategory::Input, || Box::new(Const))
            .with_description("Constant number")
            .with_output("value", SlotType::Number)
            .with_property("value", 1.0),
    );

    registry.register(
        NodeType::new("basic/watch", "Watch", NodeCategory::Utility, || Box::new(Watch))
            .with_description("Shows the value of its input")
            .with_input("value", SlotType::Any),
    );

    registry.register(
        NodeType::new("math/add", "Add", NodeCategory::Math, || Box::new(Add))
            .with_description("Sum of two numbers")
            .with_input("a", SlotType::Number)
            .with_input("b", SlotType::Number)
            .with_output("sum", SlotType::Number)
            .with_property("a", 0.0)
            .with_property("b", 0.0),
    );

    registry.register(
        NodeType::new("graph/input", "Input", NodeCategory::Input, || Box::new(GraphInput))
            .with_description("Reads a global input of the graph")
            .with_output("value", SlotType::Any)
            .with_property("name", "")
            .with_property("type", "number"),
    );

    registry.register(
        NodeType::new("graph/output", "Output", NodeCategory::Output, || Box::new(GraphOutput))
            .with_description("Writes a global output of the graph")
            .with_input("value", SlotType::Any)
            .with_property("name", "")
            .with_property("type", "number"),
    );
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader graph nodes: constants, inputs, function calls and the program output.
//!
//! Every tick each node rebuilds its [`ShaderCode`] from the code arriving on
//! its inputs and writes it to output 0 as [`Value::Code`]. The output node
//! assembles the final program and publishes it as the global outputs
//! `vertex_shader` and `fragment_shader`.

use super::code::{var_name, Scope, ShaderCode, ShaderTemplate};
use super::composer::{input_code, process_input_code, ComposerLibrary, FunctionComposer};
use crate::error::NodeError;
use crate::evaluation::{NodeBehavior, NodeContext};
use crate::node::NodeCategory;
use crate::registry::{NodeRegistry, NodeType};
use crate::slot::SlotType;
use crate::value::Value;

/// Global output receiving the vertex program
pub const VERTEX_SHADER_GLOBAL: &str = "vertex_shader";
/// Global output receiving the fragment program
pub const FRAGMENT_SHADER_GLOBAL: &str = "fragment_shader";

fn scope_of(ctx: &NodeContext<'_>) -> Scope {
    ctx.property("scope")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

/// Code for a property value: shader code as is, numbers and vectors as literals
fn literal_code(value: &Value) -> Option<ShaderCode> {
    match value {
        Value::Code(code) => Some(code.clone()),
        other => other.to_glsl().map(|literal| ShaderCode::expression(literal, other.slot_type())),
    }
}

// ============================================================================
// Constant
// ============================================================================

/// Declares a typed constant from property `value`
#[derive(Debug, Default)]
pub struct ShaderConst;

impl NodeBehavior for ShaderConst {
    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let value = ctx.property("value").cloned().unwrap_or_default();
        let (Some(literal), Some(type_name)) = (value.to_glsl(), value.slot_type().glsl_name()) else {
            ctx.clear_output_data(0);
            return Err(NodeError::InvalidProperty("value".into()));
        };

        let var = var_name(ctx.id(), 0);
        let statement = format!("{type_name} {var} = {literal};");
        let mut code = ShaderCode::expression(var, value.slot_type());
        code.set_order(ctx.order() as i64);
        code.vertex.push_statement(statement.clone());
        code.fragment.push_statement(statement);

        ctx.set_output_data(0, Value::Code(code));
        Ok(())
    }
}

// ============================================================================
// Input (attribute / uniform / varying)
// ============================================================================

/// References a shader input by name.
///
/// Properties: `name`, `type` and `qualifier` (`uniform`, `attribute`,
/// `varying`, or `builtin` for names the template already declares).
#[derive(Debug, Default)]
pub struct ShaderInput;

impl NodeBehavior for ShaderInput {
    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let name = ctx.property("name").and_then(Value::as_str).unwrap_or_default().to_string();
        if name.is_empty() {
            ctx.clear_output_data(0);
            return Ok(());
        }
        let slot_type = SlotType::from(ctx.property("type").and_then(Value::as_str).unwrap_or("float"));
        let Some(type_name) = slot_type.glsl_name() else {
            return Err(NodeError::TypeMismatch { slot: 0, expected: "a GLSL type".into() });
        };
        let qualifier = ctx.property("qualifier").and_then(Value::as_str).unwrap_or("uniform");

        let mut code = ShaderCode::expression(name.clone(), slot_type.clone());
        if qualifier != "builtin" {
            code = code.with_include(name.clone(), format!("{qualifier} {type_name} {name};"));
        }
        ctx.set_output_data(0, Value::Code(code));
        Ok(())
    }
}

// ============================================================================
// Function call
// ============================================================================

/// Calls one GLSL function on its inputs.
///
/// A disconnected input falls back to the property named after its
/// parameter; without one the node produces no code.
#[derive(Debug, Clone)]
pub struct FunctionNode {
    composer: FunctionComposer,
}

impl FunctionNode {
    /// Create a node behaviour for a composer
    pub fn new(composer: FunctionComposer) -> Self {
        Self { composer }
    }

    fn null_code(&self, ctx: &NodeContext<'_>, slot: usize) -> Option<ShaderCode> {
        let (name, _) = self.composer.params.get(slot)?;
        literal_code(ctx.property(name)?)
    }
}

impl NodeBehavior for FunctionNode {
    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let view: &NodeContext<'_> = ctx;
        let code = process_input_code(view, &self.composer, scope_of(view), |slot| self.null_code(view, slot));
        match code {
            Some(code) => ctx.set_output_data(0, Value::Code(code)),
            None => ctx.clear_output_data(0),
        }
        Ok(())
    }
}

// ============================================================================
// Output
// ============================================================================

/// Assembles the vertex and fragment programs from the code on input 0
#[derive(Debug, Default)]
pub struct ShaderOutput {
    template: ShaderTemplate,
}

impl ShaderOutput {
    /// Create an output using custom templates
    pub fn with_template(template: ShaderTemplate) -> Self {
        Self { template }
    }
}

impl NodeBehavior for ShaderOutput {
    fn on_added(&mut self, ctx: &mut NodeContext<'_>) {
        let graph = ctx.graph_mut();
        graph.add_global_output(VERTEX_SHADER_GLOBAL, SlotType::String, Value::Null);
        graph.add_global_output(FRAGMENT_SHADER_GLOBAL, SlotType::String, Value::Null);
    }

    fn on_removed(&mut self, ctx: &mut NodeContext<'_>) {
        let id = ctx.id();
        let Some(node_type) = ctx.node().map(|node| node.node_type.clone()) else {
            return;
        };
        // the programs stay published while another output node remains
        if ctx.graph().find_nodes_by_type(&node_type).any(|node| node.id() != Some(id)) {
            return;
        }
        let graph = ctx.graph_mut();
        graph.remove_global_output(VERTEX_SHADER_GLOBAL);
        graph.remove_global_output(FRAGMENT_SHADER_GLOBAL);
    }

    fn on_execute(&mut self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let (vertex, fragment) = match input_code(ctx, 0) {
            Some(code) => {
                let program = self.template.assemble(code);
                (Value::String(program.vertex), Value::String(program.fragment))
            }
            None => (Value::Null, Value::Null),
        };
        let graph = ctx.graph_mut();
        graph.set_global_output(VERTEX_SHADER_GLOBAL, vertex);
        graph.set_global_output(FRAGMENT_SHADER_GLOBAL, fragment);
        Ok(())
    }
}

/// Register the shader node types, with one `shader/<fn>` node per composer
pub fn register_shader_nodes(registry: &mut NodeRegistry, library: &ComposerLibrary) {
    registry.register(
        NodeType::new("shader/const", "Constant", NodeCategory::Input, || Box::new(ShaderConst))
            .with_description("Typed constant")
            .with_output("out", SlotType::Generic)
            .with_property("value", 1.0),
    );

    registry.register(
        NodeType::new("shader/input", "Shader Input", NodeCategory::Input, || Box::new(ShaderInput))
            .with_description("Attribute, uniform or varying reference")
            .with_output("out", SlotType::Generic)
            .with_property("name", "")
            .with_property("type", "float")
            .with_property("qualifier", "uniform"),
    );

    registry.register(
        NodeType::new("shader/output", "Shader Output", NodeCategory::Output, || {
            Box::new(ShaderOutput::default())
        })
        .with_description("Assembles the vertex and fragment programs")
        .with_input("color", SlotType::Generic),
    );

    for composer in library.iter() {
        let behavior = FunctionNode::new(composer.clone());
        let mut node_type = NodeType::new(
            format!("shader/{}", composer.name),
            composer.name.clone(),
            NodeCategory::Shader,
            move || Box::new(behavior.clone()),
        )
        .with_description(format!("Calls {}()", composer.name))
        .with_output("out", composer.return_type.clone())
        .with_property("scope", "fragment");
        for (name, slot_type) in &composer.params {
            node_type = node_type.with_input(name.clone(), slot_type.clone());
        }
        registry.register(node_type);
    }
}

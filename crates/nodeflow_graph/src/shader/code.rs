// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mergeable units of generated shader code.

use crate::node::NodeId;
use crate::slot::SlotType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shader stage(s) a piece of code is emitted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scope {
    /// Vertex stage only
    Vertex,
    /// Fragment stage only
    #[default]
    Fragment,
    /// Both stages
    Both,
}

impl Scope {
    /// Check whether code for this scope goes into the vertex stage
    pub fn includes_vertex(self) -> bool {
        matches!(self, Self::Vertex | Self::Both)
    }

    /// Check whether code for this scope goes into the fragment stage
    pub fn includes_fragment(self) -> bool {
        matches!(self, Self::Fragment | Self::Both)
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vertex" | "vs" => Ok(Self::Vertex),
            "fragment" | "fs" => Ok(Self::Fragment),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown shader scope '{other}'")),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Both => "both",
        })
    }
}

/// One statement and the execution order position of the node that emitted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Position of the producing node in the execution order
    pub order: i64,
    /// GLSL statement
    pub statement: String,
}

/// Code generated for one shader stage.
///
/// `includes` holds declarations shared between pieces (uniforms, helper
/// functions), keyed so that merging deduplicates them. `blocks` holds the
/// statements sorted by `order`, so a statement always follows the ones it
/// reads from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CodePiece {
    /// Statements, lowest order first
    pub blocks: Vec<CodeBlock>,
    /// Declarations by key
    pub includes: IndexMap<String, String>,
    /// Position of the producing node in the execution order
    pub order: i64,
    /// Variable holding the result
    pub output_var: String,
}

impl CodePiece {
    /// Order of a piece that was never stamped
    pub const UNORDERED: i64 = -1;

    /// Create a piece from newline-separated statements and a result variable
    pub fn new(body: &str, output_var: impl Into<String>) -> Self {
        let blocks = body
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| CodeBlock { order: Self::UNORDERED, statement: line.to_string() })
            .collect();
        Self {
            blocks,
            includes: IndexMap::new(),
            order: Self::UNORDERED,
            output_var: output_var.into(),
        }
    }

    /// Add a declaration
    pub fn with_include(mut self, key: impl Into<String>, snippet: impl Into<String>) -> Self {
        self.includes.insert(key.into(), snippet.into());
        self
    }

    /// Append a statement stamped with the piece's own order
    pub fn push_statement(&mut self, statement: impl Into<String>) {
        self.blocks.push(CodeBlock { order: self.order, statement: statement.into() });
    }

    /// Stamp the piece. Statements that were never stamped take the same order.
    pub fn set_order(&mut self, order: i64) {
        self.order = order;
        for block in self.blocks.iter_mut().filter(|block| block.order == Self::UNORDERED) {
            block.order = order;
        }
    }

    /// Statements joined by newlines
    pub fn body(&self) -> String {
        self.blocks
            .iter()
            .map(|block| block.statement.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check whether the piece contributes nothing
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.includes.is_empty()
    }

    /// Merge another piece into this one.
    ///
    /// Includes are unioned, the incoming snippet replacing an existing one
    /// under the same key. Incoming statements already present are dropped,
    /// the rest are placed by `order`; on a tie the receiver's statements stay
    /// first.
    pub fn merge(&mut self, other: &CodePiece) {
        for (key, snippet) in &other.includes {
            self.includes.insert(key.clone(), snippet.clone());
        }

        for block in &other.blocks {
            if self.blocks.iter().any(|existing| existing.statement == block.statement) {
                continue;
            }
            let at = self
                .blocks
                .iter()
                .position(|existing| existing.order > block.order)
                .unwrap_or(self.blocks.len());
            self.blocks.insert(at, block.clone());
        }
    }

    /// Declarations joined in insertion order
    pub fn includes_text(&self) -> String {
        self.includes.values().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

/// Code for both shader stages plus the type of the produced variable.
///
/// The empty result of a composition is represented as `Option::None` by
/// callers; merging it is simply skipped.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShaderCode {
    /// Vertex stage
    pub vertex: CodePiece,
    /// Fragment stage
    pub fragment: CodePiece,
    /// GLSL type of the result variable
    pub output_type: SlotType,
}

impl ShaderCode {
    /// Create shader code from two stage pieces
    pub fn new(vertex: CodePiece, fragment: CodePiece, output_type: SlotType) -> Self {
        Self { vertex, fragment, output_type }
    }

    /// Code with no statements whose result is an expression, such as a literal
    /// or an attribute name
    pub fn expression(expr: impl Into<String>, output_type: SlotType) -> Self {
        let expr = expr.into();
        Self::new(
            CodePiece::new("", expr.clone()),
            CodePiece::new("", expr),
            output_type,
        )
    }

    /// Add the same declaration to both stages
    pub fn with_include(mut self, key: impl Into<String>, snippet: impl Into<String>) -> Self {
        let (key, snippet) = (key.into(), snippet.into());
        self.vertex.includes.insert(key.clone(), snippet.clone());
        self.fragment.includes.insert(key, snippet);
        self
    }

    /// Merge stage by stage
    pub fn merge(&mut self, other: &ShaderCode) {
        self.vertex.merge(&other.vertex);
        self.fragment.merge(&other.fragment);
    }

    /// Stamp both stages with an execution order position
    pub fn set_order(&mut self, order: i64) {
        self.vertex.set_order(order);
        self.fragment.set_order(order);
    }

    /// Result variable, preferring the fragment stage
    pub fn output_var(&self) -> &str {
        if self.fragment.output_var.is_empty() {
            &self.vertex.output_var
        } else {
            &self.fragment.output_var
        }
    }
}

/// Name of the variable holding the value of a node's output slot
pub fn var_name(node: NodeId, slot: usize) -> String {
    format!("v{node}_{slot}")
}

/// Expand an expression of a shader type to a `vec4`
pub fn to_vec4(expr: &str, slot_type: &SlotType) -> String {
    match slot_type {
        SlotType::Float => format!("vec4({expr},{expr},{expr},1.0)"),
        SlotType::Vec2 => format!("vec4({expr},0.0,1.0)"),
        SlotType::Vec3 => format!("vec4({expr},1.0)"),
        _ => expr.to_string(),
    }
}

/// Templates the generated code is spliced into.
///
/// Placeholders: `{{includes}}`, `{{body}}` and, in the fragment template,
/// `{{color}}` for the final colour expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderTemplate {
    /// Vertex program template
    pub vertex: String,
    /// Fragment program template
    pub fragment: String,
}

impl Default for ShaderTemplate {
    fn default() -> Self {
        Self {
            vertex: "\
precision mediump float;
attribute vec3 a_vertex;
attribute vec3 a_normal;
attribute vec2 a_coord;
varying vec3 v_pos;
varying vec3 v_normal;
varying vec2 v_coord;
uniform mat4 u_model;
uniform mat4 u_viewprojection;
{{includes}}
void main() {
    v_coord = a_coord;
    v_normal = (u_model * vec4(a_normal, 0.0)).xyz;
    v_pos = (u_model * vec4(a_vertex, 1.0)).xyz;
{{body}}
    gl_Position = u_viewprojection * vec4(v_pos, 1.0);
}
"
            .to_string(),
            fragment: "\
precision mediump float;
varying vec3 v_pos;
varying vec3 v_normal;
varying vec2 v_coord;
{{includes}}
void main() {
{{body}}
    gl_FragColor = {{color}};
}
"
            .to_string(),
        }
    }
}

/// A complete generated vertex and fragment program
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShaderProgram {
    /// Vertex program source
    pub vertex: String,
    /// Fragment program source
    pub fragment: String,
}

impl ShaderTemplate {
    /// Splice generated code into the templates.
    /// The fragment colour is the code's result widened to `vec4`.
    pub fn assemble(&self, code: &ShaderCode) -> ShaderProgram {
        let color = to_vec4(&code.fragment.output_var, &code.output_type);
        ShaderProgram {
            vertex: splice(&self.vertex, &code.vertex, None),
            fragment: splice(&self.fragment, &code.fragment, Some(&color)),
        }
    }
}

fn splice(template: &str, piece: &CodePiece, color: Option<&str>) -> String {
    let body: String = piece
        .blocks
        .iter()
        .map(|block| format!("    {}\n", block.statement))
        .collect();
    let mut text = template
        .replace("{{includes}}", &piece.includes_text())
        .replace("{{body}}\n", &body);
    if let Some(color) = color {
        text = text.replace("{{color}}", color);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn piece(body: &str, order: i64) -> CodePiece {
        let mut piece = CodePiece::new(body, "x");
        piece.set_order(order);
        piece
    }

    #[test]
    fn test_merge_orders_bodies_by_order_field() {
        let mut late = piece("float b = a;", 5);
        late.merge(&piece("float a = 1.0;", 2));
        assert_eq!(late.body(), "float a = 1.0;\nfloat b = a;");

        let mut early = piece("float a = 1.0;", 2);
        early.merge(&piece("float b = a;", 5));
        assert_eq!(early.body(), "float a = 1.0;\nfloat b = a;");
    }

    #[test]
    fn test_merge_sorts_siblings_regardless_of_call_sequence() {
        let mut sink = piece("float d = c + a;", 9);
        sink.merge(&piece("float c = 3.0;", 3));
        sink.merge(&piece("float a = 1.0;", 1));
        sink.merge(&piece("float b = 2.0;", 2));
        assert_eq!(sink.body(), "float a = 1.0;\nfloat b = 2.0;\nfloat c = 3.0;\nfloat d = c + a;");
    }

    #[test]
    fn test_merge_drops_repeated_statements() {
        let shared = piece("float x = 1.0;", 0);
        let mut left = piece("float l = sin(x);", 1);
        left.merge(&shared);
        let mut right = piece("float r = cos(x);", 2);
        right.merge(&shared);

        let mut sink = piece("float m = max(l,r);", 3);
        sink.merge(&left);
        sink.merge(&right);
        assert_eq!(
            sink.body(),
            "float x = 1.0;\nfloat l = sin(x);\nfloat r = cos(x);\nfloat m = max(l,r);"
        );
    }

    #[test]
    fn test_merge_dedupes_includes_last_writer_wins() {
        let mut base = CodePiece::new("", "x").with_include("u_time", "uniform float u_time;");
        base.merge(&CodePiece::new("", "y").with_include("u_time", "uniform highp float u_time;"));
        assert_eq!(base.includes.len(), 1);
        assert_eq!(base.includes["u_time"], "uniform highp float u_time;");
    }

    #[test]
    fn test_merging_empty_is_noop() {
        let mut code = ShaderCode::expression("a_coord", SlotType::Vec2).with_include("k", "v");
        let before = code.clone();
        code.merge(&ShaderCode::default());
        assert_eq!(code, before);
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("Vertex".parse::<Scope>(), Ok(Scope::Vertex));
        assert_eq!("fs".parse::<Scope>(), Ok(Scope::Fragment));
        assert!(Scope::Both.includes_vertex() && Scope::Both.includes_fragment());
        assert!(!Scope::Fragment.includes_vertex());
        assert!("geometry".parse::<Scope>().is_err());
    }

    #[test]
    fn test_assemble_widens_color() {
        let mut code = ShaderCode::expression("v3_0", SlotType::Float);
        code.fragment.push_statement("float v3_0 = 0.5;");
        let program = ShaderTemplate::default().assemble(&code);

        assert!(program.fragment.contains("    float v3_0 = 0.5;\n"));
        assert!(program.fragment.contains("gl_FragColor = vec4(v3_0,v3_0,v3_0,1.0);"));
        assert!(!program.vertex.contains("{{"));
        assert!(!program.fragment.contains("{{"));
    }

    fn includes_strategy() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::vec("[a-e]", 0..6)
    }

    fn with_keys(keys: &[String]) -> CodePiece {
        keys.iter().fold(CodePiece::new("", "x"), |piece, key| {
            let snippet = format!("uniform float {key};");
            piece.with_include(key.clone(), snippet)
        })
    }

    proptest! {
        #[test]
        fn prop_merge_includes_order_independent(
            base in includes_strategy(),
            a in includes_strategy(),
            b in includes_strategy(),
        ) {
            let (base, a, b) = (with_keys(&base), with_keys(&a), with_keys(&b));

            let mut ab = base.clone();
            ab.merge(&a);
            ab.merge(&b);
            let mut ba = base.clone();
            ba.merge(&b);
            ba.merge(&a);

            let mut ab_keys: Vec<_> = ab.includes.iter().collect();
            let mut ba_keys: Vec<_> = ba.includes.iter().collect();
            ab_keys.sort();
            ba_keys.sort();
            prop_assert_eq!(ab_keys, ba_keys);

            // re-merging changes nothing
            let mut again = ab.clone();
            again.merge(&a);
            prop_assert_eq!(again.includes, ab.includes);
        }
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Function composers: build the code of a node from the code of its inputs.

use super::code::{var_name, CodePiece, Scope, ShaderCode};
use crate::evaluation::NodeContext;
use crate::slot::SlotType;
use indexmap::IndexMap;

/// Wraps a GLSL function call.
///
/// `Generic` in `return_type` means "same type as the first argument".
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionComposer {
    /// Function name as called in GLSL
    pub name: String,
    /// Declared result type
    pub return_type: SlotType,
    /// Parameter names and types
    pub params: Vec<(String, SlotType)>,
    /// Declarations the call depends on, for functions that are not built in
    pub includes: IndexMap<String, String>,
}

impl FunctionComposer {
    /// Create a composer for a function
    pub fn new(name: impl Into<String>, return_type: SlotType) -> Self {
        Self {
            name: name.into(),
            return_type,
            params: Vec::new(),
            includes: IndexMap::new(),
        }
    }

    /// Append a parameter
    pub fn with_param(mut self, name: impl Into<String>, slot_type: SlotType) -> Self {
        self.params.push((name.into(), slot_type));
        self
    }

    /// Declare a helper the call depends on
    pub fn with_include(mut self, key: impl Into<String>, snippet: impl Into<String>) -> Self {
        self.includes.insert(key.into(), snippet.into());
        self
    }

    /// Number of parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Generate `<type> <out_var> = <name>(<args>);` for the stages in `scope`.
    ///
    /// The declared type is `out_type` when given, otherwise the return type.
    /// Stages outside `scope` get an empty body but still name `out_var`.
    pub fn get_code(
        &self,
        out_var: &str,
        args: &[&str],
        scope: Scope,
        out_type: Option<&SlotType>,
    ) -> ShaderCode {
        let result_type = out_type.unwrap_or(&self.return_type).clone();
        let type_name = result_type
            .glsl_name()
            .map_or_else(|| result_type.to_string(), str::to_string);
        let statement = format!("{type_name} {out_var} = {}({});", self.name, args.join(","));

        let stage = |enabled: bool| {
            let mut piece = CodePiece::new(if enabled { statement.as_str() } else { "" }, out_var);
            if enabled {
                piece.includes.clone_from(&self.includes);
            }
            piece
        };
        ShaderCode::new(
            stage(scope.includes_vertex()),
            stage(scope.includes_fragment()),
            result_type,
        )
    }

    /// Three-argument form of [`FunctionComposer::get_code`]
    pub fn get_code3(
        &self,
        out_var: &str,
        a: &str,
        b: &str,
        c: &str,
        scope: Scope,
        out_type: Option<&SlotType>,
    ) -> ShaderCode {
        self.get_code(out_var, &[a, b, c], scope, out_type)
    }
}

/// Read-only catalog of composers keyed by function name
#[derive(Debug, Clone, Default)]
pub struct ComposerLibrary {
    composers: IndexMap<String, FunctionComposer>,
}

impl ComposerLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Library with the common GLSL built-ins
    pub fn builtin() -> Self {
        use SlotType::{Float, Generic, Vec3};

        let unary = |name: &str| FunctionComposer::new(name, Generic).with_param("x", Generic);
        let binary = |name: &str, ret: SlotType| {
            FunctionComposer::new(name, ret)
                .with_param("a", Generic)
                .with_param("b", Generic)
        };

        let mut library = Self::new();
        for name in ["sin", "cos", "fract", "abs", "floor", "normalize"] {
            library.register(unary(name));
        }
        library.register(FunctionComposer::new("length", Float).with_param("x", Generic));
        for name in ["pow", "max", "min", "mod", "step"] {
            library.register(binary(name, Generic));
        }
        library.register(binary("dot", Float));
        library.register(binary("distance", Float));
        library.register(
            FunctionComposer::new("mix", Generic)
                .with_param("a", Generic)
                .with_param("b", Generic)
                .with_param("f", Float),
        );
        library.register(
            FunctionComposer::new("clamp", Generic)
                .with_param("x", Generic)
                .with_param("min", Float)
                .with_param("max", Float),
        );
        library.register(
            FunctionComposer::new("smoothstep", Generic)
                .with_param("edge0", Float)
                .with_param("edge1", Float)
                .with_param("x", Generic),
        );
        library.register(
            FunctionComposer::new("luminance", Float)
                .with_param("color", Vec3)
                .with_include(
                    "luminance",
                    "float luminance(vec3 c) { return dot(c, vec3(0.2126,0.7152,0.0722)); }",
                ),
        );
        library
    }

    /// Add or replace a composer
    pub fn register(&mut self, composer: FunctionComposer) {
        self.composers.insert(composer.name.clone(), composer);
    }

    /// Look up a composer by function name
    pub fn get(&self, name: &str) -> Option<&FunctionComposer> {
        self.composers.get(name)
    }

    /// All composers in registration order
    pub fn iter(&self) -> impl Iterator<Item = &FunctionComposer> {
        self.composers.values()
    }

    /// Number of composers
    pub fn len(&self) -> usize {
        self.composers.len()
    }

    /// Check if the library is empty
    pub fn is_empty(&self) -> bool {
        self.composers.is_empty()
    }
}

/// Shader code arriving on an input slot
pub fn input_code<'a>(ctx: &'a NodeContext<'_>, slot: usize) -> Option<&'a ShaderCode> {
    ctx.input_data(slot)?.as_code()
}

/// Build the code of a function node from the code on its inputs.
///
/// Each parameter takes the upstream code on its slot, or `null_code(slot)`
/// when nothing arrives. If any parameter stays empty the result is `None`.
/// Upstream pieces are merged into the node's own piece in the sequence
/// C, A, B for three parameters and in slot order otherwise.
pub fn process_input_code(
    ctx: &NodeContext<'_>,
    composer: &FunctionComposer,
    scope: Scope,
    null_code: impl Fn(usize) -> Option<ShaderCode>,
) -> Option<ShaderCode> {
    let mut inputs = Vec::with_capacity(composer.arity());
    for slot in 0..composer.arity() {
        let code = input_code(ctx, slot).cloned().or_else(|| null_code(slot))?;
        inputs.push(code);
    }

    let out_type = match composer.return_type {
        SlotType::Generic => inputs
            .iter()
            .zip(&composer.params)
            .find(|(_, (_, param_type))| *param_type == SlotType::Generic)
            .map(|(code, _)| code.output_type.clone()),
        _ => None,
    };
    let args: Vec<&str> = inputs.iter().map(ShaderCode::output_var).collect();
    let out_var = var_name(ctx.id(), 0);

    let mut code = composer.get_code(&out_var, &args, scope, out_type.as_ref());
    code.set_order(ctx.order() as i64);

    let sequence: Vec<usize> = match inputs.len() {
        3 => vec![2, 0, 1],
        n => (0..n).collect(),
    };
    for index in sequence {
        code.merge(&inputs[index]);
    }
    Some(code)
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader code composition.
//!
//! Nodes of a shader graph each produce a small piece of GLSL and hand it
//! downstream over their links. Pieces merge by execution order while shared
//! declarations are deduplicated, so the output node ends up with a complete
//! program body.

pub mod code;
pub mod composer;
pub mod nodes;

pub use code::{var_name, CodeBlock, CodePiece, Scope, ShaderCode, ShaderProgram, ShaderTemplate};
pub use composer::{input_code, process_input_code, ComposerLibrary, FunctionComposer};
pub use nodes::{register_shader_nodes, FRAGMENT_SHADER_GLOBAL, VERTEX_SHADER_GLOBAL};

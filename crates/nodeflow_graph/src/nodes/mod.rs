// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node types.

pub mod basic;

pub use basic::{register_basic_nodes, Add, Const, GraphInput, GraphOutput, Watch};

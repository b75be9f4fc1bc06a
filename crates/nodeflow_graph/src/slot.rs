// SPDX-License-Identifier: MIT OR Apache-2.0
//! Slot definitions for node inputs/outputs.

use crate::link::LinkId;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Slot direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotDirection {
    /// Input slot
    Input,
    /// Output slot
    Output,
}

/// Data type declared by a slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlotType {
    /// Scalar float
    Float,
    /// 2D vector
    Vec2,
    /// 3D vector
    Vec3,
    /// 4D vector / Color
    Vec4,
    /// 3x3 matrix
    Mat3,
    /// 4x4 matrix
    Mat4,
    /// 2D texture sampler
    Sampler2D,
    /// Boolean
    Bool,
    /// Integer
    Int,
    /// Any numeric value (non-shader graphs)
    Number,
    /// String value
    String,
    /// Accepts every type
    #[default]
    Any,
    /// Type variable accepting the shader types of the graph
    Generic,
    /// Custom type
    Custom(String),
}

impl SlotType {
    /// Types a [`SlotType::Generic`] slot accepts
    pub const SHADER_TYPES: [SlotType; 4] = [Self::Float, Self::Vec2, Self::Vec3, Self::Vec4];

    /// Check whether this is one of the graph-supported shader types
    pub fn is_shader_type(&self) -> bool {
        Self::SHADER_TYPES.contains(self)
    }

    /// GLSL spelling of a concrete type
    pub fn glsl_name(&self) -> Option<&'static str> {
        match self {
            Self::Float => Some("float"),
            Self::Vec2 => Some("vec2"),
            Self::Vec3 => Some("vec3"),
            Self::Vec4 => Some("vec4"),
            Self::Mat3 => Some("mat3"),
            Self::Mat4 => Some("mat4"),
            Self::Sampler2D => Some("sampler2D"),
            Self::Bool => Some("bool"),
            Self::Int => Some("int"),
            _ => None,
        }
    }

    /// Check if this type can connect to another type
    pub fn can_connect_to(&self, other: &SlotType) -> bool {
        if matches!(self, Self::Any) || matches!(other, Self::Any) {
            return true;
        }

        if self == other {
            return true;
        }

        match (self, other) {
            (Self::Generic, t) | (t, Self::Generic) => t.is_shader_type(),
            (Self::Number, Self::Float | Self::Int) | (Self::Float | Self::Int, Self::Number) => {
                true
            }
            _ => false,
        }
    }
}

impl From<&str> for SlotType {
    fn from(name: &str) -> Self {
        match name {
            "float" => Self::Float,
            "vec2" => Self::Vec2,
            "vec3" => Self::Vec3,
            "vec4" => Self::Vec4,
            "mat3" => Self::Mat3,
            "mat4" => Self::Mat4,
            "sampler2D" => Self::Sampler2D,
            "bool" | "boolean" => Self::Bool,
            "int" => Self::Int,
            "number" => Self::Number,
            "string" => Self::String,
            "" | "*" => Self::Any,
            "T" => Self::Generic,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for SlotType {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<SlotType> for String {
    fn from(slot_type: SlotType) -> Self {
        slot_type.to_string()
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &str = match self {
            Self::Number => "number",
            Self::String => "string",
            Self::Any => "*",
            Self::Generic => "T",
            Self::Custom(name) => name,
            concrete => concrete.glsl_name().unwrap_or("*"),
        };
        f.write_str(name)
    }
}

/// An input slot; holds at most one link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSlot {
    /// Slot name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub slot_type: SlotType,
    /// Connected link
    #[serde(default)]
    pub link: Option<LinkId>,
}

impl InputSlot {
    /// Create a new, unconnected input slot
    pub fn new(name: impl Into<String>, slot_type: SlotType) -> Self {
        Self {
            name: name.into(),
            slot_type,
            link: None,
        }
    }

    /// Check whether a link is attached
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}

/// An output slot; fans out to any number of links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSlot {
    /// Slot name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub slot_type: SlotType,
    /// Connected links, in connection order
    #[serde(default)]
    pub links: Vec<LinkId>,
    /// Last value written by the owning node
    #[serde(skip)]
    pub data: Option<Value>,
}

impl OutputSlot {
    /// Create a new, unconnected output slot
    pub fn new(name: impl Into<String>, slot_type: SlotType) -> Self {
        Self {
            name: name.into(),
            slot_type,
            links: Vec::new(),
            data: None,
        }
    }

    /// Check whether any link is attached
    pub fn is_connected(&self) -> bool {
        !self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_accepts_shader_types() {
        assert!(SlotType::Generic.can_connect_to(&SlotType::Vec3));
        assert!(SlotType::Float.can_connect_to(&SlotType::Generic));
        assert!(!SlotType::Generic.can_connect_to(&SlotType::Mat4));
        assert!(SlotType::Generic.can_connect_to(&SlotType::Generic));
    }

    #[test]
    fn test_any_and_mismatch() {
        assert!(SlotType::Any.can_connect_to(&SlotType::Sampler2D));
        assert!(SlotType::String.can_connect_to(&SlotType::Any));
        assert!(!SlotType::Vec2.can_connect_to(&SlotType::Vec3));
        assert!(SlotType::Number.can_connect_to(&SlotType::Float));
    }

    #[test]
    fn test_names_roundtrip() {
        for name in ["float", "vec4", "sampler2D", "T", "*", "number", "my_struct"] {
            assert_eq!(SlotType::from(name).to_string(), name);
        }
        assert_eq!(SlotType::from(""), SlotType::Any);
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dynamic values carried by properties, globals and links.

use crate::shader::ShaderCode;
use crate::slot::SlotType;
use serde::{Deserialize, Serialize};

/// Value that can be stored in a property, a global or a link
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    /// No value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// 2D vector
    Vector2([f32; 2]),
    /// 3D vector
    Vector3([f32; 3]),
    /// 4D vector / Color
    Vector4([f32; 4]),
    /// String
    String(String),
    /// Generated shader code
    Code(ShaderCode),
}

impl Value {
    /// Get the slot type for this value
    pub fn slot_type(&self) -> SlotType {
        match self {
            Self::Null => SlotType::Any,
            Self::Bool(_) => SlotType::Bool,
            Self::Int(_) => SlotType::Int,
            Self::Float(_) => SlotType::Float,
            Self::Vector2(_) => SlotType::Vec2,
            Self::Vector3(_) => SlotType::Vec3,
            Self::Vector4(_) => SlotType::Vec4,
            Self::String(_) => SlotType::String,
            Self::Code(code) => code.output_type.clone(),
        }
    }

    /// Check for [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the value
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            Self::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// String view of the value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Shader code view of the value
    pub fn as_code(&self) -> Option<&ShaderCode> {
        match self {
            Self::Code(code) => Some(code),
            _ => None,
        }
    }

    /// GLSL literal for numeric and vector values
    pub fn to_glsl(&self) -> Option<String> {
        let literal = match self {
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => glsl_float(*v),
            Self::Vector2(v) => glsl_vector("vec2", v),
            Self::Vector3(v) => glsl_vector("vec3", v),
            Self::Vector4(v) => glsl_vector("vec4", v),
            Self::Null | Self::String(_) | Self::Code(_) => return None,
        };
        Some(literal)
    }
}

fn glsl_float(value: f32) -> String {
    let text = value.to_string();
    if !value.is_finite() || text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{text}.0")
    }
}

fn glsl_vector(constructor: &str, components: &[f32]) -> String {
    let parts: Vec<String> = components.iter().copied().map(glsl_float).collect();
    format!("{constructor}({})", parts.join(","))
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<ShaderCode> for Value {
    fn from(value: ShaderCode) -> Self {
        Self::Code(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glsl_literals() {
        assert_eq!(Value::Float(1.0).to_glsl().unwrap(), "1.0");
        assert_eq!(Value::Float(-0.25).to_glsl().unwrap(), "-0.25");
        assert_eq!(
            Value::Vector4([1.0, 0.0, 0.5, 1.0]).to_glsl().unwrap(),
            "vec4(1.0,0.0,0.5,1.0)"
        );
        assert!(Value::String("x".into()).to_glsl().is_none());
    }

    #[test]
    fn test_slot_types() {
        assert_eq!(Value::Vector3([0.0; 3]).slot_type(), SlotType::Vec3);
        assert_eq!(Value::Null.slot_type(), SlotType::Any);
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
    }
}

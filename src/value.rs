use crate::ecs::ComponentHandle;
use bevy_ecs::prelude::Entity;
use glam::{Quat, Vec2, Vec3, Vec4};
use std::fmt;
use thiserror::Error;

/// Declared type of a settable member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    Float,
    Int,
    Bool,
    String,
    Vector2,
    Vector3,
    Vector4,
    Quaternion,
    Color,
    Enum(Vec<String>),
    Material,
    ComponentRef(String),
    EntityRef,
    AssetRef,
}

impl TypeTag {
    pub fn enumeration(variants: &[&str]) -> Self {
        TypeTag::Enum(variants.iter().map(|v| v.to_string()).collect())
    }

    pub fn label(&self) -> String {
        match self {
            TypeTag::Float => "float".to_string(),
            TypeTag::Int => "int".to_string(),
            TypeTag::Bool => "bool".to_string(),
            TypeTag::String => "string".to_string(),
            TypeTag::Vector2 => "Vector2".to_string(),
            TypeTag::Vector3 => "Vector3".to_string(),
            TypeTag::Vector4 => "Vector4".to_string(),
            TypeTag::Quaternion => "Quaternion".to_string(),
            TypeTag::Color => "Color".to_string(),
            TypeTag::Enum(variants) => format!("enum({})", variants.join("|")),
            TypeTag::Material => "Material".to_string(),
            TypeTag::ComponentRef(type_name) => format!("{type_name} reference"),
            TypeTag::EntityRef => "GameObject reference".to_string(),
            TypeTag::AssetRef => "asset reference".to_string(),
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, TypeTag::ComponentRef(_) | TypeTag::EntityRef | TypeTag::AssetRef)
    }

    pub fn default_value(&self) -> Value {
        match self {
            TypeTag::Float => Value::Float(0.0),
            TypeTag::Int => Value::Int(0),
            TypeTag::Bool => Value::Bool(false),
            TypeTag::String => Value::String(String::new()),
            TypeTag::Vector2 => Value::Vector2(Vec2::ZERO),
            TypeTag::Vector3 => Value::Vector3(Vec3::ZERO),
            TypeTag::Vector4 => Value::Vector4(Vec4::ZERO),
            TypeTag::Quaternion => Value::Quaternion(Quat::IDENTITY),
            TypeTag::Color => Value::Color(Vec4::ONE),
            TypeTag::Enum(variants) => Value::Enum(variants.first().cloned().unwrap_or_default()),
            TypeTag::Material => Value::Material(None),
            TypeTag::ComponentRef(_) => Value::Component(None),
            TypeTag::EntityRef => Value::Entity(None),
            TypeTag::AssetRef => Value::Asset(None),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f32),
    Int(i64),
    Bool(bool),
    String(String),
    Vector2(Vec2),
    Vector3(Vec3),
    Vector4(Vec4),
    Quaternion(Quat),
    Color(Vec4),
    Enum(String),
    Material(Option<String>),
    Component(Option<ComponentHandle>),
    Entity(Option<Entity>),
    Asset(Option<String>),
}

impl Value {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Value::Vector3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Vec4> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_material(&self) -> Option<&str> {
        match self {
            Value::Material(key) => key.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "\"{v}\""),
            Value::Vector2(v) => write!(f, "({}, {})", v.x, v.y),
            Value::Vector3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Value::Vector4(v) => write!(f, "({}, {}, {}, {})", v.x, v.y, v.z, v.w),
            Value::Quaternion(q) => write!(f, "({}, {}, {}, {})", q.x, q.y, q.z, q.w),
            Value::Color(c) => write!(f, "RGBA({:.3}, {:.3}, {:.3}, {:.3})", c.x, c.y, c.z, c.w),
            Value::Enum(v) => f.write_str(v),
            Value::Material(Some(key)) => write!(f, "material '{key}'"),
            Value::Component(Some(handle)) => write!(f, "component {handle}"),
            Value::Entity(Some(entity)) => write!(f, "entity {}", entity.index()),
            Value::Asset(Some(path)) => write!(f, "asset '{path}'"),
            Value::Material(None) | Value::Component(None) | Value::Entity(None) | Value::Asset(None) => {
                f.write_str("None")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("'{text}' is not a valid {expected}")]
    Malformed { text: String, expected: String },
    #[error("expected {expected} components but '{text}' has {found}")]
    Arity { text: String, expected: String, found: usize },
    #[error("cannot convert '{text}' to {target}")]
    Unsupported { text: String, target: String },
}

/// Converts directive text into a value of the requested type.
pub fn coerce(text: &str, target: &TypeTag) -> Result<Value, ConversionError> {
    let trimmed = text.trim();
    match target {
        TypeTag::Float => parse_float(trimmed, "float").map(Value::Float),
        TypeTag::Int => trimmed
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| malformed(trimmed, "int")),
        TypeTag::Bool => parse_bool(trimmed).map(Value::Bool),
        TypeTag::String => Ok(Value::String(text.to_string())),
        TypeTag::Vector2 => {
            let parts = parse_tuple(trimmed, "Vector2", &[2])?;
            Ok(Value::Vector2(Vec2::new(parts[0], parts[1])))
        }
        TypeTag::Vector3 => {
            let parts = parse_tuple(trimmed, "Vector3", &[3])?;
            Ok(Value::Vector3(Vec3::new(parts[0], parts[1], parts[2])))
        }
        TypeTag::Vector4 => {
            let parts = parse_tuple(trimmed, "Vector4", &[4])?;
            Ok(Value::Vector4(Vec4::new(parts[0], parts[1], parts[2], parts[3])))
        }
        TypeTag::Quaternion => {
            let parts = parse_tuple(trimmed, "Quaternion", &[4])?;
            let raw = Quat::from_xyzw(parts[0], parts[1], parts[2], parts[3]);
            if raw.length_squared() <= f32::EPSILON {
                return Err(malformed(trimmed, "Quaternion"));
            }
            Ok(Value::Quaternion(raw.normalize()))
        }
        TypeTag::Color => parse_color(trimmed).map(Value::Color),
        TypeTag::Enum(variants) => variants
            .iter()
            .find(|variant| variant.eq_ignore_ascii_case(trimmed))
            .map(|variant| Value::Enum(variant.clone()))
            .ok_or_else(|| malformed(trimmed, &target.label())),
        TypeTag::Material | TypeTag::ComponentRef(_) | TypeTag::EntityRef | TypeTag::AssetRef => {
            Err(ConversionError::Unsupported { text: trimmed.to_string(), target: target.label() })
        }
    }
}

/// Parses `(r,g,b)` or `(r,g,b,a)`; components are already normalized to 0..1.
pub fn parse_color(text: &str) -> Result<Vec4, ConversionError> {
    let parts = parse_tuple(text, "Color", &[3, 4])?;
    let alpha = parts.get(3).copied().unwrap_or(1.0);
    Ok(Vec4::new(parts[0], parts[1], parts[2], alpha))
}

fn parse_bool(text: &str) -> Result<bool, ConversionError> {
    if text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(malformed(text, "bool"))
    }
}

fn parse_float(text: &str, expected: &str) -> Result<f32, ConversionError> {
    let value = text.trim().parse::<f32>().map_err(|_| malformed(text, expected))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(malformed(text, expected))
    }
}

fn parse_tuple(text: &str, expected: &str, arities: &[usize]) -> Result<Vec<f32>, ConversionError> {
    let inner = text.trim().trim_start_matches('(').trim_end_matches(')');
    if inner.trim().is_empty() {
        return Err(malformed(text, expected));
    }
    let pieces: Vec<&str> = inner.split(',').collect();
    if !arities.contains(&pieces.len()) {
        let wanted = arities.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" or ");
        return Err(ConversionError::Arity { text: text.to_string(), expected: wanted, found: pieces.len() });
    }
    pieces.iter().map(|piece| parse_float(piece, expected)).collect()
}

fn malformed(text: &str, expected: &str) -> ConversionError {
    ConversionError::Malformed { text: text.to_string(), expected: expected.to_string() }
}

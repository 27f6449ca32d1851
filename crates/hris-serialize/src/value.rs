// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic object tree rendered and parsed by the payload codecs.

use std::collections::HashMap;

use crate::error::ParseError;
use crate::schema::{PrimitiveKind, Schema, TypeKind};

/// A value of any schema shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    // Primitives
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(String),

    // Composites
    Struct(HashMap<String, Value>),
    Sequence(Vec<Value>),
    Array(Vec<Value>),
}

impl Value {
    /// Build a struct value from `(field, value)` pairs.
    pub fn structure<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Zero value of a shape: zero numbers, empty strings and sequences,
    /// arrays filled with zero elements.
    pub fn default_for(schema: &Schema) -> Self {
        match &schema.shape {
            TypeKind::Primitive { primitive } => Self::zero(*primitive),
            TypeKind::Struct { fields } => Self::Struct(
                fields
                    .iter()
                    .map(|f| (f.name.clone(), Self::default_for(&f.schema)))
                    .collect(),
            ),
            TypeKind::Sequence { .. } => Self::Sequence(Vec::new()),
            TypeKind::Array { element, length } => {
                Self::Array(vec![Self::default_for(element); *length])
            }
        }
    }

    fn zero(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Bool => Self::Bool(false),
            PrimitiveKind::U8 => Self::U8(0),
            PrimitiveKind::U16 => Self::U16(0),
            PrimitiveKind::U32 => Self::U32(0),
            PrimitiveKind::U64 => Self::U64(0),
            PrimitiveKind::I8 => Self::I8(0),
            PrimitiveKind::I16 => Self::I16(0),
            PrimitiveKind::I32 => Self::I32(0),
            PrimitiveKind::I64 => Self::I64(0),
            PrimitiveKind::F32 => Self::F32(0.0),
            PrimitiveKind::F64 => Self::F64(0.0),
            PrimitiveKind::String => Self::String(String::new()),
        }
    }

    /// Short kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::String(_) => "string",
            Self::Struct(_) => "struct",
            Self::Sequence(_) => "sequence",
            Self::Array(_) => "array",
        }
    }

    /// Primitive kind carried by this value, if it is a primitive.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        Some(match self {
            Self::Bool(_) => PrimitiveKind::Bool,
            Self::U8(_) => PrimitiveKind::U8,
            Self::U16(_) => PrimitiveKind::U16,
            Self::U32(_) => PrimitiveKind::U32,
            Self::U64(_) => PrimitiveKind::U64,
            Self::I8(_) => PrimitiveKind::I8,
            Self::I16(_) => PrimitiveKind::I16,
            Self::I32(_) => PrimitiveKind::I32,
            Self::I64(_) => PrimitiveKind::I64,
            Self::F32(_) => PrimitiveKind::F32,
            Self::F64(_) => PrimitiveKind::F64,
            Self::String(_) => PrimitiveKind::String,
            _ => return None,
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Field of a struct value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Struct(map) => map.get(name),
            _ => None,
        }
    }

    /// Elements of a sequence or array value.
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(items) | Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Check that this value has exactly the given shape.
    pub fn conforms_to(&self, schema: &Schema) -> Result<(), ParseError> {
        self.check(schema, &mut String::new())
    }

    fn check(&self, schema: &Schema, path: &mut String) -> Result<(), ParseError> {
        match (&schema.shape, self) {
            (TypeKind::Primitive { primitive }, value) => {
                if value.primitive_kind() == Some(*primitive) {
                    Ok(())
                } else {
                    Err(mismatch(path, primitive.type_tag(), value))
                }
            }
            (TypeKind::Struct { fields }, Self::Struct(map)) => {
                if map.len() != fields.len() {
                    if let Some(extra) = map.keys().find(|k| schema.field(k).is_none()) {
                        return Err(ParseError::invalid(
                            path.as_str(),
                            format!("unexpected field '{extra}'"),
                        ));
                    }
                }
                for field in fields {
                    let len = path.len();
                    if !path.is_empty() {
                        path.push('.');
                    }
                    path.push_str(&field.name);
                    let value = map.get(&field.name).ok_or_else(|| {
                        ParseError::invalid(path.as_str(), "missing field")
                    })?;
                    value.check(&field.schema, path)?;
                    path.truncate(len);
                }
                Ok(())
            }
            (TypeKind::Sequence { element }, Self::Sequence(items)) => {
                check_elements(items, element, path)
            }
            (TypeKind::Array { element, length }, Self::Array(items)) => {
                if items.len() != *length {
                    return Err(ParseError::invalid(
                        path.as_str(),
                        format!("array length {} does not match {}", items.len(), length),
                    ));
                }
                check_elements(items, element, path)
            }
            (shape, value) => Err(mismatch(path, shape_name(shape), value)),
        }
    }
}

fn check_elements(items: &[Value], element: &Schema, path: &mut String) -> Result<(), ParseError> {
    for (i, item) in items.iter().enumerate() {
        let len = path.len();
        path.push_str(&format!("[{i}]"));
        item.check(element, path)?;
        path.truncate(len);
    }
    Ok(())
}

fn shape_name(shape: &TypeKind) -> &'static str {
    match shape {
        TypeKind::Primitive { primitive } => primitive.type_tag(),
        TypeKind::Struct { .. } => "struct",
        TypeKind::Sequence { .. } => "sequence",
        TypeKind::Array { .. } => "array",
    }
}

fn mismatch(path: &str, expected: &str, found: &Value) -> ParseError {
    ParseError::invalid(
        path,
        format!("expected {expected}, found {}", found.kind_name()),
    )
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
    String => String,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    fn sample_schema() -> Schema {
        SchemaBuilder::new("Sample")
            .field("id", PrimitiveKind::U32)
            .array_field("extents", PrimitiveKind::I32, 2)
            .sequence_field("values", PrimitiveKind::F32)
            .build()
    }

    #[test]
    fn test_default_conforms() {
        let schema = sample_schema();
        let value = Value::default_for(&schema);
        value.conforms_to(&schema).expect("default conforms");
        assert_eq!(value.field("id"), Some(&Value::U32(0)));
        assert_eq!(value.field("extents").and_then(Value::elements).map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_conforms_reports_path() {
        let schema = sample_schema();
        let value = Value::structure([
            ("id", Value::U32(1)),
            ("extents", Value::Array(vec![Value::I32(1), Value::I32(2)])),
            ("values", Value::Sequence(vec![Value::F32(1.0), Value::I32(2)])),
        ]);
        let err = value.conforms_to(&schema).expect_err("mismatch");
        match err {
            ParseError::InvalidData { path, reason } => {
                assert_eq!(path, "values[1]");
                assert!(reason.contains("expected float"), "{reason}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_conforms_rejects_wrong_array_length_and_extra_field() {
        let schema = sample_schema();
        let short = Value::structure([
            ("id", Value::U32(1)),
            ("extents", Value::Array(vec![Value::I32(1)])),
            ("values", Value::Sequence(vec![])),
        ]);
        assert!(short.conforms_to(&schema).is_err());

        let extra = Value::structure([
            ("id", Value::U32(1)),
            ("extents", Value::Array(vec![Value::I32(1), Value::I32(2)])),
            ("values", Value::Sequence(vec![])),
            ("bogus", Value::Bool(true)),
        ]);
        assert!(extra.conforms_to(&schema).is_err());
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(Value::from(3i32).as_i32(), Some(3));
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(Value::from(1.5f32).as_f32(), Some(1.5));
        assert_eq!(Value::from(true).primitive_kind(), Some(PrimitiveKind::Bool));
    }
}

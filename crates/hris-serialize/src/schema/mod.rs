// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shape metadata for serializable types.
//!
//! A [`Schema`] is the closed set of field kinds the codecs understand:
//! primitives, structs with named fields, variable-length sequences and
//! fixed-length arrays. Type libraries publish their schema as JSON text so
//! the core can render their objects without knowing their layout.

mod builder;

use serde::{Deserialize, Serialize};

pub use builder::SchemaBuilder;

/// Primitive field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
}

impl PrimitiveKind {
    /// Encoded size in bytes (None for strings).
    pub fn size(&self) -> Option<usize> {
        match self {
            Self::Bool | Self::U8 | Self::I8 => Some(1),
            Self::U16 | Self::I16 => Some(2),
            Self::U32 | Self::I32 | Self::F32 => Some(4),
            Self::U64 | Self::I64 | Self::F64 => Some(8),
            Self::String => None,
        }
    }

    /// Type tag used by Ascii payloads written with type information.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::U8 => "unsigned_char",
            Self::U16 => "short_unsigned",
            Self::U32 => "unsigned_int",
            Self::U64 => "long_long_unsigned",
            Self::I8 => "signed_char",
            Self::I16 => "short_int",
            Self::I32 => "int",
            Self::I64 => "long_long",
            Self::F32 => "float",
            Self::F64 => "double",
            Self::String => "string",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

/// Kind of a schema node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TypeKind {
    Primitive { primitive: PrimitiveKind },
    /// Named fields, encoded in declaration order.
    Struct { fields: Vec<Field> },
    /// Variable length, count-prefixed in binary payloads.
    Sequence { element: Box<Schema> },
    /// Fixed length.
    Array { element: Box<Schema>, length: usize },
}

/// A named type and its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub shape: TypeKind,
}

/// A struct member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

impl Schema {
    pub fn new(name: impl Into<String>, shape: TypeKind) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    /// Primitive node named after its type tag.
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(kind.type_tag(), TypeKind::Primitive { primitive: kind })
    }

    pub fn structure(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self::new(name, TypeKind::Struct { fields })
    }

    pub fn sequence(element: Schema) -> Self {
        let name = element.name.clone();
        Self::new(
            name,
            TypeKind::Sequence {
                element: Box::new(element),
            },
        )
    }

    pub fn array(element: Schema, length: usize) -> Self {
        let name = element.name.clone();
        Self::new(
            name,
            TypeKind::Array {
                element: Box::new(element),
                length,
            },
        )
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self.shape {
            TypeKind::Primitive { primitive } => Some(primitive),
            _ => None,
        }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.shape, TypeKind::Struct { .. })
    }

    /// Element schema of a sequence or array.
    pub fn element(&self) -> Option<&Schema> {
        match &self.shape {
            TypeKind::Sequence { element } | TypeKind::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&[Field]> {
        match &self.shape {
            TypeKind::Struct { fields } => Some(fields),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields()?.iter().find(|f| f.name == name)
    }

    /// Smallest possible binary encoding of a value of this shape.
    pub fn min_encoded_size(&self) -> usize {
        match &self.shape {
            TypeKind::Primitive { primitive } => primitive.size().unwrap_or(4),
            TypeKind::Struct { fields } => fields.iter().map(|f| f.schema.min_encoded_size()).sum(),
            TypeKind::Sequence { .. } => 4,
            TypeKind::Array { element, length } => element.min_encoded_size() * length,
        }
    }

    /// Check structural sanity: non-empty unique field names, non-empty
    /// structs, non-zero array lengths.
    pub fn validate(&self) -> Result<(), String> {
        match &self.shape {
            TypeKind::Primitive { .. } => Ok(()),
            TypeKind::Struct { fields } => {
                if fields.is_empty() {
                    return Err(format!("struct '{}' has no fields", self.name));
                }
                for (i, field) in fields.iter().enumerate() {
                    if !is_identifier(&field.name) {
                        return Err(format!(
                            "struct '{}' has an invalid field name '{}'",
                            self.name, field.name
                        ));
                    }
                    if fields[..i].iter().any(|f| f.name == field.name) {
                        return Err(format!(
                            "struct '{}' declares '{}' twice",
                            self.name, field.name
                        ));
                    }
                    field.schema.validate()?;
                }
                Ok(())
            }
            TypeKind::Sequence { element } => element.validate(),
            TypeKind::Array { element, length } => {
                if *length == 0 {
                    return Err(format!("array of '{}' has zero length", element.name));
                }
                element.validate()
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

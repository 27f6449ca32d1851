// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder API for struct schemas.

use crate::schema::{Field, PrimitiveKind, Schema};

/// Builder for struct [`Schema`]s.
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    /// Create a new builder for a struct type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a primitive field.
    pub fn field(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.field_with_schema(name, Schema::primitive(kind))
    }

    /// Add a field of any shape.
    pub fn field_with_schema(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.push(Field::new(name, schema));
        self
    }

    pub fn string_field(self, name: impl Into<String>) -> Self {
        self.field(name, PrimitiveKind::String)
    }

    /// Add a variable-length sequence of primitives.
    pub fn sequence_field(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.field_with_schema(name, Schema::sequence(Schema::primitive(kind)))
    }

    /// Add a fixed-length array of primitives.
    pub fn array_field(self, name: impl Into<String>, kind: PrimitiveKind, length: usize) -> Self {
        self.field_with_schema(name, Schema::array(Schema::primitive(kind), length))
    }

    /// Add a nested struct.
    pub fn struct_field(self, name: impl Into<String>, schema: Schema) -> Self {
        self.field_with_schema(name, schema)
    }

    /// Add a variable-length sequence of nested structs.
    pub fn struct_sequence_field(self, name: impl Into<String>, element: Schema) -> Self {
        self.field_with_schema(name, Schema::sequence(element))
    }

    /// Add a fixed-length array of nested structs.
    pub fn struct_array_field(
        self,
        name: impl Into<String>,
        element: Schema,
        length: usize,
    ) -> Self {
        self.field_with_schema(name, Schema::array(element, length))
    }

    pub fn build(self) -> Schema {
        Schema::structure(self.name, self.fields)
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON payloads.
//!
//! A record is one object keyed by the type name. Struct fields are
//! addressed by name, sequences and arrays become JSON arrays:
//!
//! ```json
//! {"BBDMArrayBlockF32": {"m_dims": 1, "m_totalSize": 2, "m_data": [...]}}
//! ```

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value as Json;
use tracing::warn;

use crate::error::ParseError;
use crate::format::{Codec, Format};
use crate::schema::{PrimitiveKind, Schema, TypeKind};
use crate::value::Value;

/// JSON payload codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn from_options(options: &str) -> Result<Self, ParseError> {
        match options.trim() {
            "" => Ok(Self),
            other => Err(ParseError::BadOptions {
                format: Format::Json.to_string(),
                option: other.to_string(),
            }),
        }
    }
}

impl Codec for JsonCodec {
    fn format(&self) -> Format {
        Format::Json
    }

    fn options(&self) -> String {
        String::new()
    }

    fn encode(&self, _name: &str, schema: &Schema, value: &Value) -> Result<Vec<u8>, ParseError> {
        value.conforms_to(schema)?;
        let document = Document { schema, value };
        let mut out = serde_json::to_vec_pretty(&document)
            .map_err(|e| ParseError::invalid(schema.name.as_str(), e.to_string()))?;
        out.push(b'\n');
        Ok(out)
    }

    fn decode(&self, _name: &str, schema: &Schema, payload: &[u8]) -> Result<Value, ParseError> {
        let document: Json = serde_json::from_slice(payload).map_err(|e| {
            ParseError::invalid(schema.name.as_str(), format!("malformed JSON: {e}"))
        })?;
        let Json::Object(root) = document else {
            return Err(ParseError::invalid(
                schema.name.as_str(),
                "expected an object keyed by the type name",
            ));
        };
        if root.len() != 1 {
            return Err(ParseError::invalid(
                schema.name.as_str(),
                format!("expected exactly one top-level key, found {}", root.len()),
            ));
        }
        let Some((key, body)) = root.iter().next() else {
            return Err(ParseError::invalid(schema.name.as_str(), "empty document"));
        };
        if key != &schema.name {
            warn!(expected = %schema.name, found = %key, "JSON payload is keyed by another type name");
        }
        from_json(body, schema, &mut String::new())
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

struct Document<'a> {
    schema: &'a Schema,
    value: &'a Value,
}

impl Serialize for Document<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(
            &self.schema.name,
            &View {
                schema: self.schema,
                value: self.value,
            },
        )?;
        map.end()
    }
}

/// A value walked in schema order.
struct View<'a> {
    schema: &'a Schema,
    value: &'a Value,
}

impl Serialize for View<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match (&self.schema.shape, self.value) {
            (TypeKind::Struct { fields }, Value::Struct(values)) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for field in fields {
                    if let Some(value) = values.get(&field.name) {
                        map.serialize_entry(
                            &field.name,
                            &View {
                                schema: &field.schema,
                                value,
                            },
                        )?;
                    }
                }
                map.end()
            }
            (
                TypeKind::Sequence { element } | TypeKind::Array { element, .. },
                Value::Sequence(items) | Value::Array(items),
            ) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for value in items {
                    seq.serialize_element(&View {
                        schema: element,
                        value,
                    })?;
                }
                seq.end()
            }
            (_, Value::Bool(v)) => serializer.serialize_bool(*v),
            (_, Value::U8(v)) => serializer.serialize_u8(*v),
            (_, Value::U16(v)) => serializer.serialize_u16(*v),
            (_, Value::U32(v)) => serializer.serialize_u32(*v),
            (_, Value::U64(v)) => serializer.serialize_u64(*v),
            (_, Value::I8(v)) => serializer.serialize_i8(*v),
            (_, Value::I16(v)) => serializer.serialize_i16(*v),
            (_, Value::I32(v)) => serializer.serialize_i32(*v),
            (_, Value::I64(v)) => serializer.serialize_i64(*v),
            (_, Value::F32(v)) => serializer.serialize_f32(*v),
            (_, Value::F64(v)) => serializer.serialize_f64(*v),
            (_, Value::String(v)) => serializer.serialize_str(v),
            (_, other) => Err(serde::ser::Error::custom(format!(
                "cannot render {} as {}",
                other.kind_name(),
                self.schema.name
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn from_json(json: &Json, schema: &Schema, path: &mut String) -> Result<Value, ParseError> {
    match &schema.shape {
        TypeKind::Primitive { primitive } => primitive_from_json(json, *primitive, path),
        TypeKind::Struct { fields } => {
            let Json::Object(object) = json else {
                return Err(expected(path, "an object", json));
            };
            if let Some(extra) = object.keys().find(|k| schema.field(k).is_none()) {
                return Err(ParseError::invalid(
                    path.as_str(),
                    format!("unexpected field '{extra}'"),
                ));
            }
            let mut map = std::collections::HashMap::with_capacity(fields.len());
            for field in fields {
                let len = path.len();
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(&field.name);
                let member = object
                    .get(&field.name)
                    .ok_or_else(|| ParseError::invalid(path.as_str(), "missing field"))?;
                map.insert(field.name.clone(), from_json(member, &field.schema, path)?);
                path.truncate(len);
            }
            Ok(Value::Struct(map))
        }
        TypeKind::Sequence { element } => {
            let items = list_from_json(json, element, path)?;
            Ok(Value::Sequence(items))
        }
        TypeKind::Array { element, length } => {
            let items = list_from_json(json, element, path)?;
            if items.len() != *length {
                return Err(ParseError::invalid(
                    path.as_str(),
                    format!("array of {length} has {} elements", items.len()),
                ));
            }
            Ok(Value::Array(items))
        }
    }
}

fn list_from_json(json: &Json, element: &Schema, path: &mut String) -> Result<Vec<Value>, ParseError> {
    let Json::Array(items) = json else {
        return Err(expected(path, "an array", json));
    };
    let composite = element.as_primitive().is_none();
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let len = path.len();
        path.push_str(&format!("[{i}]"));
        let decoded = from_json(item, element, path);
        path.truncate(len);
        match decoded {
            Ok(value) => out.push(value),
            Err(source) if composite => {
                return Err(ParseError::PartialSequence {
                    field: path.clone(),
                    decoded: i,
                    declared: items.len(),
                    source: Box::new(source),
                })
            }
            Err(source) => return Err(source),
        }
    }
    Ok(out)
}

fn primitive_from_json(json: &Json, kind: PrimitiveKind, path: &str) -> Result<Value, ParseError> {
    let out_of_range = || {
        ParseError::invalid(
            path,
            format!("{json} is not a valid {}", kind.type_tag()),
        )
    };
    let signed = || json.as_i64().ok_or_else(out_of_range);
    let unsigned = || json.as_u64().ok_or_else(out_of_range);
    Ok(match kind {
        PrimitiveKind::Bool => Value::Bool(json.as_bool().ok_or_else(out_of_range)?),
        PrimitiveKind::U8 => Value::U8(u8::try_from(unsigned()?).map_err(|_| out_of_range())?),
        PrimitiveKind::U16 => Value::U16(u16::try_from(unsigned()?).map_err(|_| out_of_range())?),
        PrimitiveKind::U32 => Value::U32(u32::try_from(unsigned()?).map_err(|_| out_of_range())?),
        PrimitiveKind::U64 => Value::U64(unsigned()?),
        PrimitiveKind::I8 => Value::I8(i8::try_from(signed()?).map_err(|_| out_of_range())?),
        PrimitiveKind::I16 => Value::I16(i16::try_from(signed()?).map_err(|_| out_of_range())?),
        PrimitiveKind::I32 => Value::I32(i32::try_from(signed()?).map_err(|_| out_of_range())?),
        PrimitiveKind::I64 => Value::I64(signed()?),
        // Non-finite floats are written as null.
        PrimitiveKind::F32 => match json {
            Json::Null => Value::F32(f32::NAN),
            other => {
                let wide = other.as_f64().ok_or_else(out_of_range)?;
                let narrow = wide as f32;
                if wide.is_finite() && !narrow.is_finite() {
                    return Err(out_of_range());
                }
                Value::F32(narrow)
            }
        },
        PrimitiveKind::F64 => match json {
            Json::Null => Value::F64(f64::NAN),
            other => Value::F64(other.as_f64().ok_or_else(out_of_range)?),
        },
        PrimitiveKind::String => Value::String(json.as_str().ok_or_else(out_of_range)?.to_string()),
    })
}

fn expected(path: &str, what: &str, found: &Json) -> ParseError {
    let kind = match found {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    };
    ParseError::invalid(path, format!("expected {what}, found {kind}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    fn block_schema() -> Schema {
        let memory = SchemaBuilder::new("MemoryF32")
            .sequence_field("data", PrimitiveKind::F32)
            .build();
        let size = SchemaBuilder::new("BaseSize")
            .field("width", PrimitiveKind::I32)
            .field("height", PrimitiveKind::I32)
            .build();
        let block = SchemaBuilder::new("BaseF32")
            .field("owner", PrimitiveKind::I32)
            .struct_field("data", memory)
            .struct_field("size", size)
            .build();
        let dims = SchemaBuilder::new("Dimensions")
            .array_field("elementsPerDimension", PrimitiveKind::I32, 4)
            .build();
        SchemaBuilder::new("ArrayBlock")
            .field("m_dims", PrimitiveKind::I32)
            .field("m_totalSize", PrimitiveKind::I32)
            .struct_field("elementsPerDimension", dims)
            .struct_sequence_field("m_data", block)
            .build()
    }

    fn block(data: &[f32]) -> Value {
        Value::structure([
            ("owner", Value::I32(1)),
            (
                "data",
                Value::structure([(
                    "data",
                    Value::Sequence(data.iter().copied().map(Value::F32).collect()),
                )]),
            ),
            (
                "size",
                Value::structure([("width", Value::I32(2)), ("height", Value::I32(1))]),
            ),
        ])
    }

    fn array_block() -> Value {
        Value::structure([
            ("m_dims", Value::I32(1)),
            ("m_totalSize", Value::I32(2)),
            (
                "elementsPerDimension",
                Value::structure([(
                    "elementsPerDimension",
                    Value::Array(vec![Value::I32(2), Value::I32(0), Value::I32(0), Value::I32(0)]),
                )]),
            ),
            ("m_data", Value::Sequence(vec![block(&[0.1, 2.5]), block(&[-3.0, 1e-7])])),
        ])
    }

    #[test]
    fn test_fields_are_addressable_by_name() {
        let schema = block_schema();
        let bytes = JsonCodec.encode("data", &schema, &array_block()).expect("encode");
        let json: Json = serde_json::from_slice(&bytes).expect("valid JSON");
        let body = &json["ArrayBlock"];
        assert_eq!(body["m_dims"], 1);
        assert_eq!(body["m_totalSize"], 2);
        assert_eq!(
            body["elementsPerDimension"]["elementsPerDimension"],
            serde_json::json!([2, 0, 0, 0])
        );
        assert_eq!(body["m_data"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["m_data"][0]["size"]["width"], 2);
        assert_eq!(body["m_data"][0]["data"]["data"][0], serde_json::json!(0.1));
    }

    #[test]
    fn test_round_trip() {
        let schema = block_schema();
        let value = array_block();
        let bytes = JsonCodec.encode("data", &schema, &value).expect("encode");
        let back = JsonCodec.decode("data", &schema, &bytes).expect("decode");
        assert_eq!(back, value);
    }

    #[test]
    fn test_out_of_range_integer_is_invalid_data() {
        let schema = SchemaBuilder::new("S").field("v", PrimitiveKind::U8).build();
        let err = JsonCodec
            .decode("s", &schema, br#"{"S": {"v": 300}}"#)
            .expect_err("overflow");
        assert!(matches!(err, ParseError::InvalidData { ref path, .. } if path == "v"));
    }

    #[test]
    fn test_f32_beyond_range_is_invalid() {
        let schema = SchemaBuilder::new("S").field("v", PrimitiveKind::F32).build();
        let err = JsonCodec
            .decode("s", &schema, br#"{"S": {"v": 1e300}}"#)
            .expect_err("overflow");
        assert!(matches!(err, ParseError::InvalidData { ref path, .. } if path == "v"));
        let value = JsonCodec
            .decode("s", &schema, br#"{"S": {"v": 3.4e38}}"#)
            .expect("largest finite");
        assert_eq!(value.field("v"), Some(&Value::F32(3.4e38)));
    }

    #[test]
    fn test_shape_mismatch_reports_decoded_elements() {
        let schema = block_schema();
        let doc = br#"{"ArrayBlock": {"m_dims": 1, "m_totalSize": 2,
            "elementsPerDimension": {"elementsPerDimension": [2, 0, 0, 0]},
            "m_data": [
                {"owner": 1, "data": {"data": [1.0]}, "size": {"width": 1, "height": 1}},
                {"owner": 1, "data": {"data": "oops"}, "size": {"width": 1, "height": 1}}
            ]}}"#;
        let err = JsonCodec.decode("data", &schema, doc).expect_err("bad element");
        assert_eq!(err.decoded_elements(), Some(1));
    }

    #[test]
    fn test_document_shape_errors() {
        let schema = SchemaBuilder::new("S").field("v", PrimitiveKind::I32).build();
        assert!(JsonCodec.decode("s", &schema, b"[1, 2]").is_err());
        assert!(JsonCodec.decode("s", &schema, br#"{"S": {"v": 1}, "T": {}}"#).is_err());
        assert!(JsonCodec.decode("s", &schema, br#"{"S": {"v": 1, "w": 2}}"#).is_err());
        assert!(JsonCodec.decode("s", &schema, br#"{"S": {}}"#).is_err());
        assert!(JsonCodec.decode("s", &schema, b"{").is_err());
    }

    #[test]
    fn test_lowercase_key_is_accepted() {
        let schema = SchemaBuilder::new("S").field("v", PrimitiveKind::I32).build();
        let value = JsonCodec
            .decode("s", &schema, br#"{"s": {"v": 5}}"#)
            .expect("decode");
        assert_eq!(value.field("v"), Some(&Value::I32(5)));
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dense binary payloads.
//!
//! Fields are written in declaration order without padding. Sequences and
//! strings carry a `u32` element count, fixed arrays do not. The byte order
//! is recorded in the header options; little-endian is the canonical form
//! also used across the type-library boundary.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::ParseError;
use crate::format::{Codec, Format};
use crate::schema::{PrimitiveKind, Schema, TypeKind};
use crate::value::Value;

/// Byte order of a binary payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    pub fn as_option(&self) -> &'static str {
        match self {
            Self::Little => "LITTLE_ENDIAN",
            Self::Big => "BIG_ENDIAN",
        }
    }
}

/// Binary payload codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec {
    endian: Endian,
}

impl BinaryCodec {
    pub fn new(endian: Endian) -> Self {
        Self { endian }
    }

    /// Parse header options; an empty string selects little-endian.
    pub fn from_options(options: &str) -> Result<Self, ParseError> {
        match options.trim() {
            "" | "LITTLE_ENDIAN" => Ok(Self::new(Endian::Little)),
            "BIG_ENDIAN" => Ok(Self::new(Endian::Big)),
            other => Err(ParseError::BadOptions {
                format: Format::Binary.to_string(),
                option: other.to_string(),
            }),
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }
}

impl Codec for BinaryCodec {
    fn format(&self) -> Format {
        Format::Binary
    }

    fn options(&self) -> String {
        self.endian.as_option().to_string()
    }

    fn encode(&self, _name: &str, schema: &Schema, value: &Value) -> Result<Vec<u8>, ParseError> {
        match self.endian {
            Endian::Little => encode_with::<LittleEndian>(schema, value),
            Endian::Big => encode_with::<BigEndian>(schema, value),
        }
    }

    fn decode(&self, _name: &str, schema: &Schema, payload: &[u8]) -> Result<Value, ParseError> {
        match self.endian {
            Endian::Little => decode_with::<LittleEndian>(schema, payload),
            Endian::Big => decode_with::<BigEndian>(schema, payload),
        }
    }
}

/// Encode in the canonical little-endian layout.
pub fn encode_canonical(schema: &Schema, value: &Value) -> Result<Vec<u8>, ParseError> {
    encode_with::<LittleEndian>(schema, value)
}

/// Decode the canonical little-endian layout.
pub fn decode_canonical(schema: &Schema, payload: &[u8]) -> Result<Value, ParseError> {
    decode_with::<LittleEndian>(schema, payload)
}

fn encode_with<B: ByteOrder>(schema: &Schema, value: &Value) -> Result<Vec<u8>, ParseError> {
    value.conforms_to(schema)?;
    let mut encoder = Encoder::<B>::new();
    encoder.encode_value(value, schema)?;
    Ok(encoder.buffer)
}

fn decode_with<B: ByteOrder>(schema: &Schema, payload: &[u8]) -> Result<Value, ParseError> {
    let mut decoder = Decoder::<B>::new(payload);
    let value = decoder.decode_value(schema)?;
    if decoder.remaining() != 0 {
        return Err(ParseError::invalid(
            schema.name.as_str(),
            format!(
                "{} trailing bytes after a complete object of {} bytes",
                decoder.remaining(),
                decoder.offset
            ),
        ));
    }
    Ok(value)
}

struct Encoder<B> {
    buffer: Vec<u8>,
    _order: std::marker::PhantomData<B>,
}

impl<B: ByteOrder> Encoder<B> {
    fn new() -> Self {
        Self {
            buffer: Vec::new(),
            _order: std::marker::PhantomData,
        }
    }

    fn put<const N: usize>(&mut self, write: impl FnOnce(&mut [u8])) {
        let mut tmp = [0u8; N];
        write(&mut tmp[..]);
        self.buffer.extend_from_slice(&tmp);
    }

    fn put_count(&mut self, len: usize, path: &str) -> Result<(), ParseError> {
        let count = u32::try_from(len)
            .map_err(|_| ParseError::invalid(path, format!("{len} elements exceed the u32 count")))?;
        self.put::<4>(|b| B::write_u32(b, count));
        Ok(())
    }

    fn encode_value(&mut self, value: &Value, schema: &Schema) -> Result<(), ParseError> {
        match (&schema.shape, value) {
            (TypeKind::Primitive { .. }, value) => self.encode_primitive(value, &schema.name),
            (TypeKind::Struct { fields }, Value::Struct(map)) => {
                for field in fields {
                    let field_value = map
                        .get(&field.name)
                        .ok_or_else(|| ParseError::invalid(field.name.as_str(), "missing field"))?;
                    self.encode_value(field_value, &field.schema)?;
                }
                Ok(())
            }
            (TypeKind::Sequence { element }, Value::Sequence(items)) => {
                self.put_count(items.len(), &schema.name)?;
                for item in items {
                    self.encode_value(item, element)?;
                }
                Ok(())
            }
            (TypeKind::Array { element, .. }, Value::Array(items)) => {
                for item in items {
                    self.encode_value(item, element)?;
                }
                Ok(())
            }
            (_, value) => Err(ParseError::invalid(
                schema.name.as_str(),
                format!("cannot encode {} here", value.kind_name()),
            )),
        }
    }

    fn encode_primitive(&mut self, value: &Value, path: &str) -> Result<(), ParseError> {
        match value {
            Value::Bool(v) => self.buffer.push(u8::from(*v)),
            Value::U8(v) => self.buffer.push(*v),
            Value::I8(v) => self.buffer.push(*v as u8),
            Value::U16(v) => self.put::<2>(|b| B::write_u16(b, *v)),
            Value::I16(v) => self.put::<2>(|b| B::write_i16(b, *v)),
            Value::U32(v) => self.put::<4>(|b| B::write_u32(b, *v)),
            Value::I32(v) => self.put::<4>(|b| B::write_i32(b, *v)),
            Value::U64(v) => self.put::<8>(|b| B::write_u64(b, *v)),
            Value::I64(v) => self.put::<8>(|b| B::write_i64(b, *v)),
            Value::F32(v) => self.put::<4>(|b| B::write_f32(b, *v)),
            Value::F64(v) => self.put::<8>(|b| B::write_f64(b, *v)),
            Value::String(s) => {
                self.put_count(s.len(), path)?;
                self.buffer.extend_from_slice(s.as_bytes());
            }
            other => {
                return Err(ParseError::invalid(
                    path,
                    format!("expected a primitive, found {}", other.kind_name()),
                ))
            }
        }
        Ok(())
    }
}

struct Decoder<'a, B> {
    buffer: &'a [u8],
    offset: usize,
    path: Vec<String>,
    _order: std::marker::PhantomData<B>,
}

impl<'a, B: ByteOrder> Decoder<'a, B> {
    fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            offset: 0,
            path: Vec::new(),
            _order: std::marker::PhantomData,
        }
    }

    fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    fn path(&self) -> String {
        let mut out = String::new();
        for part in &self.path {
            if !out.is_empty() && !part.starts_with('[') {
                out.push('.');
            }
            out.push_str(part);
        }
        out
    }

    fn error(&self, reason: impl Into<String>) -> ParseError {
        ParseError::invalid(self.path(), reason)
    }

    fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], ParseError> {
        if count > self.remaining() {
            return Err(self.error(format!(
                "need {} bytes at offset {}, have {}",
                count,
                self.offset,
                self.remaining()
            )));
        }
        let slice = &self.buffer[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    /// Read an element count and make sure that many elements can still fit.
    fn read_count(&mut self, min_element_size: usize) -> Result<usize, ParseError> {
        let count = B::read_u32(self.read_bytes(4)?) as usize;
        let needed = count.saturating_mul(min_element_size);
        if needed > self.remaining() {
            return Err(self.error(format!(
                "count {} needs at least {} bytes, have {}",
                count,
                needed,
                self.remaining()
            )));
        }
        Ok(count)
    }

    fn decode_value(&mut self, schema: &Schema) -> Result<Value, ParseError> {
        match &schema.shape {
            TypeKind::Primitive { primitive } => self.decode_primitive(*primitive),
            TypeKind::Struct { fields } => {
                let mut map = std::collections::HashMap::with_capacity(fields.len());
                for field in fields {
                    self.path.push(field.name.clone());
                    let value = self.decode_value(&field.schema)?;
                    self.path.pop();
                    map.insert(field.name.clone(), value);
                }
                Ok(Value::Struct(map))
            }
            TypeKind::Sequence { element } => {
                let count = self.read_count(element.min_encoded_size())?;
                self.decode_elements(element, count).map(Value::Sequence)
            }
            TypeKind::Array { element, length } => {
                self.decode_elements(element, *length).map(Value::Array)
            }
        }
    }

    fn decode_elements(&mut self, element: &Schema, count: usize) -> Result<Vec<Value>, ParseError> {
        let mut items = Vec::with_capacity(count);
        if element.as_primitive().is_some() {
            for _ in 0..count {
                items.push(self.decode_value(element)?);
            }
            return Ok(items);
        }
        let depth = self.path.len();
        for i in 0..count {
            self.path.push(format!("[{i}]"));
            let item = self.decode_value(element).map_err(|source| {
                self.path.truncate(depth);
                ParseError::PartialSequence {
                    field: self.path(),
                    decoded: i,
                    declared: count,
                    source: Box::new(source),
                }
            })?;
            self.path.pop();
            items.push(item);
        }
        Ok(items)
    }

    fn decode_primitive(&mut self, kind: PrimitiveKind) -> Result<Value, ParseError> {
        Ok(match kind {
            PrimitiveKind::Bool => match self.read_bytes(1)?[0] {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => return Err(self.error(format!("invalid bool byte {other:#04x}"))),
            },
            PrimitiveKind::U8 => Value::U8(self.read_bytes(1)?[0]),
            PrimitiveKind::I8 => Value::I8(self.read_bytes(1)?[0] as i8),
            PrimitiveKind::U16 => Value::U16(B::read_u16(self.read_bytes(2)?)),
            PrimitiveKind::I16 => Value::I16(B::read_i16(self.read_bytes(2)?)),
            PrimitiveKind::U32 => Value::U32(B::read_u32(self.read_bytes(4)?)),
            PrimitiveKind::I32 => Value::I32(B::read_i32(self.read_bytes(4)?)),
            PrimitiveKind::U64 => Value::U64(B::read_u64(self.read_bytes(8)?)),
            PrimitiveKind::I64 => Value::I64(B::read_i64(self.read_bytes(8)?)),
            PrimitiveKind::F32 => Value::F32(B::read_f32(self.read_bytes(4)?)),
            PrimitiveKind::F64 => Value::F64(B::read_f64(self.read_bytes(8)?)),
            PrimitiveKind::String => {
                let len = self.read_count(1)?;
                let bytes = self.read_bytes(len)?;
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| self.error(format!("string is not UTF-8: {e}")))?;
                Value::String(text.to_string())
            }
        })
    }
}

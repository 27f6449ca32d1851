// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Human-readable Ascii payloads.
//!
//! ```text
//! data =
//! {
//!   m_dims = 1;
//!   elementsPerDimension =
//!   {
//!     elementsPerDimension[4] =
//!       2 0 0
//!       0;
//!   }
//!   m_data[2] =
//!   {
//!     [0] =
//!     {
//!       owner = 1;
//!       ...
//!     }
//!   }
//! }
//! ```
//!
//! With `WITH_TYPE=TRUE` every label is preceded by its type tag
//! (`struct BBDMArrayBlockF32 data =`, `int m_dims = 1;`). The reader accepts
//! both variants regardless of the option.

use std::fmt::Write as _;

use tracing::warn;

use crate::error::ParseError;
use crate::format::{Codec, Format};
use crate::schema::{PrimitiveKind, Schema, TypeKind};
use crate::value::Value;

/// Number of list elements per output line.
pub const COLUMN_WRAP: usize = 3;

const INDENT: &str = "  ";

/// Ascii payload codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiCodec {
    with_type: bool,
}

impl AsciiCodec {
    pub fn new(with_type: bool) -> Self {
        Self { with_type }
    }

    pub fn from_options(options: &str) -> Result<Self, ParseError> {
        match options.trim() {
            "" | "WITH_TYPE=FALSE" => Ok(Self::new(false)),
            "WITH_TYPE=TRUE" => Ok(Self::new(true)),
            other => Err(ParseError::BadOptions {
                format: Format::Ascii.to_string(),
                option: other.to_string(),
            }),
        }
    }

    pub fn with_type(&self) -> bool {
        self.with_type
    }

    /// Render a value to text.
    pub fn render(&self, name: &str, schema: &Schema, value: &Value) -> Result<String, ParseError> {
        value.conforms_to(schema)?;
        let mut writer = Writer {
            out: String::new(),
            depth: 0,
            with_type: self.with_type,
        };
        writer.member(name, schema, value);
        Ok(writer.out)
    }
}

impl Codec for AsciiCodec {
    fn format(&self) -> Format {
        Format::Ascii
    }

    fn options(&self) -> String {
        format!("WITH_TYPE={}", if self.with_type { "TRUE" } else { "FALSE" })
    }

    fn encode(&self, name: &str, schema: &Schema, value: &Value) -> Result<Vec<u8>, ParseError> {
        self.render(name, schema, value).map(String::into_bytes)
    }

    fn decode(&self, name: &str, schema: &Schema, payload: &[u8]) -> Result<Value, ParseError> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| ParseError::invalid(schema.name.as_str(), format!("payload is not UTF-8: {e}")))?;
        let mut parser = Parser::new(text);
        let value = parser.root(name, schema)?;
        if let Some((token, line)) = parser.next()? {
            return Err(ParseError::invalid(
                schema.name.as_str(),
                format!("line {line}: unexpected {} after the object", token.describe()),
            ));
        }
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

struct Writer {
    out: String,
    depth: usize,
    with_type: bool,
}

impl Writer {
    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    fn tag(&mut self, tag: &str) {
        if self.with_type {
            self.out.push_str(tag);
            self.out.push(' ');
        }
    }

    fn open(&mut self) {
        self.indent();
        self.out.push_str("{\n");
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth -= 1;
        self.indent();
        self.out.push_str("}\n");
    }

    // Values were checked against the schema before rendering.
    fn member(&mut self, label: &str, schema: &Schema, value: &Value) {
        self.indent();
        match (&schema.shape, value) {
            (TypeKind::Primitive { primitive }, value) => {
                self.tag(primitive.type_tag());
                let _ = write!(self.out, "{label} = ");
                write_primitive(&mut self.out, value);
                self.out.push_str(";\n");
            }
            (TypeKind::Struct { fields }, Value::Struct(map)) => {
                if self.with_type {
                    let _ = write!(self.out, "struct {} ", schema.name);
                }
                let _ = writeln!(self.out, "{label} =");
                self.open();
                for field in fields {
                    if let Some(field_value) = map.get(&field.name) {
                        self.member(&field.name, &field.schema, field_value);
                    }
                }
                self.close();
            }
            (
                TypeKind::Sequence { element } | TypeKind::Array { element, .. },
                Value::Sequence(items) | Value::Array(items),
            ) => self.list(label, element, items),
            _ => {}
        }
    }

    fn list(&mut self, label: &str, element: &Schema, items: &[Value]) {
        let tag = match element.as_primitive() {
            Some(primitive) => primitive.type_tag(),
            None => element.name.as_str(),
        };
        if self.with_type {
            let _ = write!(self.out, "{tag} ");
        }
        let _ = write!(self.out, "{label}[{}] =", items.len());

        if element.as_primitive().is_none() {
            self.out.push('\n');
            self.open();
            for (i, item) in items.iter().enumerate() {
                self.member(&format!("[{i}]"), element, item);
            }
            self.close();
            return;
        }

        self.depth += 1;
        for (i, item) in items.iter().enumerate() {
            if i % COLUMN_WRAP == 0 {
                self.out.push('\n');
                self.indent();
            } else {
                self.out.push(' ');
            }
            write_primitive(&mut self.out, item);
        }
        self.depth -= 1;
        self.out.push_str(";\n");
    }
}

fn write_primitive(out: &mut String, value: &Value) {
    let _ = match value {
        Value::Bool(v) => write!(out, "{v}"),
        Value::U8(v) => write!(out, "{v}"),
        Value::U16(v) => write!(out, "{v}"),
        Value::U32(v) => write!(out, "{v}"),
        Value::U64(v) => write!(out, "{v}"),
        Value::I8(v) => write!(out, "{v}"),
        Value::I16(v) => write!(out, "{v}"),
        Value::I32(v) => write!(out, "{v}"),
        Value::I64(v) => write!(out, "{v}"),
        Value::F32(v) => write!(out, "{v}"),
        Value::F64(v) => write!(out, "{v}"),
        Value::String(s) => {
            out.push('"');
            for c in s.chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    '\r' => out.push_str("\\r"),
                    c => out.push(c),
                }
            }
            out.push('"');
            Ok(())
        }
        Value::Struct(_) | Value::Sequence(_) | Value::Array(_) => Ok(()),
    };
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Word(&'a str),
    Str(String),
    Equals,
    Open,
    Close,
    LBracket,
    RBracket,
    Semicolon,
}

impl Token<'_> {
    fn describe(&self) -> String {
        match self {
            Self::Word(w) => format!("'{w}'"),
            Self::Str(s) => format!("string \"{s}\""),
            Self::Equals => "'='".into(),
            Self::Open => "'{'".into(),
            Self::Close => "'}'".into(),
            Self::LBracket => "'['".into(),
            Self::RBracket => "']'".into(),
            Self::Semicolon => "';'".into(),
        }
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '=' | '{' | '}' | '[' | ']' | ';' | '"')
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1 }
    }

    fn next_token(&mut self) -> Result<Option<(Token<'a>, usize)>, String> {
        let rest = &self.src[self.pos..];
        let trimmed = rest.trim_start();
        self.line += rest[..rest.len() - trimmed.len()].matches('\n').count();
        self.pos += rest.len() - trimmed.len();

        let mut chars = trimmed.chars();
        let Some(first) = chars.next() else {
            return Ok(None);
        };
        let line = self.line;
        let single = match first {
            '=' => Some(Token::Equals),
            '{' => Some(Token::Open),
            '}' => Some(Token::Close),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ';' => Some(Token::Semicolon),
            _ => None,
        };
        if let Some(token) = single {
            self.pos += 1;
            return Ok(Some((token, line)));
        }

        if first == '"' {
            let mut text = String::new();
            let mut consumed = 1;
            let mut escaped = false;
            for c in chars {
                consumed += c.len_utf8();
                if escaped {
                    text.push(match c {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    self.line += text.matches('\n').count();
                    self.pos += consumed;
                    return Ok(Some((Token::Str(text), line)));
                } else {
                    text.push(c);
                }
            }
            return Err(format!("line {line}: unterminated string"));
        }

        let len = trimmed.find(is_delimiter).unwrap_or(trimmed.len());
        self.pos += len;
        Ok(Some((Token::Word(&trimmed[..len]), line)))
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// What a member label must name.
enum Expect<'s> {
    Root(&'s str),
    Field(&'s str),
    Element(usize),
}

struct Label<'a> {
    words: Vec<&'a str>,
    indices: Vec<usize>,
    line: usize,
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<(Token<'a>, usize)>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            lexer: Lexer::new(src),
            peeked: None,
        }
    }

    fn next(&mut self) -> Result<Option<(Token<'a>, usize)>, ParseError> {
        if let Some(peeked) = self.peeked.take() {
            return Ok(Some(peeked));
        }
        self.lexer
            .next_token()
            .map_err(|reason| ParseError::invalid("", reason))
    }

    fn expect_next(&mut self, path: &str) -> Result<(Token<'a>, usize), ParseError> {
        self.next()?.ok_or_else(|| {
            ParseError::invalid(path, format!("line {}: unexpected end of payload", self.lexer.line))
        })
    }

    fn expect(&mut self, wanted: Token<'static>, path: &str) -> Result<(), ParseError> {
        let (token, line) = self.expect_next(path)?;
        if token == wanted {
            Ok(())
        } else {
            Err(ParseError::invalid(
                path,
                format!("line {line}: expected {}, found {}", wanted.describe(), token.describe()),
            ))
        }
    }

    fn root(&mut self, name: &str, schema: &Schema) -> Result<Value, ParseError> {
        self.member(Expect::Root(name), schema, "")
    }

    /// `word* ('[' n ']')* '='`
    fn label(&mut self, path: &str) -> Result<Label<'a>, ParseError> {
        let mut words = Vec::new();
        let mut indices = Vec::new();
        let mut first_line = None;
        loop {
            let (token, line) = self.expect_next(path)?;
            first_line.get_or_insert(line);
            match token {
                Token::Word(word) if indices.is_empty() => words.push(word),
                Token::LBracket => {
                    let (token, line) = self.expect_next(path)?;
                    let index = match token {
                        Token::Word(word) => word.parse::<usize>().map_err(|_| {
                            ParseError::invalid(path, format!("line {line}: invalid index '{word}'"))
                        })?,
                        other => {
                            return Err(ParseError::invalid(
                                path,
                                format!("line {line}: expected an index, found {}", other.describe()),
                            ))
                        }
                    };
                    self.expect(Token::RBracket, path)?;
                    indices.push(index);
                }
                Token::Equals => break,
                other => {
                    return Err(ParseError::invalid(
                        path,
                        format!("line {line}: unexpected {} in a label", other.describe()),
                    ))
                }
            }
        }
        Ok(Label {
            words,
            indices,
            line: first_line.unwrap_or(self.lexer.line),
        })
    }

    fn member(&mut self, expect: Expect<'_>, schema: &Schema, parent: &str) -> Result<Value, ParseError> {
        let path = match &expect {
            Expect::Root(_) => String::new(),
            Expect::Field(name) if parent.is_empty() => (*name).to_string(),
            Expect::Field(name) => format!("{parent}.{name}"),
            Expect::Element(i) => format!("{parent}[{i}]"),
        };
        let label = self.label(&path)?;
        let mut indices = label.indices.as_slice();

        match expect {
            Expect::Root(name) => {
                let found = label.words.last().copied().unwrap_or_default();
                if found != name {
                    warn!(expected = name, found, "Ascii payload names a different instance");
                }
            }
            Expect::Field(name) => {
                if label.words.last().copied() != Some(name) {
                    return Err(ParseError::invalid(
                        path,
                        format!(
                            "line {}: expected field '{}', found '{}'",
                            label.line,
                            name,
                            label.words.join(" ")
                        ),
                    ));
                }
            }
            Expect::Element(i) => match indices.split_first() {
                Some((&index, rest)) if index == i => indices = rest,
                _ => {
                    return Err(ParseError::invalid(
                        path,
                        format!("line {}: expected element [{i}]", label.line),
                    ))
                }
            },
        }

        match &schema.shape {
            TypeKind::Primitive { primitive } => {
                no_length(indices, &path, label.line)?;
                let value = self.primitive(*primitive, &path)?;
                self.expect(Token::Semicolon, &path)?;
                Ok(value)
            }
            TypeKind::Struct { fields } => {
                no_length(indices, &path, label.line)?;
                self.expect(Token::Open, &path)?;
                let mut map = std::collections::HashMap::with_capacity(fields.len());
                for field in fields {
                    let value = self.member(Expect::Field(&field.name), &field.schema, &path)?;
                    map.insert(field.name.clone(), value);
                }
                self.expect(Token::Close, &path)?;
                Ok(Value::Struct(map))
            }
            TypeKind::Sequence { element } => {
                let count = one_length(indices, &path, label.line)?;
                self.list(element, count, &path).map(Value::Sequence)
            }
            TypeKind::Array { element, length } => {
                let count = one_length(indices, &path, label.line)?;
                if count != *length {
                    return Err(ParseError::invalid(
                        path,
                        format!("line {}: array of {length} declared with {count} elements", label.line),
                    ));
                }
                self.list(element, count, &path).map(Value::Array)
            }
        }
    }

    fn list(&mut self, element: &Schema, count: usize, path: &str) -> Result<Vec<Value>, ParseError> {
        let mut items = Vec::with_capacity(count.min(1024));
        if let Some(primitive) = element.as_primitive() {
            for _ in 0..count {
                items.push(self.primitive(primitive, path)?);
            }
            self.expect(Token::Semicolon, path)?;
            return Ok(items);
        }

        self.expect(Token::Open, path)?;
        for i in 0..count {
            let item = self
                .member(Expect::Element(i), element, path)
                .map_err(|source| ParseError::PartialSequence {
                    field: path.to_string(),
                    decoded: i,
                    declared: count,
                    source: Box::new(source),
                })?;
            items.push(item);
        }
        self.expect(Token::Close, path)?;
        Ok(items)
    }

    fn primitive(&mut self, kind: PrimitiveKind, path: &str) -> Result<Value, ParseError> {
        let (token, line) = self.expect_next(path)?;
        let bad = |text: &str| {
            ParseError::invalid(
                path,
                format!("line {line}: '{text}' is not a valid {}", kind.type_tag()),
            )
        };
        let word = match token {
            Token::Str(text) if kind == PrimitiveKind::String => return Ok(Value::String(text)),
            Token::Word(word) if kind != PrimitiveKind::String => word,
            other => return Err(bad(&other.describe())),
        };
        Ok(match kind {
            PrimitiveKind::Bool => match word {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => return Err(bad(word)),
            },
            PrimitiveKind::U8 => Value::U8(word.parse().map_err(|_| bad(word))?),
            PrimitiveKind::U16 => Value::U16(word.parse().map_err(|_| bad(word))?),
            PrimitiveKind::U32 => Value::U32(word.parse().map_err(|_| bad(word))?),
            PrimitiveKind::U64 => Value::U64(word.parse().map_err(|_| bad(word))?),
            PrimitiveKind::I8 => Value::I8(word.parse().map_err(|_| bad(word))?),
            PrimitiveKind::I16 => Value::I16(word.parse().map_err(|_| bad(word))?),
            PrimitiveKind::I32 => Value::I32(word.parse().map_err(|_| bad(word))?),
            PrimitiveKind::I64 => Value::I64(word.parse().map_err(|_| bad(word))?),
            PrimitiveKind::F32 => Value::F32(word.parse().map_err(|_| bad(word))?),
            PrimitiveKind::F64 => Value::F64(word.parse().map_err(|_| bad(word))?),
            PrimitiveKind::String => return Err(bad(word)),
        })
    }
}

fn no_length(indices: &[usize], path: &str, line: usize) -> Result<(), ParseError> {
    if indices.is_empty() {
        Ok(())
    } else {
        Err(ParseError::invalid(
            path,
            format!("line {line}: unexpected element count on a scalar member"),
        ))
    }
}

fn one_length(indices: &[usize], path: &str, line: usize) -> Result<usize, ParseError> {
    match indices {
        [count] => Ok(*count),
        _ => Err(ParseError::invalid(
            path,
            format!("line {line}: expected exactly one element count"),
        )),
    }
}

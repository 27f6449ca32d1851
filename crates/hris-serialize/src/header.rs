// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stream header codec.
//!
//! Every record starts with one text line naming the type, the data name,
//! the payload length and the payload format:
//!
//! ```text
//! HRIS-2.0 type = 'BBDMArrayBlockF32' name = data objSize =        312 format = Binary opts = 'LITTLE_ENDIAN'
//! ```
//!
//! The line looks the same whatever the payload format is. Readers also
//! accept the older whitespace-separated form:
//!
//! ```text
//! HRIS-1.0 BBDMArrayBlockF32 data 312 Binary LITTLE_ENDIAN
//! ```

use std::fmt;
use std::io::{BufRead, Read, Write};

use tracing::debug;

use crate::error::{Error, ParseError, Result};
use crate::format::Format;
use crate::schema::is_identifier;

/// Every header line starts with this.
pub const PREAMBLE: &str = "HRIS-";

/// Version written by [`StreamHeader::to_line`].
pub const VERSION_MAJOR: u32 = 2;
pub const VERSION_MINOR: u32 = 0;

/// Longest accepted header element (type, name, format, options).
pub const MAX_ELEMENT_LEN: usize = 2048;

/// Longest accepted header line.
pub const MAX_HEADER_LEN: usize = 5 * MAX_ELEMENT_LEN;

/// Data name used when none is given.
pub const DEFAULT_DATA_NAME: &str = "data";

/// Decoded header of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    pub type_name: String,
    pub data_name: String,
    pub format: Format,
    /// Payload length in bytes.
    pub payload_len: u64,
    pub options: String,
}

impl StreamHeader {
    /// Header with the default data name and the format's default options.
    pub fn new(type_name: impl Into<String>, format: Format, payload_len: u64) -> Self {
        Self {
            type_name: type_name.into(),
            data_name: DEFAULT_DATA_NAME.to_string(),
            format,
            payload_len,
            options: format.default_options().to_string(),
        }
    }

    pub fn with_data_name(mut self, name: impl Into<String>) -> Self {
        self.data_name = name.into();
        self
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }

    /// Check that every element fits the on-wire form.
    pub fn validate(&self) -> std::result::Result<(), ParseError> {
        check_element("type", &self.type_name, false)?;
        check_element("name", &self.data_name, false)?;
        // The data name doubles as the Ascii root label.
        if !is_identifier(&self.data_name) {
            return Err(ParseError::MalformedHeader(format!(
                "data name '{}' is not an identifier",
                self.data_name
            )));
        }
        check_element("opts", &self.options, true)?;
        Ok(())
    }

    /// Render the header line, newline included.
    pub fn to_line(&self) -> std::result::Result<String, ParseError> {
        self.validate()?;
        Ok(format!(
            "{PREAMBLE}{VERSION_MAJOR}.{VERSION_MINOR} type = '{}' name = {} objSize = {:10} format = {} opts = '{}'\n",
            self.type_name, self.data_name, self.payload_len, self.format, self.options
        ))
    }

    /// Parse one header line (trailing newline optional).
    pub fn parse_line(line: &str) -> std::result::Result<Self, ParseError> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.len() > MAX_HEADER_LEN {
            return Err(ParseError::MalformedHeader(format!(
                "header line exceeds {MAX_HEADER_LEN} bytes"
            )));
        }
        let rest = line.strip_prefix(PREAMBLE).ok_or(ParseError::BadMagic)?;
        let (version, body) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let (major, minor) = parse_version(version)?;
        let header = match major {
            2 => parse_keyed(body)?,
            1 => parse_legacy(body)?,
            _ => return Err(ParseError::UnsupportedVersion { major, minor }),
        };
        header.validate()?;
        Ok(header)
    }
}

impl fmt::Display for StreamHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' ({}, {} bytes)",
            self.format, self.type_name, self.data_name, self.payload_len
        )
    }
}

fn check_element(
    field: &'static str,
    value: &str,
    allow_empty: bool,
) -> std::result::Result<(), ParseError> {
    if value.is_empty() && !allow_empty {
        return Err(ParseError::EmptyHeaderField(field));
    }
    if value.len() > MAX_ELEMENT_LEN {
        return Err(ParseError::HeaderFieldTooLong {
            field,
            max: MAX_ELEMENT_LEN,
        });
    }
    if value.contains(['\'', '\n', '\r']) {
        return Err(ParseError::MalformedHeader(format!(
            "header element '{field}' contains a quote or line break"
        )));
    }
    Ok(())
}

fn parse_version(text: &str) -> std::result::Result<(u32, u32), ParseError> {
    let bad = || ParseError::MalformedHeader(format!("bad header version '{text}'"));
    let (major, minor) = text.split_once('.').ok_or_else(bad)?;
    Ok((
        major.parse().map_err(|_| bad())?,
        minor.parse().map_err(|_| bad())?,
    ))
}

fn parse_len(text: &str) -> std::result::Result<u64, ParseError> {
    text.parse()
        .map_err(|_| ParseError::MalformedHeader(format!("bad objSize '{text}'")))
}

/// `key = value` pairs; values may be single-quoted.
fn parse_keyed(body: &str) -> std::result::Result<StreamHeader, ParseError> {
    let mut type_name = None;
    let mut data_name = None;
    let mut payload_len = None;
    let mut format = None;
    let mut options = None;

    let mut rest = body.trim_start();
    while !rest.is_empty() {
        let (key, after) = rest
            .split_once('=')
            .ok_or_else(|| ParseError::MalformedHeader(format!("expected 'key = value' at '{rest}'")))?;
        let key = key.trim();
        let after = after.trim_start();
        let (value, remaining) = if let Some(quoted) = after.strip_prefix('\'') {
            let end = quoted.find('\'').ok_or_else(|| {
                ParseError::MalformedHeader(format!("unterminated quote in '{key}'"))
            })?;
            (&quoted[..end], &quoted[end + 1..])
        } else {
            after.split_once(char::is_whitespace).unwrap_or((after, ""))
        };
        match key {
            "type" => type_name = Some(value.to_string()),
            "name" => data_name = Some(value.to_string()),
            "objSize" => payload_len = Some(parse_len(value)?),
            "format" => format = Some(value.parse::<Format>()?),
            "opts" => options = Some(value.to_string()),
            other => debug!(key = other, "ignoring unknown header element"),
        }
        rest = remaining.trim_start();
    }

    let format = format.ok_or(ParseError::EmptyHeaderField("format"))?;
    Ok(StreamHeader {
        type_name: type_name.ok_or(ParseError::EmptyHeaderField("type"))?,
        data_name: data_name.unwrap_or_else(|| DEFAULT_DATA_NAME.to_string()),
        format,
        payload_len: payload_len.ok_or(ParseError::EmptyHeaderField("objSize"))?,
        options: options.unwrap_or_else(|| format.default_options().to_string()),
    })
}

/// `<type> <name> <len> <format> [<opts>]`
fn parse_legacy(body: &str) -> std::result::Result<StreamHeader, ParseError> {
    let words: Vec<&str> = body
        .split_whitespace()
        .map(|w| w.trim_matches('\''))
        .collect();
    let [type_name, data_name, len, format, opts @ ..] = words.as_slice() else {
        return Err(ParseError::MalformedHeader(format!(
            "legacy header needs type, name, size and format, found {} elements",
            words.len()
        )));
    };
    let format: Format = format.parse()?;
    Ok(StreamHeader {
        type_name: type_name.to_string(),
        data_name: data_name.to_string(),
        format,
        payload_len: parse_len(len)?,
        options: if opts.is_empty() {
            format.default_options().to_string()
        } else {
            opts.join(" ")
        },
    })
}

/// Write one header line. Returns the number of bytes written.
pub fn write_header<W: Write>(writer: &mut W, header: &StreamHeader) -> Result<usize> {
    let line = header.to_line()?;
    writer.write_all(line.as_bytes())?;
    Ok(line.len())
}

/// Read and parse the next header line, skipping blank lines.
///
/// Returns `None` at a clean end of stream.
pub fn read_header<R: BufRead>(reader: &mut R) -> Result<Option<StreamHeader>> {
    match next_header_line(reader)? {
        Some(line) => Ok(Some(StreamHeader::parse_line(&line.text)?)),
        None => Ok(None),
    }
}

/// A header line as found in the stream.
pub(crate) struct HeaderLine {
    /// Line without its line break
    pub text: String,
    /// Blank-line bytes skipped before the line
    pub skipped: u64,
    /// Length of the line including its line break
    pub len: u64,
}

/// Next non-blank line, at most [`MAX_HEADER_LEN`] bytes.
pub(crate) fn next_header_line<R: BufRead>(reader: &mut R) -> Result<Option<HeaderLine>> {
    let mut skipped = 0u64;
    loop {
        let mut buf = Vec::new();
        let limit = MAX_HEADER_LEN as u64 + 2;
        let n = reader.by_ref().take(limit).read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        if buf.last() != Some(&b'\n') {
            let reason = if n as u64 == limit {
                format!("header line exceeds {MAX_HEADER_LEN} bytes")
            } else {
                "unterminated header line".to_string()
            };
            return Err(Error::from(ParseError::MalformedHeader(reason)));
        }
        if buf.iter().all(u8::is_ascii_whitespace) {
            skipped += n as u64;
            continue;
        }
        let text = String::from_utf8(buf)
            .map_err(|_| ParseError::MalformedHeader("header line is not UTF-8".to_string()))?;
        return Ok(Some(HeaderLine {
            text: text.trim_end_matches(['\n', '\r']).to_string(),
            skipped,
            len: n as u64,
        }));
    }
}

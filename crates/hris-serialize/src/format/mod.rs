// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Payload codecs.
//!
//! Every codec renders and parses the same [`Value`] tree against the same
//! [`Schema`], so a record can move between representations without loss:
//!
//! | Format | Layout | Options |
//! |--------|--------|---------|
//! | Binary | dense, count-prefixed sequences | `LITTLE_ENDIAN` / `BIG_ENDIAN` |
//! | Ascii  | indented `name = value;` text | `WITH_TYPE=TRUE` / `WITH_TYPE=FALSE` |
//! | Json   | one object keyed by the type name | none |

pub mod ascii;
pub mod binary;
pub mod json;

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::schema::Schema;
use crate::value::Value;

pub use ascii::AsciiCodec;
pub use binary::{BinaryCodec, Endian};
pub use json::JsonCodec;

/// Payload representation recorded in a stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Binary,
    Ascii,
    Json,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Binary, Format::Ascii, Format::Json];

    /// Tag written into stream headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "Binary",
            Self::Ascii => "Ascii",
            Self::Json => "Json",
        }
    }

    /// Text formats delimit their payload by the next header line.
    pub fn is_text(&self) -> bool {
        !matches!(self, Self::Binary)
    }

    /// Options string written when the caller does not pick one.
    pub fn default_options(&self) -> &'static str {
        match self {
            Self::Binary => "LITTLE_ENDIAN",
            Self::Ascii => "WITH_TYPE=FALSE",
            Self::Json => "",
        }
    }

    /// Build the codec for this format from a header options string.
    pub fn codec(&self, options: &str) -> Result<Box<dyn Codec>, ParseError> {
        Ok(match self {
            Self::Binary => Box::new(BinaryCodec::from_options(options)?),
            Self::Ascii => Box::new(AsciiCodec::from_options(options)?),
            Self::Json => Box::new(JsonCodec::from_options(options)?),
        })
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(Self::Binary),
            "ascii" => Ok(Self::Ascii),
            "json" => Ok(Self::Json),
            _ => Err(ParseError::UnknownFormat(s.to_string())),
        }
    }
}

/// Shared contract of the Binary, Ascii and Json codecs.
///
/// `name` is the record's data name; text codecs use it as the root label.
pub trait Codec: Send + Sync {
    fn format(&self) -> Format;

    /// Options string describing this codec, as written into headers.
    fn options(&self) -> String;

    fn encode(&self, name: &str, schema: &Schema, value: &Value) -> Result<Vec<u8>, ParseError>;

    fn decode(&self, name: &str, schema: &Schema, payload: &[u8]) -> Result<Value, ParseError>;
}

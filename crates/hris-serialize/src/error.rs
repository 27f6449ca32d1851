// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy shared by the header codec, the payload codecs, the type
//! registry and the stream engine.
//!
//! The `Display` texts of [`LoadError`] and the input-file variants of
//! [`Error`] are consumed verbatim by scripts driving the command-line tools,
//! so they must stay stable.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::abi::HrisStatus;

/// Failure to turn a type name into a usable type library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// No loadable module was found, or the platform loader refused it.
    #[error("Could not load data library '{type_name}' ({file}): Reason '{reason}'")]
    LibraryNotFound {
        type_name: String,
        file: String,
        reason: String,
    },

    /// The module was loaded but does not implement the requested type.
    #[error("{type_name}: unsupported datatype ({type_name}_new() not found)")]
    UnsupportedType { type_name: String, library: String },

    /// The module implements the type but lacks another required entry point.
    #[error("Data library '{library}' is incompatible: {symbol}() not found")]
    MissingEntryPoint {
        type_name: String,
        library: String,
        symbol: String,
    },

    /// The module's shape metadata is unreadable or describes another type.
    #[error("Data library '{library}' is incompatible: {reason}")]
    Incompatible {
        type_name: String,
        library: String,
        reason: String,
    },

    /// The name cannot denote a type library at all.
    #[error("invalid type name '{0}'")]
    InvalidTypeName(String),
}

impl LoadError {
    /// Type name the failed lookup was made for.
    pub fn type_name(&self) -> &str {
        match self {
            Self::LibraryNotFound { type_name, .. }
            | Self::UnsupportedType { type_name, .. }
            | Self::MissingEntryPoint { type_name, .. }
            | Self::Incompatible { type_name, .. } => type_name,
            Self::InvalidTypeName(name) => name,
        }
    }
}

/// Malformed header or payload.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The record does not start with the `HRIS-` preamble.
    #[error("missing 'HRIS-' header preamble")]
    BadMagic,

    #[error("unsupported header version {major}.{minor}")]
    UnsupportedVersion { major: u32, minor: u32 },

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("unknown payload format '{0}'")]
    UnknownFormat(String),

    #[error("header element '{0}' is empty")]
    EmptyHeaderField(&'static str),

    #[error("header element '{field}' exceeds {max} bytes")]
    HeaderFieldTooLong { field: &'static str, max: usize },

    #[error("unsupported {format} option '{option}'")]
    BadOptions { format: String, option: String },

    /// Fewer payload bytes are left than the header declared.
    #[error("declared payload length {declared} exceeds the {available} bytes left in the stream")]
    Truncated { declared: u64, available: u64 },

    /// Payload structure does not match the type's shape.
    #[error("invalid data at '{path}': {reason}")]
    InvalidData { path: String, reason: String },

    /// A composite element list failed partway through.
    #[error("invalid data in '{field}' after {decoded} of {declared} elements: {source}")]
    PartialSequence {
        field: String,
        decoded: usize,
        declared: usize,
        #[source]
        source: Box<ParseError>,
    },
}

impl ParseError {
    pub(crate) fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True when the header line itself was rejected.
    pub fn is_header_error(&self) -> bool {
        matches!(
            self,
            Self::BadMagic
                | Self::UnsupportedVersion { .. }
                | Self::MalformedHeader(_)
                | Self::UnknownFormat(_)
                | Self::EmptyHeaderField(_)
                | Self::HeaderFieldTooLong { .. }
                | Self::BadOptions { .. }
        )
    }

    /// Number of composite elements decoded before the failure, if the
    /// failure happened inside an element list.
    pub fn decoded_elements(&self) -> Option<usize> {
        match self {
            Self::PartialSequence { decoded, .. } => Some(*decoded),
            _ => None,
        }
    }
}

/// Top-level error of the serialization engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A type library entry point reported a failure.
    #[error("{type_name}_{call}() failed with status {status:?}")]
    Library {
        type_name: String,
        call: &'static str,
        status: HrisStatus,
    },

    /// Processing of one record of a stream failed.
    #[error("record #{index} at byte offset {offset}: {source}")]
    Record {
        index: usize,
        offset: u64,
        #[source]
        source: Box<Error>,
    },

    #[error("The input file '{}' does not exist or is not readable", .path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("The input file '{}' does not contain valid data", .path.display())]
    InvalidInput {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("Input and output file must not be the same.")]
    SameFile,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Innermost error, looking through record and input-file context.
    pub fn root(&self) -> &Error {
        match self {
            Self::Record { source, .. } | Self::InvalidInput { source, .. } => source.root(),
            other => other,
        }
    }

    /// The load failure behind this error, if any.
    pub fn as_load_error(&self) -> Option<&LoadError> {
        match self.root() {
            Self::Load(err) => Some(err),
            _ => None,
        }
    }

    /// The parse failure behind this error, if any.
    pub fn as_parse_error(&self) -> Option<&ParseError> {
        match self.root() {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }

    pub(crate) fn in_record(self, index: usize, offset: u64) -> Self {
        match self {
            already @ Self::Record { .. } => already,
            other => Self::Record {
                index,
                offset,
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_messages() {
        let err = LoadError::LibraryNotFound {
            type_name: "BBDMArrayBlockF32".into(),
            file: "libBBDMArrayBlockF32.so".into(),
            reason: "cannot open shared object file".into(),
        };
        assert_eq!(
            err.to_string(),
            "Could not load data library 'BBDMArrayBlockF32' (libBBDMArrayBlockF32.so): \
             Reason 'cannot open shared object file'"
        );

        let err = LoadError::UnsupportedType {
            type_name: "BBDMBaseF32".into(),
            library: "libBBDMBaseF32.so".into(),
        };
        assert_eq!(
            err.to_string(),
            "BBDMBaseF32: unsupported datatype (BBDMBaseF32_new() not found)"
        );
    }

    #[test]
    fn test_root_looks_through_context() {
        let inner = Error::from(ParseError::invalid("m_data", "short"));
        let err = Error::InvalidInput {
            path: PathBuf::from("in.ser"),
            source: Box::new(inner.in_record(3, 120)),
        };
        assert_eq!(
            err.to_string(),
            "The input file 'in.ser' does not contain valid data"
        );
        assert!(err.as_parse_error().is_some());
        assert!(err.as_load_error().is_none());
    }

    #[test]
    fn test_in_record_does_not_nest() {
        let err = Error::SameFile.in_record(1, 10).in_record(2, 20);
        match err {
            Error::Record { index, offset, .. } => {
                assert_eq!(index, 1);
                assert_eq!(offset, 10);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

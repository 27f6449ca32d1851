// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HRIS Serialization
//!
//! Self-describing record streams for types implemented in separately
//! loaded type libraries:
//! - One header line per record, identical for every payload format
//! - Binary, Ascii and JSON payloads rendered from one shape description
//! - Type libraries `lib<Type>.so` resolved by name, loaded once per process
//! - Create / Convert / Print workflows with atomic file output
//!
//! # Quick Start
//!
//! ```bash
//! # Five JSON records of a 2-D array block
//! CreateSerializedData -t BBDMArrayBlockF32 -c 5 -f Json -i "dims=2 extents=5,1" -o blocks.json
//!
//! # Convert to binary, then print
//! ConvertSerializedData -i blocks.json -f Binary -o blocks.bin
//! PrintSerializedData -f blocks.bin
//! ```
//!
//! # Format Comparison
//!
//! | Feature | Binary | Ascii | Json |
//! |---------|--------|-------|------|
//! | Compact | [OK] | [X] | [X] |
//! | Diffable | [X] | [OK] | [OK] |
//! | Fields by name | [X] | [OK] | [OK] |
//! | Byte order option | [OK] | n/a | n/a |

pub mod abi;
pub mod engine;
pub mod error;
pub mod export;
pub mod format;
pub mod header;
pub mod output;
pub mod registry;
pub mod schema;
pub mod stream;
pub mod value;

pub use abi::{EntryPoints, HrisStatus, PopulateParams};
pub use engine::{
    convert, convert_file, create, create_to, print, print_file, ConvertOptions, CreateOptions,
    PrintOptions, Summary, MAX_COUNT,
};
pub use error::{Error, LoadError, ParseError, Result};
pub use export::{DataType, ExportedType};
pub use format::{AsciiCodec, BinaryCodec, Codec, Endian, Format, JsonCodec};
pub use header::{read_header, write_header, StreamHeader};
pub use output::OutputTarget;
pub use registry::{library_file_name, Instance, LoaderConfig, Origin, Registry, TypeDescriptor};
pub use schema::{Field, PrimitiveKind, Schema, SchemaBuilder, TypeKind};
pub use stream::{RawRecord, StreamReader, StreamWriter};
pub use value::Value;

#[doc(hidden)]
pub use paste as __paste;

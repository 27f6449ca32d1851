// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared plumbing of the `CreateSerializedData`, `ConvertSerializedData`
//! and `PrintSerializedData` tools.
//!
//! # Usage
//!
//! ```bash
//! # Ten records with random values, Ascii on stdout
//! CreateSerializedData -t BBDMArrayBlockF32 -c 10 -r -f Ascii
//!
//! # Binary to Json, first three records only
//! ConvertSerializedData -i blocks.bin -f Json -m 3 -o blocks.json
//!
//! # Human-readable dump with type tags
//! PrintSerializedData -f blocks.bin --with-type
//! ```
//!
//! Type libraries are looked up in `-L` directories, then in
//! `HRIS_LIBRARY_PATH`, then through the platform loader.

pub mod cli;
pub mod exit;
pub mod logging;

pub use cli::{CommonArgs, ConvertArgs, CreateArgs, PrintArgs};
pub use exit::{exit_code, report, ExitStatus};
pub use logging::init_logging;

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process exit codes.
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | any other failure |
//! | 2 | type library not found |
//! | 3 | invalid input data |
//! | 4 | unsupported data type |
//! | 5 | incompatible type library |
//! | 6 | I/O failure |

use std::process::ExitCode;

use hris_serialize::registry::SYSTEM_PATH_ENV;
use hris_serialize::{Error, LoadError};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    Success = 0,
    Failure = 1,
    LibraryNotFound = 2,
    InvalidData = 3,
    UnsupportedType = 4,
    IncompatibleLibrary = 5,
    Io = 6,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status as u8)
    }
}

fn load_status(err: &LoadError) -> ExitStatus {
    match err {
        LoadError::LibraryNotFound { .. } => ExitStatus::LibraryNotFound,
        LoadError::UnsupportedType { .. } | LoadError::InvalidTypeName(_) => ExitStatus::UnsupportedType,
        LoadError::MissingEntryPoint { .. } | LoadError::Incompatible { .. } => {
            ExitStatus::IncompatibleLibrary
        }
    }
}

fn engine_status(err: &Error) -> ExitStatus {
    if let Some(load) = err.as_load_error() {
        return load_status(load);
    }
    match err {
        Error::InvalidInput { .. } => return ExitStatus::InvalidData,
        Error::InputUnreadable { .. } => return ExitStatus::Io,
        _ => {}
    }
    match err.root() {
        Error::Parse(_) => ExitStatus::InvalidData,
        Error::Io(_) | Error::InputUnreadable { .. } => ExitStatus::Io,
        _ => ExitStatus::Failure,
    }
}

/// Exit status for a failed run.
pub fn exit_code(err: &anyhow::Error) -> ExitStatus {
    if let Some(err) = err.downcast_ref::<Error>() {
        engine_status(err)
    } else if let Some(err) = err.downcast_ref::<LoadError>() {
        load_status(err)
    } else if err.downcast_ref::<std::io::Error>().is_some() {
        ExitStatus::Io
    } else {
        ExitStatus::Failure
    }
}

/// Log the outcome of a run and pick the process exit status.
pub fn report<T>(result: anyhow::Result<T>) -> ExitStatus {
    let Err(err) = result else {
        return ExitStatus::Success;
    };
    error!("{:#}", err);
    let status = exit_code(&err);
    if status == ExitStatus::LibraryNotFound {
        info!("Please make sure that the library is found in {}", SYSTEM_PATH_ENV);
    }
    status
}

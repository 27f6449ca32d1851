// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Locating and binding type libraries.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::PathBuf;

use libloading::Library;
use tracing::{debug, warn};

use crate::abi::{
    symbol_name, DeleteFn, DeserializeFn, EntryPoints, InitFn, NewFn, PopulateFn, SchemaFn,
    SerializeFn,
};
use crate::error::LoadError;
use crate::registry::config::LoaderConfig;
use crate::schema::is_identifier;

/// On-disk file name of the library implementing `type_name`,
/// e.g. `libBBDMArrayBlockF32.so`.
pub fn library_file_name(type_name: &str) -> String {
    format!("{DLL_PREFIX}{type_name}{DLL_SUFFIX}")
}

/// An opened library with its bound entry points.
pub(crate) struct LoadedLibrary {
    pub path: PathBuf,
    pub library: Library,
    pub entry_points: EntryPoints,
}

/// Find, open and bind the library of `type_name`.
pub(crate) fn load_library(type_name: &str, config: &LoaderConfig) -> Result<LoadedLibrary, LoadError> {
    if !is_identifier(type_name) {
        return Err(LoadError::InvalidTypeName(type_name.to_string()));
    }
    let file = library_file_name(type_name);
    let (library, path) = open(type_name, &file, config)?;
    debug!(type_name, path = %path.display(), "data library opened");
    // SAFETY: symbols are bound with the signatures of the type library ABI.
    let entry_points = unsafe { bind(type_name, &library, &path)? };
    Ok(LoadedLibrary {
        path,
        library,
        entry_points,
    })
}

fn open(type_name: &str, file: &str, config: &LoaderConfig) -> Result<(Library, PathBuf), LoadError> {
    let mut reason = None;

    for candidate in config.candidates(file) {
        // SAFETY: loading runs the library's initializers; type libraries
        // are trusted code found on the configured search path.
        match unsafe { Library::new(&candidate) } {
            Ok(library) => return Ok((library, candidate)),
            Err(e) => {
                warn!(path = %candidate.display(), "skipping data library: {}", e);
                reason.get_or_insert_with(|| e.to_string());
            }
        }
    }

    if config.use_system_path {
        // SAFETY: as above.
        match unsafe { Library::new(file) } {
            Ok(library) => return Ok((library, PathBuf::from(file))),
            Err(e) => {
                reason.get_or_insert_with(|| e.to_string());
            }
        }
    }

    Err(LoadError::LibraryNotFound {
        type_name: type_name.to_string(),
        file: file.to_string(),
        reason: reason.unwrap_or_else(|| {
            let dirs = config.directories();
            if dirs.is_empty() {
                "no search directories configured".to_string()
            } else {
                format!("not found in {} search directories", dirs.len())
            }
        }),
    })
}

/// # Safety
/// The library's `T_*` symbols must have the ABI signatures.
unsafe fn bind(type_name: &str, library: &Library, path: &std::path::Path) -> Result<EntryPoints, LoadError> {
    let library_name = path.display().to_string();

    let new: NewFn = symbol(library, type_name, "new").ok_or_else(|| LoadError::UnsupportedType {
        type_name: type_name.to_string(),
        library: library_name.clone(),
    })?;

    let missing = |call: &str| LoadError::MissingEntryPoint {
        type_name: type_name.to_string(),
        library: library_name.clone(),
        symbol: symbol_name(type_name, call),
    };
    let delete: DeleteFn = symbol(library, type_name, "delete").ok_or_else(|| missing("delete"))?;
    let serialize: SerializeFn =
        symbol(library, type_name, "serialize").ok_or_else(|| missing("serialize"))?;
    let deserialize: DeserializeFn =
        symbol(library, type_name, "deserialize").ok_or_else(|| missing("deserialize"))?;
    let schema: SchemaFn = symbol(library, type_name, "schema").ok_or_else(|| missing("schema"))?;

    let init: Option<InitFn> = symbol(library, type_name, "init");
    let populate: Option<PopulateFn> = symbol(library, type_name, "populate");

    Ok(EntryPoints {
        new,
        delete,
        serialize,
        deserialize,
        schema,
        init,
        populate,
    })
}

/// # Safety
/// `T` must be the type of the named symbol.
unsafe fn symbol<T: Copy>(library: &Library, type_name: &str, call: &str) -> Option<T> {
    let mut name = symbol_name(type_name, call).into_bytes();
    name.push(0);
    library.get::<T>(&name).ok().map(|sym| *sym)
}

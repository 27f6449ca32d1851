// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type registry.
//!
//! Resolves a type name to its [`TypeDescriptor`], loading the type library
//! `lib<T>.<ext>` on first use. Every name gets one load-once cell: concurrent
//! first requests wait for the same attempt, and the outcome (success or
//! failure) is kept for the rest of the process. Libraries are never unloaded.
//! Cached failures are dropped once [`MAX_CACHED_NAMES`] names are known.

mod config;
mod instance;
mod loader;

use std::collections::HashMap;
use std::ffi::CStr;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use libloading::Library;
use parking_lot::Mutex;
use tracing::{debug, info};

pub use config::{LoaderConfig, LIBRARY_PATH_ENV, SYSTEM_PATH_ENV};
pub use instance::Instance;
pub use loader::library_file_name;

use crate::abi::EntryPoints;
use crate::error::{LoadError, Result};
use crate::export::ExportedType;
use crate::schema::{is_identifier, Schema};

/// Where a descriptor's entry points come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Registered in-process with [`Registry::register`]
    Registered,
    /// Loaded from a type library
    Library(PathBuf),
}

/// A resolved type: its entry points and shape.
#[derive(Debug)]
pub struct TypeDescriptor {
    name: String,
    entry_points: EntryPoints,
    schema: Schema,
    origin: Origin,
    // Keeps the entry points valid; dropped last.
    _library: Option<Library>,
}

impl TypeDescriptor {
    fn new(
        name: &str,
        entry_points: EntryPoints,
        origin: Origin,
        library: Option<Library>,
    ) -> std::result::Result<Self, LoadError> {
        let schema = read_schema(name, &entry_points, &origin)?;
        Ok(Self {
            name: name.to_string(),
            entry_points,
            schema,
            origin,
            _library: library,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    pub fn supports_init(&self) -> bool {
        self.entry_points.init.is_some()
    }

    pub fn supports_populate(&self) -> bool {
        self.entry_points.populate.is_some()
    }

    /// Create a fresh object through `T_new`.
    pub fn construct(self: &Arc<Self>) -> Result<Instance> {
        Instance::new(Arc::clone(self))
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered => f.write_str("<registered>"),
            Self::Library(path) => write!(f, "{}", path.display()),
        }
    }
}

fn read_schema(
    type_name: &str,
    entry_points: &EntryPoints,
    origin: &Origin,
) -> std::result::Result<Schema, LoadError> {
    let incompatible = |reason: String| LoadError::Incompatible {
        type_name: type_name.to_string(),
        library: origin.to_string(),
        reason,
    };

    // SAFETY: `schema` returns null or a NUL-terminated string owned by the library.
    let text = unsafe {
        let raw = (entry_points.schema)();
        if raw.is_null() {
            return Err(incompatible(format!("{type_name}_schema() returned no schema")));
        }
        CStr::from_ptr(raw)
    };
    let text = text
        .to_str()
        .map_err(|_| incompatible(format!("{type_name}_schema() is not UTF-8")))?;
    let schema = Schema::from_json(text)
        .map_err(|e| incompatible(format!("unreadable schema: {e}")))?;
    schema.validate().map_err(&incompatible)?;
    if schema.name != type_name {
        return Err(incompatible(format!(
            "schema describes '{}' instead of '{}'",
            schema.name, type_name
        )));
    }
    Ok(schema)
}

type Slot = Arc<OnceLock<std::result::Result<Arc<TypeDescriptor>, LoadError>>>;

/// Names kept before cached load failures are evicted.
pub const MAX_CACHED_NAMES: usize = 1024;

fn is_failure(slot: &Slot) -> bool {
    matches!(slot.get(), Some(Err(_)))
}

/// Name-keyed cache of resolved types.
#[derive(Debug)]
pub struct Registry {
    config: LoaderConfig,
    entries: Mutex<HashMap<String, Slot>>,
    load_attempts: AtomicUsize,
}

impl Registry {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
            load_attempts: AtomicUsize::new(0),
        }
    }

    /// Process-wide registry, created on first use with
    /// [`LoaderConfig::default`].
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(|| Registry::new(LoaderConfig::default()))
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Resolve a type, loading its library on first request.
    pub fn resolve(&self, type_name: &str) -> std::result::Result<Arc<TypeDescriptor>, LoadError> {
        if !is_identifier(type_name) {
            return Err(LoadError::InvalidTypeName(type_name.to_string()));
        }
        let slot = self.slot(type_name, false);
        slot.get_or_init(|| self.load(type_name)).clone()
    }

    /// Make in-process entry points resolvable under `type_name`.
    ///
    /// Registering a name that already resolved successfully returns the
    /// existing descriptor; a cached load failure is replaced.
    pub fn register(
        &self,
        type_name: &str,
        entry_points: EntryPoints,
    ) -> std::result::Result<Arc<TypeDescriptor>, LoadError> {
        if !is_identifier(type_name) {
            return Err(LoadError::InvalidTypeName(type_name.to_string()));
        }
        loop {
            let slot = self.slot(type_name, true);
            let mut registered = false;
            let outcome = slot
                .get_or_init(|| {
                    registered = true;
                    debug!(type_name, "registering in-process data type");
                    TypeDescriptor::new(type_name, entry_points, Origin::Registered, None).map(Arc::new)
                })
                .clone();
            // A library load that was in flight failed; replace its failure.
            if registered || outcome.is_ok() {
                return outcome;
            }
        }
    }

    /// Register a type exported with [`export_data_type!`](crate::export_data_type).
    pub fn register_type<T: ExportedType>(&self) -> std::result::Result<Arc<TypeDescriptor>, LoadError> {
        self.register(T::TYPE_NAME, T::entry_points())
    }

    /// Number of library searches performed so far.
    pub fn load_attempts(&self) -> usize {
        self.load_attempts.load(Ordering::Relaxed)
    }

    /// True when `type_name` resolved successfully before.
    pub fn is_loaded(&self, type_name: &str) -> bool {
        let entries = self.entries.lock();
        entries
            .get(type_name)
            .map(|slot| matches!(slot.get(), Some(Ok(_))))
            .unwrap_or(false)
    }

    /// Load-once cell of `type_name`, optionally discarding a cached failure.
    fn slot(&self, type_name: &str, replace_failure: bool) -> Slot {
        let mut entries = self.entries.lock();
        if entries.len() >= MAX_CACHED_NAMES && !entries.contains_key(type_name) {
            entries.retain(|_, slot| !is_failure(slot));
            debug!(remaining = entries.len(), "evicted cached load failures");
        }
        let slot = entries.entry(type_name.to_string()).or_default();
        if replace_failure && is_failure(slot) {
            *slot = Slot::default();
        }
        Arc::clone(slot)
    }

    fn load(&self, type_name: &str) -> std::result::Result<Arc<TypeDescriptor>, LoadError> {
        self.load_attempts.fetch_add(1, Ordering::Relaxed);
        let loaded = loader::load_library(type_name, &self.config)?;
        let descriptor = TypeDescriptor::new(
            type_name,
            loaded.entry_points,
            Origin::Library(loaded.path.clone()),
            Some(loaded.library),
        )?;
        info!(type_name, library = %loaded.path.display(), "data library loaded");
        Ok(Arc::new(descriptor))
    }
}

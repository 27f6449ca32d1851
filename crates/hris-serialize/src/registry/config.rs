// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Library search configuration.
//!
//! # Environment Variables
//!
//! - `HRIS_LIBRARY_PATH`: directories searched first (platform path list)
//! - `LD_LIBRARY_PATH` / `DYLD_LIBRARY_PATH` / `PATH`: the platform loader
//!   path, searched next

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable listing extra library directories.
pub const LIBRARY_PATH_ENV: &str = "HRIS_LIBRARY_PATH";

/// Loader path variable of the platform.
#[cfg(target_os = "macos")]
pub const SYSTEM_PATH_ENV: &str = "DYLD_LIBRARY_PATH";
#[cfg(windows)]
pub const SYSTEM_PATH_ENV: &str = "PATH";
#[cfg(not(any(target_os = "macos", windows)))]
pub const SYSTEM_PATH_ENV: &str = "LD_LIBRARY_PATH";

/// Where type libraries are searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Directories searched in order before the system path
    pub search_path: Vec<PathBuf>,

    /// Also search [`SYSTEM_PATH_ENV`] and fall back to the platform loader's
    /// own lookup by file name
    pub use_system_path: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            search_path: env::var_os(LIBRARY_PATH_ENV)
                .map(|paths| env::split_paths(&paths).filter(|p| !p.as_os_str().is_empty()).collect())
                .unwrap_or_default(),
            use_system_path: true,
        }
    }
}

impl LoaderConfig {
    /// Empty configuration, ignoring the environment.
    pub fn new() -> Self {
        Self {
            search_path: Vec::new(),
            use_system_path: false,
        }
    }

    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_path.push(dir.into());
        self
    }

    pub fn with_system_path(mut self, enabled: bool) -> Self {
        self.use_system_path = enabled;
        self
    }

    /// Directories to search, configured ones first.
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut dirs = self.search_path.clone();
        if self.use_system_path {
            if let Some(paths) = env::var_os(SYSTEM_PATH_ENV) {
                dirs.extend(env::split_paths(&paths).filter(|p| !p.as_os_str().is_empty()));
            }
        }
        dirs
    }

    /// Existing `dir/file` paths along [`LoaderConfig::directories`], in
    /// search order.
    pub fn candidates(&self, file: &str) -> Vec<PathBuf> {
        self.directories()
            .into_iter()
            .map(|dir| dir.join(file))
            .filter(|candidate| is_file(candidate))
            .collect()
    }
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

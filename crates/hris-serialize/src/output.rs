// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Output destinations of the workflows.
//!
//! File outputs are staged in a temporary sibling and renamed into place
//! only when the workflow succeeds, so readers never see a partial stream.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

/// Where a workflow writes its stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// `-` selects standard output.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::Stdout
        } else {
            Self::File(PathBuf::from(arg))
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Stdout => None,
            Self::File(path) => Some(path),
        }
    }

    /// Run `write` against this target. File targets are committed only
    /// when `write` succeeds.
    pub fn write_with<T, F>(&self, write: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Write) -> Result<T>,
    {
        match self {
            Self::Stdout => {
                let stdout = io::stdout();
                let mut out = BufWriter::new(stdout.lock());
                let result = write(&mut out)?;
                out.flush()?;
                Ok(result)
            }
            Self::File(path) => write_atomically(path, write),
        }
    }
}

fn write_atomically<T, F>(path: &Path, write: F) -> Result<T>
where
    F: FnOnce(&mut dyn Write) -> Result<T>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(dir)?;
    let mut out = BufWriter::new(staged);
    // On error the temporary file is removed when `out` is dropped.
    let result = write(&mut out)?;
    let staged = out.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    staged
        .persist(path)
        .map_err(|e| Error::Io(e.error))?;
    debug!(path = %path.display(), "output committed");
    Ok(result)
}

/// True when both paths name the same existing file.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_commits_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.ser");
        let target = OutputTarget::File(path.clone());
        let n = target
            .write_with(|out| {
                out.write_all(b"hello")?;
                Ok(5)
            })
            .expect("write");
        assert_eq!(n, 5);
        assert_eq!(fs::read(&path).expect("read"), b"hello");
    }

    #[test]
    fn test_failure_leaves_nothing_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.ser");
        let target = OutputTarget::File(path.clone());
        let result: Result<()> = target.write_with(|out| {
            out.write_all(b"partial")?;
            Err(Error::InvalidArgument("boom".into()))
        });
        assert!(result.is_err());
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 0);
    }

    #[test]
    fn test_failure_keeps_previous_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.ser");
        fs::write(&path, b"previous").expect("seed");
        let result: Result<()> = OutputTarget::File(path.clone())
            .write_with(|_| Err(Error::InvalidArgument("boom".into())));
        assert!(result.is_err());
        assert_eq!(fs::read(&path).expect("read"), b"previous");
    }

    #[test]
    fn test_same_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.ser");
        fs::write(&a, b"x").expect("write");
        let dotted = dir.path().join(".").join("a.ser");
        assert!(same_file(&a, &dotted));
        assert!(!same_file(&a, &dir.path().join("b.ser")));
        assert_eq!(OutputTarget::from_arg("-"), OutputTarget::Stdout);
    }
}

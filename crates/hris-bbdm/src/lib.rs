// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! BBDM array block type library.
//!
//! Built as `libBBDMArrayBlockF32.so`, this crate exports the
//! `BBDMArrayBlockF32_*` entry points that the HRIS serialization tools
//! resolve at run time. Linked as an rlib, the same type can be registered
//! in-process with [`hris_serialize::Registry::register_type`].
//!
//! ```bash
//! CreateSerializedData -t BBDMArrayBlockF32 -n 3 -f Ascii -i "dims=2 extents=3,2 width=8 height=8"
//! ```
//!
//! Init options (all optional, whitespace separated):
//!
//! | Key | Meaning | Default |
//! |-----|---------|---------|
//! | `dims` | number of dimensions, 1..=4 | 1 |
//! | `extents` | comma separated blocks per dimension | `2` |
//! | `width` | block width | 4 |
//! | `height` | block height | 4 |

#![allow(non_snake_case)]

pub mod array_block;

pub use array_block::{ArrayBlockF32, BaseF32, BaseSize, Layout, DEFAULT_OWNER, MAX_DIMS};

/// Name the type is resolved by.
pub const TYPE_NAME: &str = "BBDMArrayBlockF32";

hris_serialize::export_data_type!(BBDMArrayBlockF32, ArrayBlockF32);

#[cfg(test)]
mod tests {
    use super::*;
    use hris_serialize::{ExportedType, LoaderConfig, Registry};

    #[test]
    fn test_exported_name_matches_schema() {
        assert_eq!(<ArrayBlockF32 as ExportedType>::TYPE_NAME, TYPE_NAME);
        let registry = Registry::new(LoaderConfig::new());
        let descriptor = registry.register_type::<ArrayBlockF32>().expect("register");
        assert_eq!(descriptor.name(), TYPE_NAME);
        assert!(descriptor.supports_init());
        assert!(descriptor.supports_populate());
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! C entry points of a type library.
//!
//! A library implementing type `T` exports:
//!
//! | Symbol          | Required | Signature |
//! |-----------------|----------|-----------|
//! | `T_new`         | yes      | [`NewFn`] |
//! | `T_delete`      | yes      | [`DeleteFn`] |
//! | `T_serialize`   | yes      | [`SerializeFn`] |
//! | `T_deserialize` | yes      | [`DeserializeFn`] |
//! | `T_schema`      | yes      | [`SchemaFn`] |
//! | `T_init`        | no       | [`InitFn`] |
//! | `T_populate`    | no       | [`PopulateFn`] |
//!
//! Objects cross the boundary in the canonical (little-endian) binary
//! payload layout; the schema crosses it as JSON text.
//!
//! # Safety
//!
//! Object pointers handed to an entry point must come from the same
//! library's `T_new` and must not be used after `T_delete`.

use std::os::raw::{c_char, c_void};
use std::slice;

/// Status returned by type library entry points.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HrisStatus {
    HrisOk = 0,
    /// Null pointer or unusable argument
    HrisInvalidArgument = 1,
    /// Payload bytes do not describe a valid object
    HrisInvalidData = 2,
    /// The library does not implement the call
    HrisUnsupported = 3,
    HrisError = 4,
}

impl HrisStatus {
    pub fn is_ok(self) -> bool {
        self == Self::HrisOk
    }
}

/// Byte sink filled by `T_serialize`.
#[repr(C)]
pub struct ByteSink {
    pub context: *mut c_void,
    pub write: unsafe extern "C" fn(context: *mut c_void, data: *const u8, len: usize),
}

impl ByteSink {
    /// Sink appending to `buf`. The sink must not outlive `buf`.
    pub(crate) fn for_vec(buf: &mut Vec<u8>) -> Self {
        Self {
            context: (buf as *mut Vec<u8>).cast(),
            write: append_to_vec,
        }
    }

    /// # Safety
    /// `self.context` must still be valid for `self.write`.
    pub unsafe fn write_bytes(&mut self, bytes: &[u8]) {
        (self.write)(self.context, bytes.as_ptr(), bytes.len());
    }
}

unsafe extern "C" fn append_to_vec(context: *mut c_void, data: *const u8, len: usize) {
    if context.is_null() || data.is_null() || len == 0 {
        return;
    }
    let buf = &mut *context.cast::<Vec<u8>>();
    buf.extend_from_slice(slice::from_raw_parts(data, len));
}

/// Content request passed to `T_populate`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulateParams {
    /// Position of the record in the stream being created
    pub index: u64,
    pub seed: u64,
    /// Random values in `[value_min, value_max]` instead of a ramp
    pub randomize: bool,
    pub value_min: f64,
    pub value_max: f64,
}

impl Default for PopulateParams {
    fn default() -> Self {
        Self {
            index: 0,
            seed: 0,
            randomize: false,
            value_min: 0.0,
            value_max: 1.0,
        }
    }
}

pub type NewFn = unsafe extern "C" fn() -> *mut c_void;
pub type DeleteFn = unsafe extern "C" fn(object: *mut c_void);
pub type SerializeFn = unsafe extern "C" fn(object: *const c_void, sink: *mut ByteSink) -> HrisStatus;
pub type DeserializeFn =
    unsafe extern "C" fn(object: *mut c_void, data: *const u8, len: usize) -> HrisStatus;
/// Returns a NUL-terminated JSON schema owned by the library.
pub type SchemaFn = unsafe extern "C" fn() -> *const c_char;
pub type InitFn = unsafe extern "C" fn(object: *mut c_void, init: *const c_char) -> HrisStatus;
pub type PopulateFn =
    unsafe extern "C" fn(object: *mut c_void, params: *const PopulateParams) -> HrisStatus;

/// Bound entry points of one type.
#[derive(Debug, Clone, Copy)]
pub struct EntryPoints {
    pub new: NewFn,
    pub delete: DeleteFn,
    pub serialize: SerializeFn,
    pub deserialize: DeserializeFn,
    pub schema: SchemaFn,
    pub init: Option<InitFn>,
    pub populate: Option<PopulateFn>,
}

/// Symbol name of entry point `call` of `type_name`.
pub fn symbol_name(type_name: &str, call: &str) -> String {
    format!("{type_name}_{call}")
}

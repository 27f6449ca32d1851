// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Authoring surface for type libraries.
//!
//! A type library implements [`DataType`] for its Rust type and invokes
//! [`export_data_type!`](crate::export_data_type) once:
//!
//! ```ignore
//! #[derive(Default)]
//! struct Counter { value: i32 }
//!
//! impl hris_serialize::DataType for Counter {
//!     fn schema() -> Schema { SchemaBuilder::new("Counter").field("value", PrimitiveKind::I32).build() }
//!     fn to_value(&self) -> Value { Value::structure([("value", Value::I32(self.value))]) }
//!     fn from_value(value: &Value) -> Result<Self, ParseError> { ... }
//! }
//!
//! hris_serialize::export_data_type!(Counter, Counter);
//! ```
//!
//! Built as a `cdylib` named `libCounter.so`, the library is found by
//! [`Registry::resolve`](crate::Registry::resolve). Linked in-process, the
//! same type is registered with
//! [`Registry::register_type`](crate::Registry::register_type).

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::OnceLock;

use tracing::warn;

use crate::abi::{ByteSink, EntryPoints, HrisStatus, PopulateParams};
use crate::error::ParseError;
use crate::format::binary;
use crate::schema::Schema;
use crate::value::Value;

/// A Rust type served through the type library entry points.
pub trait DataType: Default + 'static {
    /// Whether [`DataType::init`] accepts init strings.
    const SUPPORTS_INIT: bool = false;
    /// Whether [`DataType::populate`] generates content.
    const SUPPORTS_POPULATE: bool = false;

    fn schema() -> Schema;

    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Result<Self, ParseError>;

    /// Apply an init string such as `width=4 height=4`.
    fn init(&mut self, init: &str) -> Result<(), ParseError> {
        let _ = init;
        Ok(())
    }

    /// Fill the object with generated content.
    fn populate(&mut self, params: &PopulateParams) {
        let _ = params;
    }
}

/// Implemented by [`export_data_type!`](crate::export_data_type).
pub trait ExportedType: DataType {
    /// Name under which the type is resolved.
    const TYPE_NAME: &'static str;

    fn entry_points() -> EntryPoints;
}

// ---------------------------------------------------------------------------
// Glue called by the generated entry points
// ---------------------------------------------------------------------------

#[doc(hidden)]
pub fn new_object<T: DataType>() -> *mut c_void {
    match catch_unwind(T::default) {
        Ok(object) => Box::into_raw(Box::new(object)).cast(),
        Err(_) => ptr::null_mut(),
    }
}

/// # Safety
/// `object` must come from [`new_object::<T>`] and not be deleted yet.
#[doc(hidden)]
pub unsafe fn delete_object<T: DataType>(object: *mut c_void) {
    if !object.is_null() {
        drop(Box::from_raw(object.cast::<T>()));
    }
}

/// # Safety
/// `object` must come from [`new_object::<T>`]; `sink` must be valid.
#[doc(hidden)]
pub unsafe fn serialize_object<T: DataType>(
    schema: &OnceLock<Schema>,
    object: *const c_void,
    sink: *mut ByteSink,
) -> HrisStatus {
    if object.is_null() || sink.is_null() {
        return HrisStatus::HrisInvalidArgument;
    }
    let object = &*object.cast::<T>();
    let schema = schema.get_or_init(T::schema);
    let encoded = catch_unwind(AssertUnwindSafe(|| {
        binary::encode_canonical(schema, &object.to_value())
    }));
    match encoded {
        Ok(Ok(bytes)) => {
            (*sink).write_bytes(&bytes);
            HrisStatus::HrisOk
        }
        Ok(Err(e)) => {
            warn!(type_name = %schema.name, "serialize failed: {}", e);
            HrisStatus::HrisInvalidData
        }
        Err(_) => HrisStatus::HrisError,
    }
}

/// # Safety
/// `object` must come from [`new_object::<T>`]; `data` must point to `len`
/// readable bytes.
#[doc(hidden)]
pub unsafe fn deserialize_object<T: DataType>(
    schema: &OnceLock<Schema>,
    object: *mut c_void,
    data: *const u8,
    len: usize,
) -> HrisStatus {
    if object.is_null() || (data.is_null() && len > 0) {
        return HrisStatus::HrisInvalidArgument;
    }
    let bytes = if len == 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(data, len)
    };
    let schema = schema.get_or_init(T::schema);
    let decoded = catch_unwind(AssertUnwindSafe(|| {
        binary::decode_canonical(schema, bytes).and_then(|value| T::from_value(&value))
    }));
    match decoded {
        Ok(Ok(value)) => {
            *object.cast::<T>() = value;
            HrisStatus::HrisOk
        }
        Ok(Err(e)) => {
            warn!(type_name = %schema.name, "deserialize rejected the payload: {}", e);
            HrisStatus::HrisInvalidData
        }
        Err(_) => HrisStatus::HrisError,
    }
}

/// Schema as NUL-terminated JSON, rendered once.
#[doc(hidden)]
pub fn schema_json<T: DataType>(cache: &OnceLock<Option<CString>>) -> *const c_char {
    let text = cache.get_or_init(|| {
        let json = T::schema().to_json().ok()?;
        CString::new(json).ok()
    });
    match text {
        Some(text) => text.as_ptr(),
        None => ptr::null(),
    }
}

/// # Safety
/// `object` must come from [`new_object::<T>`]; `init` must be null or a
/// NUL-terminated string.
#[doc(hidden)]
pub unsafe fn init_object<T: DataType>(object: *mut c_void, init: *const c_char) -> HrisStatus {
    if !T::SUPPORTS_INIT {
        return HrisStatus::HrisUnsupported;
    }
    if object.is_null() {
        return HrisStatus::HrisInvalidArgument;
    }
    let init = if init.is_null() {
        ""
    } else {
        match CStr::from_ptr(init).to_str() {
            Ok(text) => text,
            Err(_) => return HrisStatus::HrisInvalidArgument,
        }
    };
    let object = &mut *object.cast::<T>();
    match catch_unwind(AssertUnwindSafe(|| object.init(init))) {
        Ok(Ok(())) => HrisStatus::HrisOk,
        Ok(Err(e)) => {
            warn!("init string '{}' rejected: {}", init, e);
            HrisStatus::HrisInvalidArgument
        }
        Err(_) => HrisStatus::HrisError,
    }
}

/// # Safety
/// `object` must come from [`new_object::<T>`]; `params` must be valid.
#[doc(hidden)]
pub unsafe fn populate_object<T: DataType>(
    object: *mut c_void,
    params: *const PopulateParams,
) -> HrisStatus {
    if !T::SUPPORTS_POPULATE {
        return HrisStatus::HrisUnsupported;
    }
    if object.is_null() || params.is_null() {
        return HrisStatus::HrisInvalidArgument;
    }
    let object = &mut *object.cast::<T>();
    let params = &*params;
    match catch_unwind(AssertUnwindSafe(|| object.populate(params))) {
        Ok(()) => HrisStatus::HrisOk,
        Err(_) => HrisStatus::HrisError,
    }
}

/// Export the C entry points of a [`DataType`] under `$name`.
///
/// Generates `$name_new`, `$name_delete`, `$name_serialize`,
/// `$name_deserialize`, `$name_schema`, `$name_init` and `$name_populate`,
/// and implements [`ExportedType`] for `$ty`.
#[macro_export]
macro_rules! export_data_type {
    ($name:ident, $ty:ty) => {
        $crate::__paste::paste! {
            /// # Safety
            /// Called through the type library ABI only.
            #[no_mangle]
            #[allow(non_snake_case)]
            pub unsafe extern "C" fn [<$name _new>]() -> *mut ::std::os::raw::c_void {
                $crate::export::new_object::<$ty>()
            }

            /// # Safety
            /// `object` must come from the matching `_new`.
            #[no_mangle]
            #[allow(non_snake_case)]
            pub unsafe extern "C" fn [<$name _delete>](object: *mut ::std::os::raw::c_void) {
                $crate::export::delete_object::<$ty>(object)
            }

            /// # Safety
            /// `object` must come from the matching `_new`; `sink` must be valid.
            #[no_mangle]
            #[allow(non_snake_case)]
            pub unsafe extern "C" fn [<$name _serialize>](
                object: *const ::std::os::raw::c_void,
                sink: *mut $crate::abi::ByteSink,
            ) -> $crate::abi::HrisStatus {
                static SCHEMA: ::std::sync::OnceLock<$crate::Schema> = ::std::sync::OnceLock::new();
                $crate::export::serialize_object::<$ty>(&SCHEMA, object, sink)
            }

            /// # Safety
            /// `object` must come from the matching `_new`; `data` must point
            /// to `len` bytes.
            #[no_mangle]
            #[allow(non_snake_case)]
            pub unsafe extern "C" fn [<$name _deserialize>](
                object: *mut ::std::os::raw::c_void,
                data: *const u8,
                len: usize,
            ) -> $crate::abi::HrisStatus {
                static SCHEMA: ::std::sync::OnceLock<$crate::Schema> = ::std::sync::OnceLock::new();
                $crate::export::deserialize_object::<$ty>(&SCHEMA, object, data, len)
            }

            /// # Safety
            /// The returned string is owned by the library.
            #[no_mangle]
            #[allow(non_snake_case)]
            pub unsafe extern "C" fn [<$name _schema>]() -> *const ::std::os::raw::c_char {
                static JSON: ::std::sync::OnceLock<::std::option::Option<::std::ffi::CString>> =
                    ::std::sync::OnceLock::new();
                $crate::export::schema_json::<$ty>(&JSON)
            }

            /// # Safety
            /// `object` must come from the matching `_new`; `init` must be
            /// null or NUL-terminated.
            #[no_mangle]
            #[allow(non_snake_case)]
            pub unsafe extern "C" fn [<$name _init>](
                object: *mut ::std::os::raw::c_void,
                init: *const ::std::os::raw::c_char,
            ) -> $crate::abi::HrisStatus {
                $crate::export::init_object::<$ty>(object, init)
            }

            /// # Safety
            /// `object` must come from the matching `_new`; `params` must be valid.
            #[no_mangle]
            #[allow(non_snake_case)]
            pub unsafe extern "C" fn [<$name _populate>](
                object: *mut ::std::os::raw::c_void,
                params: *const $crate::abi::PopulateParams,
            ) -> $crate::abi::HrisStatus {
                $crate::export::populate_object::<$ty>(object, params)
            }

            impl $crate::export::ExportedType for $ty {
                const TYPE_NAME: &'static str = ::std::stringify!($name);

                fn entry_points() -> $crate::abi::EntryPoints {
                    $crate::abi::EntryPoints {
                        new: [<$name _new>],
                        delete: [<$name _delete>],
                        serialize: [<$name _serialize>],
                        deserialize: [<$name _deserialize>],
                        schema: [<$name _schema>],
                        init: Some([<$name _init>]),
                        populate: Some([<$name _populate>]),
                    }
                }
            }
        }
    };
}

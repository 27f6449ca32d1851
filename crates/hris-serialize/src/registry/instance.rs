// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scoped ownership of objects living inside a type library.

use std::ffi::{c_void, CString};
use std::ptr::NonNull;
use std::sync::Arc;

use crate::abi::{ByteSink, HrisStatus, PopulateParams};
use crate::error::{Error, ParseError, Result};
use crate::format::binary;
use crate::registry::TypeDescriptor;
use crate::schema::Schema;
use crate::value::Value;

/// One object created by a type library's `T_new`.
///
/// Dropping the instance calls `T_delete`.
#[derive(Debug)]
pub struct Instance {
    descriptor: Arc<TypeDescriptor>,
    object: NonNull<c_void>,
}

impl Instance {
    pub(crate) fn new(descriptor: Arc<TypeDescriptor>) -> Result<Self> {
        // SAFETY: entry points were bound against the type library ABI.
        let raw = unsafe { (descriptor.entry_points().new)() };
        match NonNull::new(raw) {
            Some(object) => Ok(Self { descriptor, object }),
            None => Err(Error::Library {
                type_name: descriptor.name().to_string(),
                call: "new",
                status: HrisStatus::HrisError,
            }),
        }
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn type_name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn schema(&self) -> &Schema {
        self.descriptor.schema()
    }

    /// Canonical binary form of the object.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let mut sink = ByteSink::for_vec(&mut bytes);
        // SAFETY: `object` came from this library's `T_new`; `sink` outlives the call.
        let status = unsafe { (self.descriptor.entry_points().serialize)(self.object.as_ptr(), &mut sink) };
        self.check("serialize", status)?;
        Ok(bytes)
    }

    /// Replace the object's content from its canonical binary form.
    pub fn deserialize(&mut self, bytes: &[u8]) -> Result<()> {
        // SAFETY: as in `serialize`; `bytes` is valid for its length.
        let status = unsafe {
            (self.descriptor.entry_points().deserialize)(self.object.as_ptr(), bytes.as_ptr(), bytes.len())
        };
        self.check("deserialize", status)
    }

    /// Object content as a value tree.
    pub fn to_value(&self) -> Result<Value> {
        let bytes = self.serialize()?;
        Ok(binary::decode_canonical(self.schema(), &bytes)?)
    }

    /// Replace the object's content from a value tree.
    pub fn load_value(&mut self, value: &Value) -> Result<()> {
        value.conforms_to(self.schema())?;
        let bytes = binary::encode_canonical(self.schema(), value)?;
        self.deserialize(&bytes)
    }

    /// Apply an init string. Returns `false` when the type has no init support.
    pub fn init(&mut self, init: &str) -> Result<bool> {
        let Some(init_fn) = self.descriptor.entry_points().init else {
            return Ok(false);
        };
        let text = CString::new(init)
            .map_err(|_| Error::InvalidArgument("init string contains a NUL byte".to_string()))?;
        // SAFETY: `object` came from `T_new`; `text` is NUL-terminated.
        let status = unsafe { init_fn(self.object.as_ptr(), text.as_ptr()) };
        match status {
            HrisStatus::HrisUnsupported => Ok(false),
            HrisStatus::HrisInvalidArgument => Err(Error::InvalidArgument(format!(
                "{} rejected init string '{}'",
                self.type_name(),
                init
            ))),
            other => self.check("init", other).map(|()| true),
        }
    }

    /// Fill the object with generated content. Returns `false` when the
    /// type cannot generate content.
    pub fn populate(&mut self, params: &PopulateParams) -> Result<bool> {
        let Some(populate_fn) = self.descriptor.entry_points().populate else {
            return Ok(false);
        };
        // SAFETY: `object` came from `T_new`; `params` is a valid reference.
        let status = unsafe { populate_fn(self.object.as_ptr(), params) };
        match status {
            HrisStatus::HrisUnsupported => Ok(false),
            other => self.check("populate", other).map(|()| true),
        }
    }

    fn check(&self, call: &'static str, status: HrisStatus) -> Result<()> {
        match status {
            HrisStatus::HrisOk => Ok(()),
            HrisStatus::HrisInvalidData => Err(ParseError::invalid(
                self.type_name(),
                format!("rejected by {}_{}()", self.type_name(), call),
            )
            .into()),
            status => Err(Error::Library {
                type_name: self.type_name().to_string(),
                call,
                status,
            }),
        }
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        // SAFETY: `object` came from `T_new` and is released exactly once.
        unsafe { (self.descriptor.entry_points().delete)(self.object.as_ptr()) }
    }
}

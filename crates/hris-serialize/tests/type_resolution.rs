// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Type resolution through the public API: missing libraries, cached
// failures, concurrent first use and in-process registration.

#![allow(clippy::missing_panics_doc)]

use std::sync::{Arc, Barrier};
use std::thread;

use hris_serialize::{
    library_file_name, DataType, Format, LoadError, LoaderConfig, ParseError, PrimitiveKind,
    Registry, Schema, SchemaBuilder, StreamReader, Value,
};

#[derive(Debug, Default)]
struct Flag {
    on: bool,
}

impl DataType for Flag {
    fn schema() -> Schema {
        SchemaBuilder::new("Flag").field("on", PrimitiveKind::Bool).build()
    }

    fn to_value(&self) -> Value {
        Value::structure([("on", Value::Bool(self.on))])
    }

    fn from_value(value: &Value) -> Result<Self, ParseError> {
        let on = value
            .field("on")
            .and_then(Value::as_bool)
            .ok_or_else(|| ParseError::InvalidData {
                path: "on".into(),
                reason: "missing".into(),
            })?;
        Ok(Self { on })
    }
}

hris_serialize::export_data_type!(Flag, Flag);

fn isolated_registry() -> Registry {
    let dir = std::env::temp_dir().join("hris-serialize-no-libraries");
    Registry::new(LoaderConfig::new().with_search_dir(dir))
}

#[test]
fn test_missing_library_names_the_file() {
    let registry = isolated_registry();
    let err = registry.resolve("BBDMNotInstalled").expect_err("missing");
    let file = library_file_name("BBDMNotInstalled");
    assert!(matches!(err, LoadError::LibraryNotFound { .. }));
    assert!(
        err.to_string()
            .starts_with(&format!("Could not load data library 'BBDMNotInstalled' ({file}): Reason '")),
        "{err}"
    );
}

#[test]
fn test_concurrent_first_use_makes_one_attempt() {
    let registry = Arc::new(isolated_registry());
    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.resolve("ContendedType").expect_err("missing")
            })
        })
        .collect();
    let errors: Vec<LoadError> = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect();
    assert!(errors.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(registry.load_attempts(), 1);
}

#[test]
fn test_global_registry_serves_registered_types() {
    let registry = Registry::global();
    registry.register_type::<Flag>().expect("register");
    let again = registry.register_type::<Flag>().expect("idempotent");
    assert!(Arc::ptr_eq(&again, &registry.resolve("Flag").expect("resolve")));

    let mut out = Vec::new();
    let options = hris_serialize::CreateOptions::new("Flag", 2, Format::Ascii);
    hris_serialize::create(registry, &options, &mut out).expect("create");
    let records: Vec<_> = StreamReader::new(out.as_slice())
        .collect::<Result<_, _>>()
        .expect("records");
    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].decode(&Flag::schema()).expect("decode"),
        Value::structure([("on", Value::Bool(false))])
    );
}

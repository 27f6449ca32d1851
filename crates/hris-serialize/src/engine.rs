// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Create, Convert and Print workflows.
//!
//! All three share one flow: resolve the record's type, move the record's
//! content through an [`Instance`](crate::Instance) of it, and write the
//! result with the target codec. Failures carry the record index and the
//! byte offset where the record started.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::abi::PopulateParams;
use crate::error::{Error, LoadError, ParseError, Result};
use crate::format::{AsciiCodec, Codec, Format};
use crate::header::DEFAULT_DATA_NAME;
use crate::output::{same_file, OutputTarget};
use crate::registry::{Registry, TypeDescriptor};
use crate::stream::{RawRecord, StreamReader, StreamWriter};

/// Largest number of records one create run may produce.
pub const MAX_COUNT: usize = 1_000_000;

/// Outcome of a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Type of the first record, if any
    pub type_name: Option<String>,
    pub records: usize,
    pub bytes: u64,
}

/// Settings of [`create`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOptions {
    pub type_name: String,
    /// Number of records, `1..=MAX_COUNT`
    pub count: usize,
    pub format: Format,
    /// Codec options; `None` selects the format's default
    pub format_options: Option<String>,
    pub data_name: String,
    /// Init string applied to every object, e.g. `width=4 height=4`
    pub init: Option<String>,
    pub randomize: bool,
    pub value_min: f64,
    pub value_max: f64,
    pub seed: u64,
}

impl CreateOptions {
    pub fn new(type_name: impl Into<String>, count: usize, format: Format) -> Self {
        Self {
            type_name: type_name.into(),
            count,
            format,
            format_options: None,
            data_name: DEFAULT_DATA_NAME.to_string(),
            init: None,
            randomize: false,
            value_min: 0.0,
            value_max: 1.0,
            seed: 0,
        }
    }

    pub fn with_init(mut self, init: impl Into<String>) -> Self {
        self.init = Some(init.into());
        self
    }

    pub fn with_random_values(mut self, seed: u64, min: f64, max: f64) -> Self {
        self.randomize = true;
        self.seed = seed;
        self.value_min = min;
        self.value_max = max;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.count == 0 || self.count > MAX_COUNT {
            return Err(Error::InvalidArgument(format!(
                "count must be between 1 and {MAX_COUNT}, got {}",
                self.count
            )));
        }
        if self.value_min.is_nan() || self.value_max.is_nan() || self.value_min > self.value_max {
            return Err(Error::InvalidArgument(format!(
                "value range [{}, {}] is empty",
                self.value_min, self.value_max
            )));
        }
        Ok(())
    }
}

/// Settings of [`convert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    pub format: Format,
    /// Codec options; `None` selects the format's default
    pub format_options: Option<String>,
    /// Stop after this many records
    pub max_elements: Option<usize>,
}

impl ConvertOptions {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            format_options: None,
            max_elements: None,
        }
    }
}

/// Settings of [`print`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrintOptions {
    /// Stop after this many records
    pub max_elements: Option<usize>,
    /// Tag every Ascii line with its type
    pub with_type: bool,
}

fn codec_for(format: Format, options: Option<&str>) -> Result<Box<dyn Codec>> {
    Ok(format.codec(options.unwrap_or(format.default_options()))?)
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Write `count` freshly generated objects of one type.
///
/// Record `i` is populated with index `i` and seed `seed + i`, so every
/// record differs from its neighbours.
pub fn create<W: Write + ?Sized>(registry: &Registry, options: &CreateOptions, out: &mut W) -> Result<Summary> {
    options.validate()?;
    let descriptor = registry.resolve(&options.type_name)?;
    let codec = codec_for(options.format, options.format_options.as_deref())?;
    let init = options.init.as_deref().filter(|init| !init.trim().is_empty());
    if init.is_some() && !descriptor.supports_init() {
        return Err(missing_init(&descriptor).into());
    }

    let mut writer = StreamWriter::new(out);
    let mut warned = false;
    for index in 0..options.count {
        let offset = writer.bytes_written();
        let params = PopulateParams {
            index: index as u64,
            seed: options.seed.wrapping_add(index as u64),
            randomize: options.randomize,
            value_min: options.value_min,
            value_max: options.value_max,
        };
        let populated = create_record(&descriptor, init, &params, &mut writer, &options.data_name, codec.as_ref())
            .map_err(|e| e.in_record(index, offset))?;
        if !populated && !warned {
            warn!(type_name = %descriptor.name(), "type cannot generate content, writing default objects");
            warned = true;
        }
    }
    writer.flush()?;

    info!(
        type_name = %descriptor.name(),
        records = writer.records(),
        bytes = writer.bytes_written(),
        format = %options.format,
        "serialized data created"
    );
    Ok(Summary {
        type_name: Some(descriptor.name().to_string()),
        records: writer.records(),
        bytes: writer.bytes_written(),
    })
}

/// Build, fill and write one object. Returns whether content was generated.
fn create_record<W: Write>(
    descriptor: &Arc<TypeDescriptor>,
    init: Option<&str>,
    params: &PopulateParams,
    writer: &mut StreamWriter<W>,
    data_name: &str,
    codec: &dyn Codec,
) -> Result<bool> {
    let mut instance = descriptor.construct()?;
    if let Some(init) = init {
        if !instance.init(init)? {
            return Err(missing_init(descriptor).into());
        }
    }
    let populated = instance.populate(params)?;
    writer.write_instance(&instance, data_name, codec)?;
    Ok(populated)
}

fn missing_init(descriptor: &TypeDescriptor) -> LoadError {
    LoadError::MissingEntryPoint {
        type_name: descriptor.name().to_string(),
        library: descriptor.origin().to_string(),
        symbol: format!("{}_init", descriptor.name()),
    }
}

// ---------------------------------------------------------------------------
// Convert / Print
// ---------------------------------------------------------------------------

/// Re-encode every record of `input` with another codec.
pub fn convert<R: BufRead, W: Write + ?Sized>(
    registry: &Registry,
    options: &ConvertOptions,
    input: R,
    out: &mut W,
) -> Result<Summary> {
    let codec = codec_for(options.format, options.format_options.as_deref())?;
    transcode(registry, options.max_elements, input, out, codec.as_ref())
}

/// Render every record of `input` as Ascii, headers included.
///
/// The output depends on the input bytes only.
pub fn print<R: BufRead, W: Write + ?Sized>(
    registry: &Registry,
    options: &PrintOptions,
    input: R,
    out: &mut W,
) -> Result<Summary> {
    let codec = AsciiCodec::new(options.with_type);
    transcode(registry, options.max_elements, input, out, &codec)
}

fn transcode<R: BufRead, W: Write + ?Sized>(
    registry: &Registry,
    max_elements: Option<usize>,
    input: R,
    out: &mut W,
    codec: &dyn Codec,
) -> Result<Summary> {
    let mut reader = StreamReader::new(input);
    if let Some(max) = max_elements {
        reader = reader.with_max_records(max);
    }
    let mut writer = StreamWriter::new(out);
    let mut type_name = None;

    while let Some(record) = reader.next_raw()? {
        let index = reader.records_read() - 1;
        transcode_record(registry, &record, &mut writer, codec)
            .map_err(|e| e.in_record(index, record.offset))?;
        type_name.get_or_insert_with(|| record.header.type_name.clone());
    }
    writer.flush()?;
    info!("Aborting serialization function");
    debug!(records = writer.records(), bytes = writer.bytes_written(), "stream transcoded");

    Ok(Summary {
        type_name,
        records: writer.records(),
        bytes: writer.bytes_written(),
    })
}

fn transcode_record<W: Write>(
    registry: &Registry,
    record: &RawRecord,
    writer: &mut StreamWriter<W>,
    codec: &dyn Codec,
) -> Result<()> {
    let descriptor = registry.resolve(&record.header.type_name)?;
    let value = record.decode(descriptor.schema())?;
    let mut instance = descriptor.construct()?;
    instance.load_value(&value)?;
    writer.write_instance(&instance, &record.header.data_name, codec)
}

// ---------------------------------------------------------------------------
// File workflows
// ---------------------------------------------------------------------------

/// [`create`] into a file or standard output.
pub fn create_to(registry: &Registry, options: &CreateOptions, target: &OutputTarget) -> Result<Summary> {
    target.write_with(|out| create(registry, options, out))
}

/// [`convert`] a file into a file or standard output.
pub fn convert_file(
    registry: &Registry,
    options: &ConvertOptions,
    input: &Path,
    target: &OutputTarget,
) -> Result<Summary> {
    if let Some(output) = target.path() {
        if same_file(input, output) {
            return Err(Error::SameFile);
        }
    }
    let file = open_input(input)?;
    target
        .write_with(|out| require_records(convert(registry, options, file, out)?, options.max_elements))
        .map_err(|e| classify_input(input, e))
}

/// [`print`] a file into `out`.
pub fn print_file<W: Write + ?Sized>(
    registry: &Registry,
    options: &PrintOptions,
    input: &Path,
    out: &mut W,
) -> Result<Summary> {
    let file = open_input(input)?;
    print(registry, options, file, out)
        .and_then(|summary| require_records(summary, options.max_elements))
        .map_err(|e| classify_input(input, e))
}

fn open_input(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| Error::InputUnreadable {
            path: path.to_path_buf(),
            source,
        })
}

/// A limit of zero asks for no records, so an empty result is not an error.
fn require_records(summary: Summary, max_elements: Option<usize>) -> Result<Summary> {
    if summary.records == 0 && max_elements != Some(0) {
        return Err(ParseError::MalformedHeader("stream contains no records".to_string()).into());
    }
    Ok(summary)
}

/// Parse failures of an input file become "does not contain valid data".
fn classify_input(path: &Path, err: Error) -> Error {
    if err.as_parse_error().is_some() {
        Error::InvalidInput {
            path: path.to_path_buf(),
            source: Box::new(err),
        }
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::export::DataType;
    use crate::registry::LoaderConfig;
    use crate::schema::{PrimitiveKind, Schema, SchemaBuilder};
    use crate::stream::StreamReader;
    use crate::value::Value;
    use std::fs;
    use std::io::Cursor;

    /// `samples` always holds `width` entries.
    #[derive(Debug, Default)]
    struct Trace {
        index: u32,
        width: u32,
        samples: Vec<f64>,
    }

    impl DataType for Trace {
        const SUPPORTS_INIT: bool = true;
        const SUPPORTS_POPULATE: bool = true;

        fn schema() -> Schema {
            SchemaBuilder::new("Trace")
                .field("index", PrimitiveKind::U32)
                .field("width", PrimitiveKind::U32)
                .sequence_field("samples", PrimitiveKind::F64)
                .build()
        }

        fn to_value(&self) -> Value {
            Value::structure([
                ("index", Value::U32(self.index)),
                ("width", Value::U32(self.width)),
                (
                    "samples",
                    Value::Sequence(self.samples.iter().copied().map(Value::F64).collect()),
                ),
            ])
        }

        fn from_value(value: &Value) -> std::result::Result<Self, ParseError> {
            let field = |name: &str| {
                value
                    .field(name)
                    .and_then(Value::as_u32)
                    .ok_or_else(|| ParseError::invalid(name, "missing"))
            };
            let samples: Vec<f64> = value
                .field("samples")
                .and_then(Value::elements)
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_f64)
                .collect();
            let width = field("width")?;
            if samples.len() != width as usize {
                return Err(ParseError::invalid("samples", "length differs from width"));
            }
            Ok(Self {
                index: field("index")?,
                width,
                samples,
            })
        }

        fn init(&mut self, init: &str) -> std::result::Result<(), ParseError> {
            for pair in init.split_whitespace() {
                match pair.split_once('=') {
                    Some(("width", w)) => {
                        self.width = w.parse().map_err(|_| ParseError::invalid("width", "not a number"))?
                    }
                    _ => return Err(ParseError::invalid("init", format!("unknown option '{pair}'"))),
                }
            }
            Ok(())
        }

        fn populate(&mut self, params: &PopulateParams) {
            self.index = params.index as u32;
            self.samples = (0..self.width)
                .map(|i| params.seed as f64 + f64::from(i) / 10.0)
                .collect();
        }
    }

    crate::export_data_type!(Trace, Trace);

    fn registry() -> Registry {
        let registry = Registry::new(LoaderConfig::new());
        registry.register_type::<Trace>().expect("register");
        registry
    }

    fn created(registry: &Registry, count: usize, format: Format) -> Vec<u8> {
        let options = CreateOptions::new("Trace", count, format).with_init("width=3");
        let mut out = Vec::new();
        let summary = create(registry, &options, &mut out).expect("create");
        assert_eq!(summary.records, count);
        assert_eq!(summary.bytes, out.len() as u64);
        out
    }

    fn values(registry: &Registry, bytes: &[u8]) -> Vec<Value> {
        let schema = registry.resolve("Trace").expect("resolve").schema().clone();
        StreamReader::new(Cursor::new(bytes))
            .map(|record| record.expect("record").decode(&schema).expect("decode"))
            .collect()
    }

    #[test]
    fn test_create_writes_count_distinct_records() {
        let registry = registry();
        for format in Format::ALL {
            let records = values(&registry, &created(&registry, 4, format));
            assert_eq!(records.len(), 4, "{format}");
            for (i, record) in records.iter().enumerate() {
                assert_eq!(record.field("index"), Some(&Value::U32(i as u32)));
                assert_eq!(record.field("samples").and_then(Value::elements).map(<[_]>::len), Some(3));
            }
            assert_ne!(records[0], records[1]);
        }
    }

    #[test]
    fn test_convert_preserves_records_across_formats() {
        let registry = registry();
        let json = created(&registry, 5, Format::Json);

        let mut binary = Vec::new();
        let summary = convert(&registry, &ConvertOptions::new(Format::Binary), Cursor::new(&json), &mut binary)
            .expect("to binary");
        assert_eq!(summary.records, 5);
        assert_eq!(summary.type_name.as_deref(), Some("Trace"));

        let mut back = Vec::new();
        convert(&registry, &ConvertOptions::new(Format::Json), Cursor::new(&binary), &mut back)
            .expect("to json");
        assert_eq!(back, json);
        assert_eq!(values(&registry, &binary), values(&registry, &json));
    }

    #[test]
    fn test_convert_honours_max_elements_and_options() {
        let registry = registry();
        let ascii = created(&registry, 5, Format::Ascii);
        let options = ConvertOptions {
            format: Format::Binary,
            format_options: Some("BIG_ENDIAN".into()),
            max_elements: Some(2),
        };
        let mut out = Vec::new();
        assert_eq!(
            convert(&registry, &options, Cursor::new(&ascii), &mut out)
                .expect("convert")
                .records,
            2
        );
        let first = StreamReader::new(Cursor::new(&out))
            .next_raw()
            .expect("read")
            .expect("record");
        assert_eq!(first.header.options, "BIG_ENDIAN");
    }

    #[test]
    fn test_print_is_deterministic() {
        let registry = registry();
        let binary = created(&registry, 3, Format::Binary);
        let render = || {
            let mut out = Vec::new();
            print(&registry, &PrintOptions::default(), Cursor::new(&binary), &mut out).expect("print");
            String::from_utf8(out).expect("utf8")
        };
        let first = render();
        assert_eq!(first, render());
        assert_eq!(first.matches("format = Ascii").count(), 3);
        assert!(first.contains("  width = 3;"), "{first}");
    }

    #[test]
    fn test_unknown_type_is_a_load_error() {
        let registry = registry();
        let mut out = Vec::new();
        let err = create(&registry, &CreateOptions::new("Missing", 1, Format::Json), &mut out)
            .expect_err("missing library");
        assert!(matches!(err.as_load_error(), Some(LoadError::LibraryNotFound { .. })));
        assert!(out.is_empty());
    }

    #[test]
    fn test_create_rejects_bad_arguments() {
        let registry = registry();
        let mut out = Vec::new();
        for count in [0, MAX_COUNT + 1] {
            let err = create(&registry, &CreateOptions::new("Trace", count, Format::Json), &mut out)
                .expect_err("count");
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
        let options = CreateOptions::new("Trace", 1, Format::Json).with_random_values(1, 2.0, 1.0);
        assert!(create(&registry, &options, &mut out).is_err());
        let options = CreateOptions::new("Trace", 1, Format::Json).with_init("height=2");
        assert!(create(&registry, &options, &mut out).is_err());
    }

    #[test]
    fn test_invalid_record_reports_position() {
        let registry = registry();
        let mut json = created(&registry, 2, Format::Json);
        let text = String::from_utf8(json.clone()).expect("utf8");
        // Second record claims a width its samples do not have.
        let second = text.rfind("\"width\": 3").expect("width");
        json.splice(second..second + 10, b"\"width\": 4".iter().copied());

        let mut out = Vec::new();
        let err = convert(&registry, &ConvertOptions::new(Format::Binary), Cursor::new(&json), &mut out)
            .expect_err("invalid");
        match &err {
            Error::Record { index, offset, .. } => {
                assert_eq!(*index, 1);
                assert!(*offset > 0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.as_parse_error().is_some());
    }

    #[test]
    fn test_file_workflows() {
        let registry = registry();
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("in.ser");
        let output = dir.path().join("out.ser");

        let options = CreateOptions::new("Trace", 3, Format::Binary).with_init("width=2");
        create_to(&registry, &options, &OutputTarget::File(input.clone())).expect("create");

        let summary = convert_file(
            &registry,
            &ConvertOptions::new(Format::Ascii),
            &input,
            &OutputTarget::File(output.clone()),
        )
        .expect("convert");
        assert_eq!(summary.records, 3);

        let mut printed = Vec::new();
        print_file(&registry, &PrintOptions::default(), &input, &mut printed).expect("print");
        assert_eq!(printed, fs::read(&output).expect("read"));

        let err = convert_file(
            &registry,
            &ConvertOptions::new(Format::Json),
            &input,
            &OutputTarget::File(input.clone()),
        )
        .expect_err("same file");
        assert_eq!(err.to_string(), "Input and output file must not be the same.");
    }

    #[test]
    fn test_input_file_diagnostics() {
        let registry = registry();
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.ser");
        let mut out = Vec::new();
        let err = print_file(&registry, &PrintOptions::default(), &missing, &mut out).expect_err("missing");
        assert_eq!(
            err.to_string(),
            format!("The input file '{}' does not exist or is not readable", missing.display())
        );

        let garbage = dir.path().join("garbage.ser");
        fs::write(&garbage, b"not a stream\n").expect("write");
        let output = dir.path().join("out.ser");
        let err = convert_file(
            &registry,
            &ConvertOptions::new(Format::Json),
            &garbage,
            &OutputTarget::File(output.clone()),
        )
        .expect_err("garbage");
        assert_eq!(
            err.to_string(),
            format!("The input file '{}' does not contain valid data", garbage.display())
        );
        assert!(!output.exists());

        let empty = dir.path().join("empty.ser");
        fs::write(&empty, b"").expect("write");
        let err = print_file(&registry, &PrintOptions::default(), &empty, &mut out).expect_err("empty");
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn test_zero_max_elements_yields_empty_summary() {
        let registry = registry();
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("in.ser");
        let options = CreateOptions::new("Trace", 2, Format::Json).with_init("width=2");
        create_to(&registry, &options, &OutputTarget::File(input.clone())).expect("create");

        let mut out = Vec::new();
        let print_options = PrintOptions {
            max_elements: Some(0),
            with_type: false,
        };
        let summary = print_file(&registry, &print_options, &input, &mut out).expect("print none");
        assert_eq!(summary.records, 0);
        assert!(out.is_empty());

        let output = dir.path().join("out.ser");
        let convert_options = ConvertOptions {
            max_elements: Some(0),
            ..ConvertOptions::new(Format::Binary)
        };
        let summary = convert_file(&registry, &convert_options, &input, &OutputTarget::File(output.clone()))
            .expect("convert none");
        assert_eq!(summary.records, 0);
        assert_eq!(fs::read(&output).expect("read"), b"");
    }
}

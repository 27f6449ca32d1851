// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Command-line arguments of the three tools and the workflows they drive.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser};
use hris_serialize::{
    ConvertOptions, CreateOptions, Format, LoaderConfig, OutputTarget, PrintOptions, Registry,
    Summary, MAX_COUNT,
};
use tracing::{debug, info};

/// Options shared by every tool.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Directory searched for type libraries before HRIS_LIBRARY_PATH (repeatable)
    #[arg(short = 'L', long = "library-path", value_name = "DIR")]
    pub library_path: Vec<PathBuf>,

    /// Only search -L and HRIS_LIBRARY_PATH directories
    #[arg(long)]
    pub no_system_path: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Same as --log-level debug
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    pub fn loader_config(&self) -> LoaderConfig {
        let env = LoaderConfig::default();
        let mut config = LoaderConfig::new().with_system_path(!self.no_system_path);
        for dir in self.library_path.iter().chain(env.search_path.iter()) {
            config = config.with_search_dir(dir.clone());
        }
        config
    }

    pub fn registry(&self) -> Registry {
        let config = self.loader_config();
        debug!(search_path = ?config.search_path, system = config.use_system_path, "library lookup");
        Registry::new(config)
    }

    /// Effective log filter directive.
    pub fn log_filter(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

fn parse_format(text: &str) -> Result<Format, String> {
    text.parse()
        .map_err(|_| format!("unknown format '{text}' (expected Binary, Ascii or Json)"))
}

fn parse_count(text: &str) -> Result<usize, String> {
    let count: usize = text.parse().map_err(|_| format!("'{text}' is not a count"))?;
    if (1..=MAX_COUNT).contains(&count) {
        Ok(count)
    } else {
        Err(format!("count must be within 1..={MAX_COUNT}"))
    }
}

fn parse_limit(text: &str) -> Result<usize, String> {
    match text.parse::<usize>() {
        Ok(0) => Err("limit must be at least 1".to_string()),
        Ok(limit) => Ok(limit),
        Err(_) => Err(format!("'{text}' is not a count")),
    }
}

/// Write a number of generated records of one type.
#[derive(Parser, Debug, Clone)]
#[command(name = "CreateSerializedData")]
#[command(about = "Create serialized records of a data type")]
#[command(version)]
pub struct CreateArgs {
    /// Data type, resolved as lib<TYPE>.so
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub type_name: String,

    /// Number of records
    #[arg(short, long, default_value = "1", value_parser = parse_count)]
    pub count: usize,

    /// Payload format (Binary, Ascii, Json)
    #[arg(short, long, default_value = "Binary", value_parser = parse_format)]
    pub format: Format,

    /// Format options written into each header
    #[arg(long, value_name = "OPTS")]
    pub format_options: Option<String>,

    /// Output file, '-' for stdout
    #[arg(short, long, default_value = "-", value_name = "FILE")]
    pub output: String,

    /// Data name written into each header
    #[arg(short = 'n', long = "name", default_value = hris_serialize::header::DEFAULT_DATA_NAME)]
    pub data_name: String,

    /// Init string passed to the type before populating
    #[arg(short, long, value_name = "STRING")]
    pub init: Option<String>,

    /// Fill records with random values instead of a ramp
    #[arg(short, long)]
    pub random: bool,

    /// Lower bound of random values
    #[arg(long, default_value = "0.0", allow_negative_numbers = true)]
    pub min: f64,

    /// Upper bound of random values
    #[arg(long, default_value = "1.0", allow_negative_numbers = true)]
    pub max: f64,

    /// Seed of the first record; record i uses seed + i
    #[arg(short, long, default_value = "0")]
    pub seed: u64,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl CreateArgs {
    pub fn options(&self) -> CreateOptions {
        let mut options = CreateOptions::new(&self.type_name, self.count, self.format);
        options.format_options = self.format_options.clone();
        options.data_name = self.data_name.clone();
        if let Some(init) = &self.init {
            options = options.with_init(init);
        }
        if self.random {
            options = options.with_random_values(self.seed, self.min, self.max);
        } else {
            options.seed = self.seed;
        }
        options
    }

    pub fn run(&self, registry: &Registry) -> anyhow::Result<Summary> {
        let target = OutputTarget::from_arg(&self.output);
        let summary = hris_serialize::create_to(registry, &self.options(), &target)
            .with_context(|| format!("cannot create {} records of '{}'", self.count, self.type_name))?;
        info!(
            "Created {} {} record(s) of '{}' ({} bytes)",
            summary.records, self.format, self.type_name, summary.bytes
        );
        Ok(summary)
    }
}

/// Re-encode a stream in another format.
#[derive(Parser, Debug, Clone)]
#[command(name = "ConvertSerializedData")]
#[command(about = "Convert serialized records to another format")]
#[command(version)]
pub struct ConvertArgs {
    /// Input file
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Target format (Binary, Ascii, Json)
    #[arg(short, long, value_parser = parse_format)]
    pub format: Format,

    /// Format options written into each header
    #[arg(long, value_name = "OPTS")]
    pub format_options: Option<String>,

    /// Output file, '-' for stdout
    #[arg(short, long, default_value = "-", value_name = "FILE")]
    pub output: String,

    /// Convert at most this many records
    #[arg(short, long, value_name = "N", value_parser = parse_limit)]
    pub max_elements: Option<usize>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl ConvertArgs {
    pub fn options(&self) -> ConvertOptions {
        let mut options = ConvertOptions::new(self.format);
        options.format_options = self.format_options.clone();
        options.max_elements = self.max_elements;
        options
    }

    pub fn run(&self, registry: &Registry) -> anyhow::Result<Summary> {
        let target = OutputTarget::from_arg(&self.output);
        let summary = hris_serialize::convert_file(registry, &self.options(), &self.input, &target)?;
        info!(
            "Converted {} record(s) of '{}' to {}",
            summary.records,
            summary.type_name.as_deref().unwrap_or("?"),
            self.format
        );
        Ok(summary)
    }
}

/// Render a stream as Ascii on stdout.
#[derive(Parser, Debug, Clone)]
#[command(name = "PrintSerializedData")]
#[command(about = "Print serialized records in human-readable form")]
#[command(version)]
pub struct PrintArgs {
    /// Input file
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub input: PathBuf,

    /// Print at most this many records
    #[arg(short, long, value_name = "N", value_parser = parse_limit)]
    pub max_elements: Option<usize>,

    /// Tag every line with its type
    #[arg(long)]
    pub with_type: bool,

    /// Output file, '-' for stdout
    #[arg(short, long, default_value = "-", value_name = "FILE")]
    pub output: String,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl PrintArgs {
    pub fn options(&self) -> PrintOptions {
        PrintOptions {
            max_elements: self.max_elements,
            with_type: self.with_type,
        }
    }

    pub fn run(&self, registry: &Registry) -> anyhow::Result<Summary> {
        let target = OutputTarget::from_arg(&self.output);
        let summary = target.write_with(|out| {
            hris_serialize::print_file(registry, &self.options(), &self.input, out)
        })?;
        debug!(records = summary.records, "printed");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_defaults() {
        let args = CreateArgs::try_parse_from(["CreateSerializedData", "-t", "BBDMArrayBlockF32"])
            .expect("parse");
        assert_eq!(args.count, 1);
        assert_eq!(args.format, Format::Binary);
        assert_eq!(args.output, "-");
        assert_eq!(args.data_name, "data");
        assert!(!args.random);

        let options = args.options();
        assert_eq!(options.type_name, "BBDMArrayBlockF32");
        assert!(!options.randomize);
    }

    #[test]
    fn test_create_flags() {
        let args = CreateArgs::try_parse_from([
            "CreateSerializedData",
            "-t",
            "BBDMArrayBlockF32",
            "-c",
            "7",
            "-r",
            "-f",
            "ascii",
            "--min",
            "-1.5",
            "--max",
            "2",
            "-s",
            "9",
            "-i",
            "dims=2 extents=3,2",
            "-o",
            "out.ser",
        ])
        .expect("parse");
        assert_eq!(args.count, 7);
        assert_eq!(args.format, Format::Ascii);
        let options = args.options();
        assert!(options.randomize);
        assert_eq!(options.seed, 9);
        assert_eq!(options.value_min, -1.5);
        assert_eq!(options.init.as_deref(), Some("dims=2 extents=3,2"));
    }

    #[test]
    fn test_create_rejects_bad_values() {
        for argv in [
            vec!["CreateSerializedData"],
            vec!["CreateSerializedData", "-t", "T", "-c", "0"],
            vec!["CreateSerializedData", "-t", "T", "-c", "1000001"],
            vec!["CreateSerializedData", "-t", "T", "-f", "Xml"],
        ] {
            assert!(CreateArgs::try_parse_from(argv.iter().copied()).is_err(), "{argv:?}");
        }
    }

    #[test]
    fn test_convert_and_print_flags() {
        let args = ConvertArgs::try_parse_from([
            "ConvertSerializedData",
            "-i",
            "in.ser",
            "-f",
            "JSON",
            "-m",
            "3",
        ])
        .expect("parse");
        assert_eq!(args.format, Format::Json);
        assert_eq!(args.options().max_elements, Some(3));
        assert!(ConvertArgs::try_parse_from(["ConvertSerializedData", "-i", "in.ser"]).is_err());

        let args = PrintArgs::try_parse_from(["PrintSerializedData", "-f", "in.ser", "--with-type", "-v"])
            .expect("parse");
        assert!(args.options().with_type);
        assert_eq!(args.common.log_filter(), "debug");
    }

    #[test]
    fn test_zero_max_elements_is_rejected() {
        let err = ConvertArgs::try_parse_from(["ConvertSerializedData", "-i", "in.ser", "-f", "Json", "-m", "0"])
            .expect_err("zero limit");
        assert!(err.to_string().contains("at least 1"), "{err}");
        assert!(PrintArgs::try_parse_from(["PrintSerializedData", "-f", "in.ser", "-m", "0"]).is_err());
        assert!(PrintArgs::try_parse_from(["PrintSerializedData", "-f", "in.ser", "-m", "x"]).is_err());
        let args = PrintArgs::try_parse_from(["PrintSerializedData", "-f", "in.ser", "-m", "1"]).expect("parse");
        assert_eq!(args.options().max_elements, Some(1));
    }

    #[test]
    fn test_library_path_precedes_environment() {
        let args = PrintArgs::try_parse_from([
            "PrintSerializedData",
            "-f",
            "in.ser",
            "-L",
            "/opt/a",
            "-L",
            "/opt/b",
            "--no-system-path",
        ])
        .expect("parse");
        let config = args.common.loader_config();
        assert_eq!(&config.search_path[..2], &[PathBuf::from("/opt/a"), PathBuf::from("/opt/b")]);
        assert!(!config.use_system_path);
    }
}

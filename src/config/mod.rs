//! Effective settings, merged from the command line and an optional TOML file.
//!
//! Explicit command-line values (including their environment fallbacks) win
//! over the file; the file wins over built-in defaults. Include directories
//! from both sources are searched, command-line ones first.

pub mod file;

pub use file::FileConfig;

use crate::Cli;
use chrono::{DateTime, Utc};
use proto_schema::{CompilerKind, SchemaCompiler};
use sample_generator::{RecursionPolicy, TimestampSource};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub message_type: Option<String>,
    pub inputs: Vec<PathBuf>,
    pub includes: Vec<PathBuf>,
    pub compiler: CompilerKind,
    pub protoc_path: Option<PathBuf>,
    pub descriptor_set: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub max_recursion: usize,
    pub fixed_timestamp: Option<DateTime<Utc>>,
    pub verify: bool,
    pub list: bool,
}

impl Settings {
    /// Load the `--config` file, if any, and merge it with `cli`.
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    pub fn merge(cli: &Cli, file: FileConfig) -> anyhow::Result<Self> {
        let file_compiler = file.compiler_kind()?;

        let mut includes = cli.schema.include.clone();
        includes.extend(file.include);

        Ok(Self {
            message_type: if cli.list {
                None
            } else {
                cli.message_type.clone()
            },
            inputs: cli.schema_inputs(),
            includes,
            compiler: cli.schema.compiler.or(file_compiler).unwrap_or_default(),
            protoc_path: cli.schema.protoc_path.clone().or(file.protoc_path),
            descriptor_set: cli.schema.descriptor_set.clone(),
            output: cli.output.clone(),
            max_recursion: cli
                .max_recursion
                .or(file.max_recursion)
                .unwrap_or(RecursionPolicy::DEFAULT_MAX_EXPANSIONS),
            fixed_timestamp: cli.fixed_timestamp,
            verify: cli.verify,
            list: cli.list,
        })
    }

    pub fn compiler(&self) -> SchemaCompiler {
        let compiler = SchemaCompiler::new(self.compiler).includes(self.includes.iter().cloned());
        match &self.protoc_path {
            Some(path) => compiler.protoc_path(path.clone()),
            None => compiler,
        }
    }

    pub fn recursion_policy(&self) -> anyhow::Result<RecursionPolicy> {
        Ok(RecursionPolicy::new(self.max_recursion)?)
    }

    pub fn clock(&self) -> TimestampSource {
        match self.fixed_timestamp {
            Some(instant) => TimestampSource::Fixed(instant),
            None => TimestampSource::Now,
        }
    }
}

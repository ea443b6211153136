//! proto-sample library
//!
//! Synthesizes a sample payload for any message type in a protobuf schema and
//! writes it in the binary wire format.
//!
//! # Features
//!
//! - Schema input: `.proto` files compiled with `protoc` or the bundled
//!   pure-Rust parser, or a precompiled `FileDescriptorSet`
//! - Name resolution: fully-qualified names or unambiguous trailing segments
//! - Deterministic output: every field takes a fixed canonical value
//! - Bounded recursion for self-referencing and mutually recursive types
//!
//! # CLI Usage
//!
//! ```bash
//! # Sample payload for acme.v1.Person, compiled with protoc
//! proto-sample acme.v1.Person person.proto > person.bin
//!
//! # Short names work when unambiguous; pure-Rust parser, extra import path
//! proto-sample --compiler pure -I third_party Person person.proto -o person.bin
//!
//! # From a precompiled descriptor set, unrolling recursive types twice
//! proto-sample --descriptor-set schema.pb --max-recursion 2 tree.Node
//!
//! # List every message type
//! proto-sample --list person.proto
//! ```

use chrono::{DateTime, Utc};
use clap::Parser;
use proto_schema::{CompilerKind, SchemaError};
use std::path::PathBuf;

pub mod config;
pub mod generate;

pub use config::{FileConfig, Settings};
pub use generate::{generate_payload, load_schema, run, run_generate, run_list};

/// Exit status for a message type that matched nothing, or more than one type.
pub const EXIT_LOOKUP_FAILURE: i32 = 2;
/// Exit status for every other failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser, Clone, Debug)]
pub struct SchemaOpts {
    /// Import search directory (repeatable)
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    pub include: Vec<PathBuf>,

    /// Schema compiler: protoc or pure
    #[arg(long, env = "PROTO_SAMPLE_COMPILER")]
    pub compiler: Option<CompilerKind>,

    /// Path to the protoc binary (default: protoc on PATH)
    #[arg(long, env = "PROTOC", value_name = "PATH")]
    pub protoc_path: Option<PathBuf>,

    /// Load a precompiled FileDescriptorSet instead of compiling .proto files
    #[arg(long, value_name = "FILE")]
    pub descriptor_set: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(name = "proto-sample")]
#[command(about = "Synthesize a sample protobuf payload for a message type")]
#[command(version)]
pub struct Cli {
    /// Message type to synthesize (fully-qualified, or an unambiguous suffix)
    #[arg(value_name = "MESSAGE_TYPE", required_unless_present = "list")]
    pub message_type: Option<String>,

    /// .proto files to compile
    #[arg(value_name = "SCHEMA_FILE")]
    pub schema_files: Vec<PathBuf>,

    #[command(flatten)]
    pub schema: SchemaOpts,

    /// Write the payload here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// How many times one message type may be expanded along a path of
    /// nested fields (default: 1)
    #[arg(long, env = "PROTO_SAMPLE_MAX_RECURSION", value_name = "N")]
    pub max_recursion: Option<usize>,

    /// Use this RFC 3339 instant for google.protobuf.Timestamp fields instead
    /// of the current time
    #[arg(long, value_name = "RFC3339", value_parser = sample_generator::parse_instant)]
    pub fixed_timestamp: Option<DateTime<Utc>>,

    /// Decode the payload and check it re-encodes to the same bytes before
    /// writing it
    #[arg(long)]
    pub verify: bool,

    /// Print the schema's message types instead of generating.
    /// Every positional argument is then a schema file
    #[arg(long)]
    pub list: bool,

    /// TOML file with defaults for include, compiler, protoc_path and
    /// max_recursion
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// The `.proto` inputs named on the command line.
    pub fn schema_inputs(&self) -> Vec<PathBuf> {
        let mut inputs = Vec::with_capacity(self.schema_files.len() + 1);
        if self.list {
            inputs.extend(self.message_type.iter().map(PathBuf::from));
        }
        inputs.extend(self.schema_files.iter().cloned());
        inputs
    }
}

/// Map a failure to the process exit status.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    let lookup_failure = error.chain().any(|cause| {
        cause
            .downcast_ref::<SchemaError>()
            .is_some_and(SchemaError::is_lookup_failure)
    });
    if lookup_failure {
        EXIT_LOOKUP_FAILURE
    } else {
        EXIT_FAILURE
    }
}

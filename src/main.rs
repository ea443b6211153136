//! Command-line interface for proto-sample
//!
//! # Usage Examples
//!
//! ```bash
//! # Sample payload for a message type, compiled with protoc
//! proto-sample acme.v1.Person protos/person.proto > person.bin
//!
//! # Reproducible output for schemas that use google.protobuf.Timestamp
//! proto-sample --fixed-timestamp 2024-01-01T00:00:00Z Event event.proto -o event.bin
//!
//! # Check the payload decodes back before writing it
//! proto-sample --verify --compiler pure Order orders.proto | xxd
//! ```
//!
//! ## Exit Status
//! - `0`: payload written
//! - `2`: the message type matched no type, or more than one
//! - `1`: any other failure

use clap::Parser;
use proto_sample::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(proto_sample::exit_code(&e));
    }
}

fn run() -> anyhow::Result<()> {
    // Stdout carries the payload; diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    proto_sample::run(cli)
}

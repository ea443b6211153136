//! Schema catalog for proto-sample.
//!
//! Features:
//!
//! - Compilation: turn `.proto` sources into file descriptors, through the
//!   external `protoc` binary or the bundled pure-Rust parser
//! - Descriptor sets: load a precompiled `FileDescriptorSet` instead
//! - Registration: index every message and enum by fully-qualified name,
//!   rejecting duplicates and dangling references
//! - Resolution: map a requested type name onto exactly one message

/// `.proto` compilation through protobuf-parse
pub mod compile;

/// Catalog construction from file descriptors, and name resolution
pub mod catalog;
pub mod error;

// Re-export main types for easy access
pub use catalog::{
    resolve_message, schema_from_descriptor_set, schema_from_descriptor_set_bytes,
    schema_from_descriptor_set_file, schema_from_files, SchemaBuilder,
};
pub use compile::{CompilerKind, SchemaCompiler};
pub use error::{Result, SchemaError};

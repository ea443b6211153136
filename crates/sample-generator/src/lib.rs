//! Sample message synthesizer for proto-sample.
//!
//! This crate provides the `MessageSynthesizer`, which builds a fully-populated
//! instance of any message type in a [`ProtoSchema`]. Every field receives a
//! fixed canonical value, so the same schema and type always produce the same
//! instance (apart from `google.protobuf.Timestamp`, which reads a clock).
//!
//! # Architecture
//!
//! ```text
//! ProtoSchema + message type
//!        │
//!        ▼
//! ┌──────────────────────┐
//! │  MessageSynthesizer  │
//! │                      │
//! │  - RecursionPolicy   │
//! │  - TimestampSource   │
//! │  - ExpansionPath     │
//! └──────────┬───────────┘
//!            │
//!            ▼
//!    ProtoMessage { message_type, fields }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sample_generator::MessageSynthesizer;
//!
//! let person = MessageSynthesizer::new(&schema).synthesize_by_name("demo.Person")?;
//! let bytes = proto_types::encode_message(&person)?;
//! ```
//!
//! # Field values
//!
//! - Scalars - see [`generators::canonical`]
//! - Enums - first declared value
//! - Messages - recursive synthesis, bounded per type along each path
//! - Repeated - exactly one element
//! - Oneofs - only the last declared member

pub mod generator;
pub mod generators;

pub use generator::{ExpansionPath, GeneratorError, MessageSynthesizer, RecursionPolicy};
pub use generators::{parse_instant, TimestampSource, WELL_KNOWN_TIMESTAMP};

#[doc(no_inline)]
pub use proto_types::ProtoSchema;

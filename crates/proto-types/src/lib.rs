//! Protobuf schema model and wire codec for proto-sample.
//!
//! This crate holds the types every other crate in the workspace shares:
//! the schema catalog, message/enum/field descriptors and message instances.
//! It also provides both directions of the binary wire format.
//!
//! # Architecture
//!
//! ```text
//! Forward (sample output):  ProtoMessage → encoded bytes
//! Reverse (verification):   encoded bytes → ProtoMessage
//! ```
//!
//! # Modules
//!
//! - [`proto`] - Descriptors, schema catalog and instance values
//! - [`forward`] - ProtoMessage → protobuf encoding
//! - [`reverse`] - protobuf → ProtoMessage decoding
//! - [`error`] - Error types for encoding and decoding
//!
//! # Example
//!
//! ```ignore
//! use proto_types::{decode_message, encode_message};
//!
//! let bytes = encode_message(&message)?;
//! let decoded = decode_message(&schema, &message.message_type, &bytes)?;
//! // proto3 defaults are not on the wire, so compare the encodings
//! assert_eq!(encode_message(&decoded)?, bytes);
//! ```

pub mod error;
pub mod forward;
pub mod proto;
pub mod reverse;

// Re-export main types for convenient access
pub use error::{ProtoTypesError, Result};
pub use forward::{encode_field_value, encode_message};
pub use proto::{
    Cardinality, ProtoEnumDescriptor, ProtoEnumValue, ProtoFieldDescriptor, ProtoFieldValue,
    ProtoMessage, ProtoMessageDescriptor, ProtoSchema, ProtoType,
};
pub use reverse::{decode_message, ProtoDecoder};

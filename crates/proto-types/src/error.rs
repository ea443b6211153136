//! Error types for proto-types crate.

use crate::ProtoType;
use thiserror::Error;

/// Errors that can occur while encoding or decoding message instances.
#[derive(Error, Debug)]
pub enum ProtoTypesError {
    #[error("Protobuf encoding error: {0}")]
    ProtobufEncode(String),

    #[error("Protobuf decoding error: {0}")]
    ProtobufDecode(String),

    #[error("Value for field '{field}' does not match its kind {expected}")]
    KindMismatch { field: String, expected: ProtoType },

    #[error("Message type not found: {0}")]
    MessageTypeNotFound(String),
}

/// Result type alias for proto-types operations.
pub type Result<T> = std::result::Result<T, ProtoTypesError>;

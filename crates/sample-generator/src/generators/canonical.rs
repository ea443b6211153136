//! Canonical placeholder values for scalar field kinds.

// The float placeholders are deliberately close to e and pi
#![allow(clippy::approx_constant)]

use proto_types::{ProtoFieldValue, ProtoMessage, ProtoMessageDescriptor, ProtoType};

pub const CANONICAL_BOOL: bool = true;
pub const CANONICAL_INT32: i32 = 42;
pub const CANONICAL_INT64: i64 = 1337;
pub const CANONICAL_FLOAT: f32 = 2.71828;
pub const CANONICAL_DOUBLE: f64 = 3.141592653;
pub const CANONICAL_STRING: &str = "Lorem ipsum";
pub const CANONICAL_BYTES: [u8; 3] = [0xc0, 0xff, 0xee];

/// The fixed value used for every field of a scalar kind.
///
/// `Enum` and `Message` kinds get their zero value: number 0 and an empty
/// instance. The synthesizer resolves those kinds against the schema instead.
pub fn canonical_value(kind: &ProtoType) -> ProtoFieldValue {
    match kind {
        ProtoType::Bool => ProtoFieldValue::Bool(CANONICAL_BOOL),
        ProtoType::Int32 | ProtoType::Sint32 | ProtoType::Sfixed32 => {
            ProtoFieldValue::Int32(CANONICAL_INT32)
        }
        ProtoType::Uint32 | ProtoType::Fixed32 => ProtoFieldValue::Uint32(CANONICAL_INT32 as u32),
        ProtoType::Int64 | ProtoType::Sint64 | ProtoType::Sfixed64 => {
            ProtoFieldValue::Int64(CANONICAL_INT64)
        }
        ProtoType::Uint64 | ProtoType::Fixed64 => ProtoFieldValue::Uint64(CANONICAL_INT64 as u64),
        ProtoType::Float => ProtoFieldValue::Float(CANONICAL_FLOAT),
        ProtoType::Double => ProtoFieldValue::Double(CANONICAL_DOUBLE),
        ProtoType::String => ProtoFieldValue::String(CANONICAL_STRING.to_string()),
        ProtoType::Bytes => ProtoFieldValue::Bytes(CANONICAL_BYTES.to_vec()),
        ProtoType::Enum(_) => ProtoFieldValue::Enum(0),
        ProtoType::Message(name) => ProtoFieldValue::Message(Box::new(ProtoMessage::empty(
            &ProtoMessageDescriptor::new(name.clone(), Vec::new()),
        ))),
    }
}

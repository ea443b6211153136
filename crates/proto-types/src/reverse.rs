//! Runtime protobuf decoder.
//!
//! Decodes protobuf binary data back into a [`ProtoMessage`] using a
//! [`ProtoSchema`]. Accepts both packed and unpacked layouts for repeated
//! scalar fields.

use crate::error::{ProtoTypesError, Result};
use crate::proto::{
    ProtoFieldDescriptor, ProtoFieldValue, ProtoMessage, ProtoMessageDescriptor, ProtoSchema,
    ProtoType,
};
use protobuf::CodedInputStream;

const WIRE_TYPE_LENGTH_DELIMITED: u32 = 2;

/// Nested messages deeper than this are rejected instead of recursing.
pub const MAX_DECODE_DEPTH: usize = 100;

fn decode_err(e: protobuf::Error) -> ProtoTypesError {
    ProtoTypesError::ProtobufDecode(e.to_string())
}

/// Decodes binary protobuf data into ProtoMessage using a schema.
pub struct ProtoDecoder<'a> {
    schema: &'a ProtoSchema,
}

impl<'a> ProtoDecoder<'a> {
    /// Create a new decoder from a schema.
    pub fn new(schema: &'a ProtoSchema) -> Self {
        Self { schema }
    }

    /// Decode a protobuf message of type `message_type` from bytes.
    pub fn decode(&self, message_type: &str, data: &[u8]) -> Result<ProtoMessage> {
        let descriptor = self
            .schema
            .get_message(message_type)
            .ok_or_else(|| ProtoTypesError::MessageTypeNotFound(message_type.to_string()))?;
        let mut stream = CodedInputStream::from_bytes(data);
        self.decode_message(descriptor, &mut stream, 0)
    }

    fn decode_message(
        &self,
        descriptor: &ProtoMessageDescriptor,
        stream: &mut CodedInputStream,
        depth: usize,
    ) -> Result<ProtoMessage> {
        if depth > MAX_DECODE_DEPTH {
            return Err(ProtoTypesError::ProtobufDecode(format!(
                "Message nesting exceeds {MAX_DECODE_DEPTH} levels in {}",
                descriptor.name
            )));
        }

        let mut message = ProtoMessage::empty(descriptor);

        while !stream.eof().map_err(decode_err)? {
            let tag = stream.read_raw_varint32().map_err(decode_err)?;
            let field_number = tag >> 3;
            let wire_type = tag & 7;

            let field_desc = descriptor.field_by_number(field_number).ok_or_else(|| {
                ProtoTypesError::ProtobufDecode(format!(
                    "Unknown field number: {} in message {}",
                    field_number, descriptor.name
                ))
            })?;

            if !field_desc.is_repeated() {
                let value = self.decode_field_value(field_desc, stream, depth)?;
                message.set(field_desc.name.clone(), value);
                continue;
            }

            if wire_type == WIRE_TYPE_LENGTH_DELIMITED && field_desc.field_type.is_packable() {
                let len = stream.read_raw_varint32().map_err(decode_err)?;
                let old_limit = stream.push_limit(len as u64).map_err(decode_err)?;
                while !stream.eof().map_err(decode_err)? {
                    let value = self.decode_field_value(field_desc, stream, depth)?;
                    message.push(field_desc.name.clone(), value);
                }
                stream.pop_limit(old_limit);
            } else {
                let value = self.decode_field_value(field_desc, stream, depth)?;
                message.push(field_desc.name.clone(), value);
            }
        }

        Ok(message)
    }

    fn decode_field_value(
        &self,
        field_desc: &ProtoFieldDescriptor,
        stream: &mut CodedInputStream,
        depth: usize,
    ) -> Result<ProtoFieldValue> {
        let value = match &field_desc.field_type {
            ProtoType::Double => ProtoFieldValue::Double(stream.read_double().map_err(decode_err)?),
            ProtoType::Float => ProtoFieldValue::Float(stream.read_float().map_err(decode_err)?),
            ProtoType::Int32 => ProtoFieldValue::Int32(stream.read_int32().map_err(decode_err)?),
            ProtoType::Sint32 => ProtoFieldValue::Int32(stream.read_sint32().map_err(decode_err)?),
            ProtoType::Sfixed32 => {
                ProtoFieldValue::Int32(stream.read_sfixed32().map_err(decode_err)?)
            }
            ProtoType::Int64 => ProtoFieldValue::Int64(stream.read_int64().map_err(decode_err)?),
            ProtoType::Sint64 => ProtoFieldValue::Int64(stream.read_sint64().map_err(decode_err)?),
            ProtoType::Sfixed64 => {
                ProtoFieldValue::Int64(stream.read_sfixed64().map_err(decode_err)?)
            }
            ProtoType::Uint32 => ProtoFieldValue::Uint32(stream.read_uint32().map_err(decode_err)?),
            ProtoType::Fixed32 => {
                ProtoFieldValue::Uint32(stream.read_fixed32().map_err(decode_err)?)
            }
            ProtoType::Uint64 => ProtoFieldValue::Uint64(stream.read_uint64().map_err(decode_err)?),
            ProtoType::Fixed64 => {
                ProtoFieldValue::Uint64(stream.read_fixed64().map_err(decode_err)?)
            }
            ProtoType::Bool => ProtoFieldValue::Bool(stream.read_bool().map_err(decode_err)?),
            ProtoType::String => ProtoFieldValue::String(stream.read_string().map_err(decode_err)?),
            ProtoType::Bytes => ProtoFieldValue::Bytes(stream.read_bytes().map_err(decode_err)?),
            ProtoType::Enum(_) => ProtoFieldValue::Enum(stream.read_int32().map_err(decode_err)?),
            ProtoType::Message(type_name) => {
                let nested_descriptor = self
                    .schema
                    .get_message(type_name)
                    .ok_or_else(|| ProtoTypesError::MessageTypeNotFound(type_name.clone()))?;

                let len = stream.read_raw_varint32().map_err(decode_err)?;
                let old_limit = stream.push_limit(len as u64).map_err(decode_err)?;
                let nested_message = self.decode_message(nested_descriptor, stream, depth + 1)?;
                stream.pop_limit(old_limit);

                ProtoFieldValue::Message(Box::new(nested_message))
            }
        };
        Ok(value)
    }
}

/// Decode `data` as `message_type` using `schema`.
pub fn decode_message(
    schema: &ProtoSchema,
    message_type: &str,
    data: &[u8],
) -> Result<ProtoMessage> {
    ProtoDecoder::new(schema).decode(message_type, data)
}

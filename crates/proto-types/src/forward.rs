//! Protobuf encoder for message instances.
//!
//! Encodes a [`ProtoMessage`] into protobuf binary format using the
//! descriptor carried by the instance.
//!
//! The encoding follows the canonical wire format:
//! - Each field is encoded as (tag, value) pairs, in ascending field number order
//! - Tag = (field_number << 3) | wire_type
//! - Wire types: 0=varint, 1=64-bit, 2=length-delimited, 5=32-bit
//! - The field kind, not the value variant, selects the encoding, so an
//!   `Int32` value is zig-zag encoded for `sint32` and fixed-width for `sfixed32`

use crate::error::{ProtoTypesError, Result};
use crate::proto::{Cardinality, ProtoFieldDescriptor, ProtoFieldValue, ProtoMessage, ProtoType};
use protobuf::CodedOutputStream;

fn encode_err(e: protobuf::Error) -> ProtoTypesError {
    ProtoTypesError::ProtobufEncode(e.to_string())
}

fn kind_mismatch(field: &ProtoFieldDescriptor) -> ProtoTypesError {
    ProtoTypesError::KindMismatch {
        field: field.name.clone(),
        expected: field.field_type.clone(),
    }
}

/// Encode a message instance to protobuf binary format.
pub fn encode_message(message: &ProtoMessage) -> Result<Vec<u8>> {
    if let Some(unknown) = message
        .fields
        .keys()
        .find(|name| message.descriptor.get_field(name).is_none())
    {
        return Err(ProtoTypesError::ProtobufEncode(format!(
            "Field '{unknown}' is not declared in message {}",
            message.message_type
        )));
    }

    let mut fields: Vec<&ProtoFieldDescriptor> = message.descriptor.fields.iter().collect();
    fields.sort_by_key(|f| f.number);

    let mut buffer = Vec::new();
    {
        let mut stream = CodedOutputStream::vec(&mut buffer);

        for field in fields {
            let Some(value) = message.fields.get(&field.name) else {
                continue;
            };

            match (field.cardinality, value) {
                (Cardinality::Repeated, ProtoFieldValue::Repeated(values)) => {
                    if field.packed && field.field_type.is_packable() {
                        encode_packed(&mut stream, field, values)?;
                    } else {
                        for element in values {
                            encode_field_value(&mut stream, field, element)?;
                        }
                    }
                }
                (Cardinality::Singular, ProtoFieldValue::Repeated(_))
                | (Cardinality::Repeated, _) => return Err(kind_mismatch(field)),
                // Canonical proto3 output leaves zero values off the wire
                (Cardinality::Singular, value)
                    if field.implicit_presence && value.is_default() => {}
                (Cardinality::Singular, value) => {
                    encode_field_value(&mut stream, field, value)?;
                }
            }
        }

        stream.flush().map_err(encode_err)?;
    }

    tracing::trace!(
        "Encoded {} into {} bytes",
        message.message_type,
        buffer.len()
    );

    Ok(buffer)
}

/// Encode a single value with the tag of `field`.
pub fn encode_field_value(
    stream: &mut CodedOutputStream,
    field: &ProtoFieldDescriptor,
    value: &ProtoFieldValue,
) -> Result<()> {
    let number = field.number;
    let written = match (&field.field_type, value) {
        (ProtoType::Double, ProtoFieldValue::Double(v)) => stream.write_double(number, *v),
        (ProtoType::Float, ProtoFieldValue::Float(v)) => stream.write_float(number, *v),
        (ProtoType::Int32, ProtoFieldValue::Int32(v)) => stream.write_int32(number, *v),
        (ProtoType::Sint32, ProtoFieldValue::Int32(v)) => stream.write_sint32(number, *v),
        (ProtoType::Sfixed32, ProtoFieldValue::Int32(v)) => stream.write_sfixed32(number, *v),
        (ProtoType::Int64, ProtoFieldValue::Int64(v)) => stream.write_int64(number, *v),
        (ProtoType::Sint64, ProtoFieldValue::Int64(v)) => stream.write_sint64(number, *v),
        (ProtoType::Sfixed64, ProtoFieldValue::Int64(v)) => stream.write_sfixed64(number, *v),
        (ProtoType::Uint32, ProtoFieldValue::Uint32(v)) => stream.write_uint32(number, *v),
        (ProtoType::Fixed32, ProtoFieldValue::Uint32(v)) => stream.write_fixed32(number, *v),
        (ProtoType::Uint64, ProtoFieldValue::Uint64(v)) => stream.write_uint64(number, *v),
        (ProtoType::Fixed64, ProtoFieldValue::Uint64(v)) => stream.write_fixed64(number, *v),
        (ProtoType::Bool, ProtoFieldValue::Bool(v)) => stream.write_bool(number, *v),
        (ProtoType::String, ProtoFieldValue::String(v)) => stream.write_string(number, v),
        (ProtoType::Bytes, ProtoFieldValue::Bytes(v)) => stream.write_bytes(number, v),
        (ProtoType::Enum(_), ProtoFieldValue::Enum(v)) => stream.write_enum(number, *v),
        (ProtoType::Message(type_name), ProtoFieldValue::Message(nested))
            if nested.message_type == *type_name =>
        {
            // Length-delimited, like any other bytes payload
            let nested_bytes = encode_message(nested)?;
            stream.write_bytes(number, &nested_bytes)
        }
        _ => return Err(kind_mismatch(field)),
    };
    written.map_err(encode_err)
}

/// Encode a repeated scalar field as one length-delimited record.
fn encode_packed(
    stream: &mut CodedOutputStream,
    field: &ProtoFieldDescriptor,
    values: &[ProtoFieldValue],
) -> Result<()> {
    if values.is_empty() {
        return Ok(());
    }

    let mut payload = Vec::new();
    {
        let mut packed = CodedOutputStream::vec(&mut payload);
        for value in values {
            let written = match (&field.field_type, value) {
                (ProtoType::Double, ProtoFieldValue::Double(v)) => packed.write_double_no_tag(*v),
                (ProtoType::Float, ProtoFieldValue::Float(v)) => packed.write_float_no_tag(*v),
                (ProtoType::Int32, ProtoFieldValue::Int32(v)) => packed.write_int32_no_tag(*v),
                (ProtoType::Sint32, ProtoFieldValue::Int32(v)) => packed.write_sint32_no_tag(*v),
                (ProtoType::Sfixed32, ProtoFieldValue::Int32(v)) => {
                    packed.write_sfixed32_no_tag(*v)
                }
                (ProtoType::Int64, ProtoFieldValue::Int64(v)) => packed.write_int64_no_tag(*v),
                (ProtoType::Sint64, ProtoFieldValue::Int64(v)) => packed.write_sint64_no_tag(*v),
                (ProtoType::Sfixed64, ProtoFieldValue::Int64(v)) => {
                    packed.write_sfixed64_no_tag(*v)
                }
                (ProtoType::Uint32, ProtoFieldValue::Uint32(v)) => packed.write_uint32_no_tag(*v),
                (ProtoType::Fixed32, ProtoFieldValue::Uint32(v)) => {
                    packed.write_fixed32_no_tag(*v)
                }
                (ProtoType::Uint64, ProtoFieldValue::Uint64(v)) => packed.write_uint64_no_tag(*v),
                (ProtoType::Fixed64, ProtoFieldValue::Uint64(v)) => {
                    packed.write_fixed64_no_tag(*v)
                }
                (ProtoType::Bool, ProtoFieldValue::Bool(v)) => packed.write_bool_no_tag(*v),
                (ProtoType::Enum(_), ProtoFieldValue::Enum(v)) => packed.write_enum_no_tag(*v),
                _ => return Err(kind_mismatch(field)),
            };
            written.map_err(encode_err)?;
        }
        packed.flush().map_err(encode_err)?;
    }

    stream.write_bytes(field.number, &payload).map_err(encode_err)
}

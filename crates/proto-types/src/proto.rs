//! Protobuf schema and instance definitions.
//!
//! These types are shared by every crate in the workspace:
//!
//! ```text
//! proto-types (this crate):
//!   - Defines: ProtoType, ProtoMessageDescriptor, ProtoSchema, ProtoMessage, ...
//!   - Provides: wire encoding (forward) and decoding (reverse)
//!
//! proto-schema:
//!   - Depends on: proto-types
//!   - Compiles .proto sources and fills a ProtoSchema from a descriptor set
//!
//! sample-generator:
//!   - Depends on: proto-types
//!   - Walks a ProtoMessageDescriptor and produces a ProtoMessage
//! ```
//!
//! Descriptors reference each other by fully-qualified name (without the
//! leading dot used inside descriptor sets). All descriptors are owned by one
//! [`ProtoSchema`], so self-referential schemas never form ownership cycles.

use std::collections::HashMap;

/// Protobuf field kind.
///
/// Closed set defined by the protobuf language. Cardinality is tracked
/// separately on [`ProtoFieldDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProtoType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    /// Nested message, by fully-qualified name
    Message(String),
    /// Enumeration, by fully-qualified name
    Enum(String),
}

impl std::fmt::Display for ProtoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

impl ProtoType {
    /// Get the human-readable type name.
    pub fn type_name(&self) -> String {
        match self {
            ProtoType::Double => "double".to_string(),
            ProtoType::Float => "float".to_string(),
            ProtoType::Int32 => "int32".to_string(),
            ProtoType::Int64 => "int64".to_string(),
            ProtoType::Uint32 => "uint32".to_string(),
            ProtoType::Uint64 => "uint64".to_string(),
            ProtoType::Sint32 => "sint32".to_string(),
            ProtoType::Sint64 => "sint64".to_string(),
            ProtoType::Fixed32 => "fixed32".to_string(),
            ProtoType::Fixed64 => "fixed64".to_string(),
            ProtoType::Sfixed32 => "sfixed32".to_string(),
            ProtoType::Sfixed64 => "sfixed64".to_string(),
            ProtoType::Bool => "bool".to_string(),
            ProtoType::String => "string".to_string(),
            ProtoType::Bytes => "bytes".to_string(),
            ProtoType::Message(name) => format!("message:{name}"),
            ProtoType::Enum(name) => format!("enum:{name}"),
        }
    }

    /// Whether a repeated field of this kind may use the packed layout.
    pub fn is_packable(&self) -> bool {
        !matches!(
            self,
            ProtoType::String | ProtoType::Bytes | ProtoType::Message(_)
        )
    }
}

/// Whether a field holds one value or an ordered list of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    Singular,
    Repeated,
}

/// Describes a single field in a protobuf message.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoFieldDescriptor {
    /// Field name
    pub name: String,
    /// Field number (tag)
    pub number: u32,
    /// Field type
    pub field_type: ProtoType,
    pub cardinality: Cardinality,
    /// Repeated scalars written as a single length-delimited record
    pub packed: bool,
    /// Index of the enclosing oneof, if the field belongs to a real oneof
    pub oneof_index: Option<i32>,
    /// proto3 singular scalar without `optional`: a default value is not
    /// distinguishable from an unset one and is left off the wire
    pub implicit_presence: bool,
}

impl ProtoFieldDescriptor {
    /// A singular field with no oneof membership.
    pub fn new(name: impl Into<String>, number: u32, field_type: ProtoType) -> Self {
        Self {
            name: name.into(),
            number,
            field_type,
            cardinality: Cardinality::Singular,
            packed: false,
            oneof_index: None,
            implicit_presence: false,
        }
    }

    /// Mark the field as having no presence tracking (proto3 singular scalars).
    pub fn implicit(mut self) -> Self {
        self.implicit_presence = true;
        self
    }

    /// Mark the field repeated. Packable kinds get the packed layout, which
    /// is the proto3 default.
    pub fn repeated(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self.packed = self.field_type.is_packable();
        self
    }

    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }
}

/// A named enum value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoEnumValue {
    pub name: String,
    pub number: i32,
}

/// Describes a protobuf enum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoEnumDescriptor {
    /// Fully qualified enum name (e.g., "mypackage.Status")
    pub name: String,
    /// Values in declaration order
    pub values: Vec<ProtoEnumValue>,
}

impl ProtoEnumDescriptor {
    /// The first declared value, if any.
    pub fn first_value(&self) -> Option<&ProtoEnumValue> {
        self.values.first()
    }
}

/// Describes a protobuf message type (schema).
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoMessageDescriptor {
    /// Fully qualified message name (e.g., "mypackage.MyMessage")
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<ProtoFieldDescriptor>,
}

impl ProtoMessageDescriptor {
    pub fn new(name: impl Into<String>, fields: Vec<ProtoFieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// The unqualified message name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Get a field descriptor by name.
    pub fn get_field(&self, name: &str) -> Option<&ProtoFieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get a field descriptor by number.
    pub fn field_by_number(&self, number: u32) -> Option<&ProtoFieldDescriptor> {
        self.fields.iter().find(|f| f.number == number)
    }

    /// List all field names in definition order.
    pub fn list_fields(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Catalog of message and enum types keyed by fully-qualified name.
///
/// Immutable once built. Construction and validation live in `proto-schema`.
#[derive(Debug, Clone, Default)]
pub struct ProtoSchema {
    /// Map of message type names to their descriptors
    pub messages: HashMap<String, ProtoMessageDescriptor>,
    /// Map of enum type names to their descriptors
    pub enums: HashMap<String, ProtoEnumDescriptor>,
}

impl ProtoSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a message descriptor by fully-qualified name.
    pub fn get_message(&self, name: &str) -> Option<&ProtoMessageDescriptor> {
        self.messages.get(name.trim_start_matches('.'))
    }

    /// Get an enum descriptor by fully-qualified name.
    pub fn get_enum(&self, name: &str) -> Option<&ProtoEnumDescriptor> {
        self.enums.get(name.trim_start_matches('.'))
    }

    /// List all message type names in the schema, sorted.
    pub fn list_messages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.messages.keys().cloned().collect();
        names.sort();
        names
    }
}

/// A field value in a protobuf message instance.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtoFieldValue {
    Double(f64),
    Float(f32),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    /// Enum value number
    Enum(i32),
    Message(Box<ProtoMessage>),
    Repeated(Vec<ProtoFieldValue>),
}

impl ProtoFieldValue {
    /// Whether this is the zero value of its kind.
    ///
    /// Floats compare by bit pattern, so `-0.0` is not a default. Messages
    /// and lists never are.
    pub fn is_default(&self) -> bool {
        match self {
            ProtoFieldValue::Double(v) => v.to_bits() == 0,
            ProtoFieldValue::Float(v) => v.to_bits() == 0,
            ProtoFieldValue::Int32(v) | ProtoFieldValue::Enum(v) => *v == 0,
            ProtoFieldValue::Int64(v) => *v == 0,
            ProtoFieldValue::Uint32(v) => *v == 0,
            ProtoFieldValue::Uint64(v) => *v == 0,
            ProtoFieldValue::Bool(v) => !*v,
            ProtoFieldValue::String(v) => v.is_empty(),
            ProtoFieldValue::Bytes(v) => v.is_empty(),
            ProtoFieldValue::Message(_) | ProtoFieldValue::Repeated(_) => false,
        }
    }
}

/// A protobuf message instance.
///
/// Contains the message type name, field values and the schema descriptor
/// the instance conforms to.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoMessage {
    /// Message type name (e.g., "mypackage.MyMessage")
    pub message_type: String,
    /// Field values by field name
    pub fields: HashMap<String, ProtoFieldValue>,
    /// Schema reference for field introspection
    pub descriptor: ProtoMessageDescriptor,
}

impl ProtoMessage {
    /// An instance with no field set.
    pub fn empty(descriptor: &ProtoMessageDescriptor) -> Self {
        Self {
            message_type: descriptor.name.clone(),
            fields: HashMap::new(),
            descriptor: descriptor.clone(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&ProtoFieldValue> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: ProtoFieldValue) {
        self.fields.insert(field.into(), value);
    }

    /// Append to a repeated field, creating the list on first use.
    pub fn push(&mut self, field: impl Into<String>, value: ProtoFieldValue) {
        let entry = self
            .fields
            .entry(field.into())
            .or_insert_with(|| ProtoFieldValue::Repeated(Vec::new()));
        match entry {
            ProtoFieldValue::Repeated(values) => values.push(value),
            other => *other = ProtoFieldValue::Repeated(vec![value]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

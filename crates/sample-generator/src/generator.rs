//! Message synthesizer producing fully-populated sample instances.

use crate::generators::{canonical_value, generate_timestamp, is_timestamp, TimestampSource};
use proto_types::{
    ProtoFieldDescriptor, ProtoFieldValue, ProtoMessage, ProtoMessageDescriptor, ProtoSchema,
    ProtoType,
};

/// Error type for synthesizer operations.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Requested message type is not in the schema
    #[error("Message type not found: {0}")]
    TypeNotFound(String),

    /// A field refers to a message or enum the schema does not define
    #[error("Field {field} refers to unknown type {type_name}")]
    UnresolvedType { field: String, type_name: String },

    #[error("Invalid recursion policy: {0}")]
    InvalidPolicy(String),
}

/// Bound on how often one message type may be expanded along a single path
/// of nested fields.
///
/// When a nested field would expand a type that has already been expanded
/// `max_expansions` times on the current path, the field instead receives an
/// empty instance of that type. With the default of 1, `Node { repeated Node
/// children }` becomes `Node { children: [Node {}] }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecursionPolicy {
    max_expansions: usize,
}

impl RecursionPolicy {
    pub const DEFAULT_MAX_EXPANSIONS: usize = 1;

    pub fn new(max_expansions: usize) -> Result<Self, GeneratorError> {
        if max_expansions == 0 {
            return Err(GeneratorError::InvalidPolicy(
                "max_expansions must be at least 1".to_string(),
            ));
        }
        Ok(Self { max_expansions })
    }

    pub fn max_expansions(&self) -> usize {
        self.max_expansions
    }

    /// Whether a type already expanded `expansions` times on the path may be
    /// expanded again.
    pub fn allows(&self, expansions: usize) -> bool {
        expansions < self.max_expansions
    }
}

impl Default for RecursionPolicy {
    fn default() -> Self {
        Self {
            max_expansions: Self::DEFAULT_MAX_EXPANSIONS,
        }
    }
}

/// Message types currently being expanded, outermost first.
///
/// Owned by a single `synthesize` call.
#[derive(Debug, Default)]
pub struct ExpansionPath {
    stack: Vec<String>,
}

impl ExpansionPath {
    fn enter(&mut self, message_type: &str) {
        self.stack.push(message_type.to_string());
    }

    fn leave(&mut self) {
        self.stack.pop();
    }

    /// How many times `message_type` appears on the path.
    pub fn expansions_of(&self, message_type: &str) -> usize {
        self.stack.iter().filter(|t| *t == message_type).count()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Synthesizes sample instances of message types from a schema.
///
/// Every field is populated in declaration order:
/// - scalars take the canonical value for their kind
/// - enums take their first declared value
/// - nested messages are synthesized recursively, bounded by the
///   [`RecursionPolicy`]
/// - repeated fields hold exactly one element
///
/// Output is deterministic except for `google.protobuf.Timestamp`, which
/// reads the configured [`TimestampSource`] (the wall clock by default).
pub struct MessageSynthesizer<'a> {
    /// Catalog that every type reference is resolved against
    schema: &'a ProtoSchema,
    policy: RecursionPolicy,
    clock: TimestampSource,
}

impl<'a> MessageSynthesizer<'a> {
    pub fn new(schema: &'a ProtoSchema) -> Self {
        Self {
            schema,
            policy: RecursionPolicy::default(),
            clock: TimestampSource::default(),
        }
    }

    pub fn with_recursion_policy(mut self, policy: RecursionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: TimestampSource) -> Self {
        self.clock = clock;
        self
    }

    /// Synthesize an instance of the message with fully-qualified name `name`.
    pub fn synthesize_by_name(&self, name: &str) -> Result<ProtoMessage, GeneratorError> {
        let descriptor = self
            .schema
            .get_message(name)
            .ok_or_else(|| GeneratorError::TypeNotFound(name.to_string()))?;
        self.synthesize(descriptor)
    }

    /// Synthesize a fully-populated instance of `descriptor`.
    pub fn synthesize(
        &self,
        descriptor: &ProtoMessageDescriptor,
    ) -> Result<ProtoMessage, GeneratorError> {
        let mut path = ExpansionPath::default();
        self.synthesize_message(descriptor, &mut path)
    }

    fn synthesize_message(
        &self,
        descriptor: &ProtoMessageDescriptor,
        path: &mut ExpansionPath,
    ) -> Result<ProtoMessage, GeneratorError> {
        tracing::debug!(depth = path.depth(), "{}", descriptor.short_name());

        if is_timestamp(descriptor) {
            return Ok(generate_timestamp(descriptor, &self.clock));
        }

        path.enter(&descriptor.name);
        let message = self.populate_fields(descriptor, path);
        path.leave();
        message
    }

    fn populate_fields(
        &self,
        descriptor: &ProtoMessageDescriptor,
        path: &mut ExpansionPath,
    ) -> Result<ProtoMessage, GeneratorError> {
        let mut message = ProtoMessage::empty(descriptor);

        for field in populated_fields(descriptor) {
            let value = self.synthesize_value(descriptor, field, path)?;
            if field.is_repeated() {
                message.push(field.name.clone(), value);
            } else {
                message.set(field.name.clone(), value);
            }
        }

        Ok(message)
    }

    fn synthesize_value(
        &self,
        owner: &ProtoMessageDescriptor,
        field: &ProtoFieldDescriptor,
        path: &mut ExpansionPath,
    ) -> Result<ProtoFieldValue, GeneratorError> {
        let unresolved = |type_name: &str| GeneratorError::UnresolvedType {
            field: format!("{}.{}", owner.name, field.name),
            type_name: type_name.to_string(),
        };

        match &field.field_type {
            ProtoType::Enum(type_name) => {
                let enum_desc = self
                    .schema
                    .get_enum(type_name)
                    .ok_or_else(|| unresolved(type_name))?;
                // An enum without values is a malformed schema; fall back to 0
                let number = enum_desc.first_value().map(|v| v.number).unwrap_or(0);
                Ok(ProtoFieldValue::Enum(number))
            }
            ProtoType::Message(type_name) => {
                let nested = self
                    .schema
                    .get_message(type_name)
                    .ok_or_else(|| unresolved(type_name))?;

                if !self.policy.allows(path.expansions_of(&nested.name)) {
                    tracing::debug!(
                        "Recursion bound reached at {}.{}, using an empty {}",
                        owner.name,
                        field.name,
                        nested.name
                    );
                    return Ok(ProtoFieldValue::Message(Box::new(ProtoMessage::empty(
                        nested,
                    ))));
                }

                let instance = self.synthesize_message(nested, path)?;
                Ok(ProtoFieldValue::Message(Box::new(instance)))
            }
            scalar => Ok(canonical_value(scalar)),
        }
    }
}

/// Fields to populate, in declaration order.
///
/// Only one member of a oneof can hold a value. Setting the members one
/// after another leaves the last declared one set, so only that member is
/// populated.
fn populated_fields(
    descriptor: &ProtoMessageDescriptor,
) -> impl Iterator<Item = &ProtoFieldDescriptor> {
    let fields = &descriptor.fields;
    fields.iter().enumerate().filter_map(move |(i, field)| {
        let superseded = field.oneof_index.is_some_and(|oneof| {
            fields[i + 1..]
                .iter()
                .any(|later| later.oneof_index == Some(oneof))
        });
        (!superseded).then_some(field)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::WELL_KNOWN_TIMESTAMP;
    use chrono::{TimeZone, Utc};
    use proto_types::{ProtoEnumDescriptor, ProtoEnumValue};

    fn insert(schema: &mut ProtoSchema, descriptor: ProtoMessageDescriptor) {
        schema.messages.insert(descriptor.name.clone(), descriptor);
    }

    fn msg_field(name: &str, number: u32, type_name: &str) -> ProtoFieldDescriptor {
        ProtoFieldDescriptor::new(name, number, ProtoType::Message(type_name.to_string()))
    }

    fn person_schema() -> ProtoSchema {
        let mut schema = ProtoSchema::new();
        insert(
            &mut schema,
            ProtoMessageDescriptor::new(
                "demo.Address",
                vec![ProtoFieldDescriptor::new("city", 1, ProtoType::String)],
            ),
        );
        insert(
            &mut schema,
            ProtoMessageDescriptor::new(
                "demo.Person",
                vec![
                    ProtoFieldDescriptor::new("name", 1, ProtoType::String),
                    ProtoFieldDescriptor::new("age", 2, ProtoType::Int32),
                    ProtoFieldDescriptor::new("emails", 3, ProtoType::String).repeated(),
                    msg_field("home", 4, "demo.Address"),
                    ProtoFieldDescriptor::new("status", 5, ProtoType::Enum("demo.Status".into())),
                ],
            ),
        );
        schema.enums.insert(
            "demo.Status".to_string(),
            ProtoEnumDescriptor {
                name: "demo.Status".to_string(),
                values: vec![
                    ProtoEnumValue {
                        name: "STATUS_ACTIVE".to_string(),
                        number: 3,
                    },
                    ProtoEnumValue {
                        name: "STATUS_GONE".to_string(),
                        number: 0,
                    },
                ],
            },
        );
        schema
    }

    fn nested<'m>(msg: &'m ProtoMessage, field: &str) -> &'m ProtoMessage {
        match msg.get(field) {
            Some(ProtoFieldValue::Message(inner)) => inner,
            other => panic!("Expected message in {field}, got {other:?}"),
        }
    }

    fn only_element<'m>(msg: &'m ProtoMessage, field: &str) -> &'m ProtoFieldValue {
        match msg.get(field) {
            Some(ProtoFieldValue::Repeated(values)) => {
                assert_eq!(values.len(), 1, "{field} should hold exactly one element");
                &values[0]
            }
            other => panic!("Expected list in {field}, got {other:?}"),
        }
    }

    #[test]
    fn test_person_scenario() {
        let schema = person_schema();
        let person = MessageSynthesizer::new(&schema)
            .synthesize_by_name("demo.Person")
            .unwrap();

        assert_eq!(person.message_type, "demo.Person");
        assert_eq!(
            person.get("name"),
            Some(&ProtoFieldValue::String("Lorem ipsum".into()))
        );
        assert_eq!(person.get("age"), Some(&ProtoFieldValue::Int32(42)));
        assert_eq!(
            only_element(&person, "emails"),
            &ProtoFieldValue::String("Lorem ipsum".into())
        );
        assert_eq!(
            nested(&person, "home").get("city"),
            Some(&ProtoFieldValue::String("Lorem ipsum".into()))
        );
    }

    #[test]
    fn test_enum_takes_first_declared_value() {
        let schema = person_schema();
        let person = MessageSynthesizer::new(&schema)
            .synthesize_by_name("demo.Person")
            .unwrap();
        // First declared, not lowest numbered
        assert_eq!(person.get("status"), Some(&ProtoFieldValue::Enum(3)));
    }

    #[test]
    fn test_every_field_is_set() {
        let schema = person_schema();
        let person = MessageSynthesizer::new(&schema)
            .synthesize_by_name("demo.Person")
            .unwrap();
        for field in &person.descriptor.fields {
            assert!(person.get(&field.name).is_some(), "{} unset", field.name);
        }
    }

    #[test]
    fn test_every_scalar_kind_synthesizes() {
        let kinds = [
            ProtoType::Double,
            ProtoType::Float,
            ProtoType::Int32,
            ProtoType::Int64,
            ProtoType::Uint32,
            ProtoType::Uint64,
            ProtoType::Sint32,
            ProtoType::Sint64,
            ProtoType::Fixed32,
            ProtoType::Fixed64,
            ProtoType::Sfixed32,
            ProtoType::Sfixed64,
            ProtoType::Bool,
            ProtoType::String,
            ProtoType::Bytes,
        ];
        let fields = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| ProtoFieldDescriptor::new(format!("f{i}"), i as u32 + 1, kind.clone()))
            .collect();
        let mut schema = ProtoSchema::new();
        insert(&mut schema, ProtoMessageDescriptor::new("demo.Scalars", fields));

        let scalars = MessageSynthesizer::new(&schema)
            .synthesize_by_name("demo.Scalars")
            .unwrap();
        for (i, kind) in kinds.iter().enumerate() {
            assert_eq!(
                scalars.get(&format!("f{i}")),
                Some(&canonical_value(kind)),
                "{kind}"
            );
        }
    }

    #[test]
    fn test_unknown_type() {
        let schema = person_schema();
        let err = MessageSynthesizer::new(&schema)
            .synthesize_by_name("demo.Nope")
            .unwrap_err();
        assert!(matches!(err, GeneratorError::TypeNotFound(_)));
    }

    fn node_schema() -> ProtoSchema {
        let mut schema = ProtoSchema::new();
        insert(
            &mut schema,
            ProtoMessageDescriptor::new(
                "demo.Node",
                vec![
                    ProtoFieldDescriptor::new("id", 1, ProtoType::Int32),
                    msg_field("children", 2, "demo.Node").repeated(),
                ],
            ),
        );
        schema
    }

    #[test]
    fn test_self_reference_terminates_at_default_bound() {
        let schema = node_schema();
        let node = MessageSynthesizer::new(&schema)
            .synthesize_by_name("demo.Node")
            .unwrap();

        assert_eq!(node.get("id"), Some(&ProtoFieldValue::Int32(42)));
        let ProtoFieldValue::Message(child) = only_element(&node, "children") else {
            panic!("Expected a Node child");
        };
        assert_eq!(child.message_type, "demo.Node");
        assert!(child.is_empty());
    }

    #[test]
    fn test_higher_bound_unrolls_deeper() {
        let schema = node_schema();
        let node = MessageSynthesizer::new(&schema)
            .with_recursion_policy(RecursionPolicy::new(3).unwrap())
            .synthesize_by_name("demo.Node")
            .unwrap();

        let mut current = &node;
        for _ in 0..2 {
            let ProtoFieldValue::Message(child) = only_element(current, "children") else {
                panic!("Expected a Node child");
            };
            assert_eq!(child.get("id"), Some(&ProtoFieldValue::Int32(42)));
            current = child;
        }
        let ProtoFieldValue::Message(leaf) = only_element(current, "children") else {
            panic!("Expected a Node child");
        };
        assert!(leaf.is_empty());
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let mut schema = ProtoSchema::new();
        insert(
            &mut schema,
            ProtoMessageDescriptor::new(
                "demo.A",
                vec![
                    ProtoFieldDescriptor::new("name", 1, ProtoType::String),
                    msg_field("b", 2, "demo.B"),
                ],
            ),
        );
        insert(
            &mut schema,
            ProtoMessageDescriptor::new(
                "demo.B",
                vec![
                    ProtoFieldDescriptor::new("weight", 1, ProtoType::Double),
                    msg_field("a", 2, "demo.A"),
                ],
            ),
        );

        let a = MessageSynthesizer::new(&schema)
            .synthesize_by_name("demo.A")
            .unwrap();
        let b = nested(&a, "b");
        assert_eq!(b.get("weight"), Some(&ProtoFieldValue::Double(3.141592653)));
        let inner_a = nested(b, "a");
        assert_eq!(inner_a.message_type, "demo.A");
        assert!(inner_a.is_empty());
    }

    #[test]
    fn test_sibling_fields_of_same_type_both_expand() {
        let mut schema = person_schema();
        insert(
            &mut schema,
            ProtoMessageDescriptor::new(
                "demo.Move",
                vec![msg_field("from", 1, "demo.Address"), msg_field("to", 2, "demo.Address")],
            ),
        );

        let mv = MessageSynthesizer::new(&schema)
            .synthesize_by_name("demo.Move")
            .unwrap();
        assert!(!nested(&mv, "from").is_empty());
        assert!(!nested(&mv, "to").is_empty());
    }

    #[test]
    fn test_zero_bound_is_rejected() {
        assert!(matches!(
            RecursionPolicy::new(0),
            Err(GeneratorError::InvalidPolicy(_))
        ));
        assert_eq!(RecursionPolicy::default().max_expansions(), 1);
    }

    #[test]
    fn test_oneof_keeps_last_member() {
        let mut schema = ProtoSchema::new();
        let mut email = ProtoFieldDescriptor::new("email", 2, ProtoType::String);
        email.oneof_index = Some(0);
        let mut phone = ProtoFieldDescriptor::new("phone", 3, ProtoType::String);
        phone.oneof_index = Some(0);
        insert(
            &mut schema,
            ProtoMessageDescriptor::new(
                "demo.Contact",
                vec![ProtoFieldDescriptor::new("id", 1, ProtoType::Int64), email, phone],
            ),
        );

        let contact = MessageSynthesizer::new(&schema)
            .synthesize_by_name("demo.Contact")
            .unwrap();
        assert!(contact.get("id").is_some());
        assert!(contact.get("email").is_none());
        assert!(contact.get("phone").is_some());
    }

    #[test]
    fn test_timestamp_is_special_cased() {
        let mut schema = ProtoSchema::new();
        insert(
            &mut schema,
            ProtoMessageDescriptor::new(
                WELL_KNOWN_TIMESTAMP,
                vec![
                    ProtoFieldDescriptor::new("seconds", 1, ProtoType::Int64),
                    ProtoFieldDescriptor::new("nanos", 2, ProtoType::Int32),
                ],
            ),
        );
        insert(
            &mut schema,
            ProtoMessageDescriptor::new(
                "demo.Event",
                vec![msg_field("at", 1, WELL_KNOWN_TIMESTAMP)],
            ),
        );

        let dt = Utc.with_ymd_and_hms(2001, 9, 9, 1, 46, 40).unwrap();
        let event = MessageSynthesizer::new(&schema)
            .with_clock(TimestampSource::Fixed(dt))
            .synthesize_by_name("demo.Event")
            .unwrap();

        let at = nested(&event, "at");
        // Not the canonical 1337 / 42
        assert_eq!(at.get("seconds"), Some(&ProtoFieldValue::Int64(1_000_000_000)));
        assert_eq!(at.get("nanos"), Some(&ProtoFieldValue::Int32(0)));
    }

    #[test]
    fn test_dangling_reference_is_an_error() {
        let mut schema = ProtoSchema::new();
        insert(
            &mut schema,
            ProtoMessageDescriptor::new("demo.Broken", vec![msg_field("x", 1, "demo.Gone")]),
        );

        let err = MessageSynthesizer::new(&schema)
            .synthesize_by_name("demo.Broken")
            .unwrap_err();
        assert!(matches!(err, GeneratorError::UnresolvedType { .. }));
    }

    #[test]
    fn test_empty_enum_does_not_panic() {
        let mut schema = ProtoSchema::new();
        schema.enums.insert(
            "demo.Empty".to_string(),
            ProtoEnumDescriptor {
                name: "demo.Empty".to_string(),
                values: vec![],
            },
        );
        insert(
            &mut schema,
            ProtoMessageDescriptor::new(
                "demo.HasEnum",
                vec![ProtoFieldDescriptor::new("e", 1, ProtoType::Enum("demo.Empty".into()))],
            ),
        );

        let msg = MessageSynthesizer::new(&schema)
            .synthesize_by_name("demo.HasEnum")
            .unwrap();
        assert_eq!(msg.get("e"), Some(&ProtoFieldValue::Enum(0)));
    }
}

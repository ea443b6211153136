//! Schema catalog construction and name resolution.
//!
//! Turns file-level descriptors (as produced by a schema compiler) into a
//! [`ProtoSchema`] keyed by fully-qualified type name, and resolves
//! user-supplied type names against it.

use crate::error::{Result, SchemaError};
use protobuf::descriptor::field_descriptor_proto::{Label, Type};
use protobuf::descriptor::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    FileDescriptorSet,
};
use protobuf::Message;
use proto_types::{
    Cardinality, ProtoEnumDescriptor, ProtoEnumValue, ProtoFieldDescriptor,
    ProtoMessageDescriptor, ProtoSchema, ProtoType,
};
use std::collections::HashSet;
use std::path::Path;

/// Registers file descriptors one at a time and produces a validated schema.
///
/// Every message and enum, nested ones included, is indexed under its
/// fully-qualified name. Field references are checked once all files are in,
/// so files may arrive in any order.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: ProtoSchema,
    files: HashSet<String>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every message and enum declared in `file`.
    pub fn register_file(&mut self, file: &FileDescriptorProto) -> Result<()> {
        let file_name = file.name().to_string();
        if !file_name.is_empty() && !self.files.insert(file_name.clone()) {
            return Err(SchemaError::Registration(format!(
                "File {file_name} is registered twice"
            )));
        }

        let rules = SyntaxRules::for_syntax(file.syntax());

        for enum_type in &file.enum_type {
            self.register_enum(file.package(), enum_type)?;
        }
        for message in &file.message_type {
            self.register_message(file.package(), message, rules)?;
        }

        tracing::debug!(
            "Registered {} ({} messages in catalog)",
            if file_name.is_empty() {
                "<unnamed>"
            } else {
                file_name.as_str()
            },
            self.schema.messages.len()
        );

        Ok(())
    }

    fn register_message(
        &mut self,
        scope: &str,
        message: &DescriptorProto,
        rules: SyntaxRules,
    ) -> Result<()> {
        let full_name = qualify(scope, message.name());

        let mut fields = Vec::with_capacity(message.field.len());
        for field in &message.field {
            fields.push(convert_field(&full_name, field, rules)?);
        }

        if self.is_defined(&full_name) {
            return Err(SchemaError::Registration(format!(
                "Type {full_name} is defined more than once"
            )));
        }
        self.schema.messages.insert(
            full_name.clone(),
            ProtoMessageDescriptor::new(full_name.clone(), fields),
        );

        for enum_type in &message.enum_type {
            self.register_enum(&full_name, enum_type)?;
        }
        for nested in &message.nested_type {
            self.register_message(&full_name, nested, rules)?;
        }

        Ok(())
    }

    fn register_enum(&mut self, scope: &str, enum_type: &EnumDescriptorProto) -> Result<()> {
        let full_name = qualify(scope, enum_type.name());

        if enum_type.value.is_empty() {
            return Err(SchemaError::Registration(format!(
                "Enum {full_name} declares no values"
            )));
        }
        if self.is_defined(&full_name) {
            return Err(SchemaError::Registration(format!(
                "Type {full_name} is defined more than once"
            )));
        }

        let values = enum_type
            .value
            .iter()
            .map(|v| ProtoEnumValue {
                name: v.name().to_string(),
                number: v.number(),
            })
            .collect();

        self.schema.enums.insert(
            full_name.clone(),
            ProtoEnumDescriptor {
                name: full_name,
                values,
            },
        );
        Ok(())
    }

    fn is_defined(&self, full_name: &str) -> bool {
        self.schema.messages.contains_key(full_name) || self.schema.enums.contains_key(full_name)
    }

    /// Check that every field reference resolves and return the schema.
    pub fn finish(self) -> Result<ProtoSchema> {
        for message in self.schema.messages.values() {
            for field in &message.fields {
                let resolved = match &field.field_type {
                    ProtoType::Message(name) => self.schema.messages.contains_key(name),
                    ProtoType::Enum(name) => self.schema.enums.contains_key(name),
                    _ => true,
                };
                if !resolved {
                    return Err(SchemaError::Registration(format!(
                        "Field {}.{} refers to unknown type {}",
                        message.name, field.name, field.field_type
                    )));
                }
            }
        }

        Ok(self.schema)
    }
}

/// Field defaults that depend on the file's syntax.
#[derive(Debug, Clone, Copy)]
struct SyntaxRules {
    /// Repeated scalars are packed unless `[packed = false]`
    packed_by_default: bool,
    /// Singular scalars without `optional` have no presence
    implicit_presence: bool,
}

impl SyntaxRules {
    fn for_syntax(syntax: &str) -> Self {
        Self {
            // proto3 and editions pack repeated scalars unless told otherwise
            packed_by_default: !matches!(syntax, "" | "proto2"),
            implicit_presence: syntax == "proto3",
        }
    }
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

fn convert_field(
    message_name: &str,
    field: &FieldDescriptorProto,
    rules: SyntaxRules,
) -> Result<ProtoFieldDescriptor> {
    let field_name = field.name();
    let number = u32::try_from(field.number())
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            SchemaError::Registration(format!(
                "Field {message_name}.{field_name} has invalid number {}",
                field.number()
            ))
        })?;

    let field_type = parse_field_type(message_name, field)?;

    let cardinality = if field.label() == Label::LABEL_REPEATED {
        Cardinality::Repeated
    } else {
        Cardinality::Singular
    };

    let packed = cardinality == Cardinality::Repeated
        && field_type.is_packable()
        && field
            .options
            .as_ref()
            .and_then(|options| options.packed)
            .unwrap_or(rules.packed_by_default);

    // proto3 `optional` is modeled as a synthetic oneof; it is a plain field here
    let oneof_index = if field.proto3_optional() {
        None
    } else {
        field.oneof_index
    };

    let implicit_presence = rules.implicit_presence
        && cardinality == Cardinality::Singular
        && !field.proto3_optional()
        && field.oneof_index.is_none()
        && !matches!(field_type, ProtoType::Message(_));

    Ok(ProtoFieldDescriptor {
        name: field_name.to_string(),
        number,
        field_type,
        cardinality,
        packed,
        oneof_index,
        implicit_presence,
    })
}

fn parse_field_type(message_name: &str, field: &FieldDescriptorProto) -> Result<ProtoType> {
    let field_type_enum_or_unknown = field.type_.ok_or_else(|| {
        SchemaError::Registration(format!(
            "Field {message_name}.{} is missing its type",
            field.name()
        ))
    })?;

    let field_type_enum = field_type_enum_or_unknown.enum_value().map_err(|raw| {
        SchemaError::Registration(format!(
            "Field {message_name}.{} has unknown type {raw}",
            field.name()
        ))
    })?;

    // Descriptor sets carry fully-qualified references with a leading dot
    let type_reference = || field.type_name().trim_start_matches('.').to_string();

    Ok(match field_type_enum {
        Type::TYPE_DOUBLE => ProtoType::Double,
        Type::TYPE_FLOAT => ProtoType::Float,
        Type::TYPE_INT64 => ProtoType::Int64,
        Type::TYPE_UINT64 => ProtoType::Uint64,
        Type::TYPE_INT32 => ProtoType::Int32,
        Type::TYPE_FIXED64 => ProtoType::Fixed64,
        Type::TYPE_FIXED32 => ProtoType::Fixed32,
        Type::TYPE_BOOL => ProtoType::Bool,
        Type::TYPE_STRING => ProtoType::String,
        Type::TYPE_MESSAGE => ProtoType::Message(type_reference()),
        Type::TYPE_BYTES => ProtoType::Bytes,
        Type::TYPE_UINT32 => ProtoType::Uint32,
        Type::TYPE_ENUM => ProtoType::Enum(type_reference()),
        Type::TYPE_SFIXED32 => ProtoType::Sfixed32,
        Type::TYPE_SFIXED64 => ProtoType::Sfixed64,
        Type::TYPE_SINT32 => ProtoType::Sint32,
        Type::TYPE_SINT64 => ProtoType::Sint64,
        Type::TYPE_GROUP => {
            return Err(SchemaError::Registration(format!(
                "Field {message_name}.{}: TYPE_GROUP is Proto2 syntax only and deprecated hence not supported",
                field.name()
            )))
        }
    })
}

/// Build a schema from already-parsed file descriptors.
pub fn schema_from_files(files: &[FileDescriptorProto]) -> Result<ProtoSchema> {
    let mut builder = SchemaBuilder::new();
    for file in files {
        builder.register_file(file)?;
    }
    builder.finish()
}

/// Build a schema from a descriptor set.
pub fn schema_from_descriptor_set(set: &FileDescriptorSet) -> Result<ProtoSchema> {
    schema_from_files(&set.file)
}

/// Build a schema from a serialized `FileDescriptorSet`.
pub fn schema_from_descriptor_set_bytes(bytes: &[u8]) -> Result<ProtoSchema> {
    let set = FileDescriptorSet::parse_from_bytes(bytes)
        .map_err(|e| SchemaError::DescriptorDecode(e.to_string()))?;
    if set.file.is_empty() {
        return Err(SchemaError::DescriptorDecode(
            "Descriptor set contains no files".to_string(),
        ));
    }
    schema_from_descriptor_set(&set)
}

/// Build a schema from a `FileDescriptorSet` file, e.g. the output of
/// `protoc --descriptor_set_out=... --include_imports`.
pub fn schema_from_descriptor_set_file<P: AsRef<Path>>(path: P) -> Result<ProtoSchema> {
    let bytes = std::fs::read(path.as_ref())?;
    schema_from_descriptor_set_bytes(&bytes)
}

/// Resolve a user-supplied message name.
///
/// An exact fully-qualified match wins. Otherwise the name must equal the
/// trailing dot-separated segments of exactly one message, so `Person` and
/// `v1.Person` both find `acme.v1.Person`, while `bar.X` never matches
/// `foo.barbaz.X`.
pub fn resolve_message<'a>(
    schema: &'a ProtoSchema,
    name: &str,
) -> Result<&'a ProtoMessageDescriptor> {
    let name = name.trim().trim_start_matches('.');
    if name.is_empty() {
        return Err(SchemaError::TypeNotFound(name.to_string()));
    }

    if let Some(descriptor) = schema.get_message(name) {
        return Ok(descriptor);
    }

    let suffix = format!(".{name}");
    let mut candidates: Vec<&ProtoMessageDescriptor> = schema
        .messages
        .values()
        .filter(|descriptor| descriptor.name.ends_with(&suffix))
        .collect();
    candidates.sort_by(|a, b| a.name.cmp(&b.name));

    match candidates.as_slice() {
        [] => Err(SchemaError::TypeNotFound(name.to_string())),
        [single] => Ok(single),
        many => Err(SchemaError::AmbiguousType {
            name: name.to_string(),
            candidates: many.iter().map(|d| d.name.clone()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protobuf::descriptor::{EnumValueDescriptorProto, FieldOptions};
    use protobuf::EnumOrUnknown;

    fn field(name: &str, number: i32, type_: Type) -> FieldDescriptorProto {
        let mut field = FieldDescriptorProto::new();
        field.set_name(name.to_string());
        field.set_number(number);
        field.type_ = Some(EnumOrUnknown::new(type_));
        field.set_label(Label::LABEL_OPTIONAL);
        field
    }

    fn ref_field(name: &str, number: i32, type_: Type, type_name: &str) -> FieldDescriptorProto {
        let mut field = field(name, number, type_);
        field.set_type_name(type_name.to_string());
        field
    }

    fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
        let mut message = DescriptorProto::new();
        message.set_name(name.to_string());
        message.field = fields;
        message
    }

    fn file(name: &str, package: &str, messages: Vec<DescriptorProto>) -> FileDescriptorProto {
        let mut file = FileDescriptorProto::new();
        file.set_name(name.to_string());
        if !package.is_empty() {
            file.set_package(package.to_string());
        }
        file.set_syntax("proto3".to_string());
        file.message_type = messages;
        file
    }

    fn status_enum(values: &[(&str, i32)]) -> EnumDescriptorProto {
        let mut status = EnumDescriptorProto::new();
        status.set_name("Status".to_string());
        for (name, number) in values {
            let mut value = EnumValueDescriptorProto::new();
            value.set_name(name.to_string());
            value.set_number(*number);
            status.value.push(value);
        }
        status
    }

    #[test]
    fn test_register_nested_types() {
        let mut outer = message(
            "Outer",
            vec![
                ref_field("inner", 1, Type::TYPE_MESSAGE, ".acme.Outer.Inner"),
                ref_field("status", 2, Type::TYPE_ENUM, ".acme.Outer.Status"),
            ],
        );
        outer.nested_type.push(message("Inner", vec![field("id", 1, Type::TYPE_INT32)]));
        outer.enum_type.push(status_enum(&[("UNKNOWN", 0), ("ACTIVE", 1)]));

        let schema = schema_from_files(&[file("outer.proto", "acme", vec![outer])]).unwrap();

        assert_eq!(schema.list_messages(), vec!["acme.Outer", "acme.Outer.Inner"]);
        let outer = schema.get_message("acme.Outer").unwrap();
        assert_eq!(
            outer.get_field("inner").unwrap().field_type,
            ProtoType::Message("acme.Outer.Inner".to_string())
        );
        let status = schema.get_enum("acme.Outer.Status").unwrap();
        assert_eq!(status.first_value().map(|v| v.number), Some(0));
    }

    #[test]
    fn test_repeated_fields_pack_by_syntax() {
        let mut scores = field("scores", 1, Type::TYPE_INT32);
        scores.set_label(Label::LABEL_REPEATED);
        let mut names = field("names", 2, Type::TYPE_STRING);
        names.set_label(Label::LABEL_REPEATED);

        let proto3 = file("a.proto", "a", vec![message("M", vec![scores.clone(), names])]);
        let schema = schema_from_files(&[proto3]).unwrap();
        let m = schema.get_message("a.M").unwrap();
        assert!(m.get_field("scores").unwrap().packed);
        assert!(!m.get_field("names").unwrap().packed);
        assert!(m.get_field("names").unwrap().is_repeated());

        let mut proto2 = file("b.proto", "b", vec![message("M", vec![scores.clone()])]);
        proto2.set_syntax("proto2".to_string());
        let schema = schema_from_files(&[proto2]).unwrap();
        assert!(!schema.get_message("b.M").unwrap().fields[0].packed);

        let mut unpacked = scores;
        let mut options = FieldOptions::new();
        options.set_packed(false);
        unpacked.options = protobuf::MessageField::some(options);
        let schema = schema_from_files(&[file("c.proto", "c", vec![message("M", vec![unpacked])])])
            .unwrap();
        assert!(!schema.get_message("c.M").unwrap().fields[0].packed);
    }

    #[test]
    fn test_proto3_optional_is_not_a_oneof() {
        let mut optional = field("nickname", 1, Type::TYPE_STRING);
        optional.set_oneof_index(0);
        optional.set_proto3_optional(true);
        let mut choice = field("choice", 2, Type::TYPE_STRING);
        choice.set_oneof_index(1);

        let schema =
            schema_from_files(&[file("o.proto", "", vec![message("M", vec![optional, choice])])])
                .unwrap();
        let m = schema.get_message("M").unwrap();
        assert_eq!(m.get_field("nickname").unwrap().oneof_index, None);
        assert_eq!(m.get_field("choice").unwrap().oneof_index, Some(1));
    }

    #[test]
    fn test_implicit_presence_follows_syntax() {
        let plain = field("count", 1, Type::TYPE_INT32);
        let mut optional = field("nickname", 2, Type::TYPE_STRING);
        optional.set_oneof_index(0);
        optional.set_proto3_optional(true);
        let mut choice = field("choice", 3, Type::TYPE_STRING);
        choice.set_oneof_index(1);
        let nested = ref_field("parent", 4, Type::TYPE_MESSAGE, ".p.M");
        let mut tags = field("tags", 5, Type::TYPE_STRING);
        tags.set_label(Label::LABEL_REPEATED);

        let fields = vec![plain, optional, choice, nested, tags];
        let schema =
            schema_from_files(&[file("p.proto", "p", vec![message("M", fields.clone())])])
                .unwrap();
        let m = schema.get_message("p.M").unwrap();
        assert!(m.get_field("count").unwrap().implicit_presence);
        assert!(!m.get_field("nickname").unwrap().implicit_presence);
        assert!(!m.get_field("choice").unwrap().implicit_presence);
        assert!(!m.get_field("parent").unwrap().implicit_presence);
        assert!(!m.get_field("tags").unwrap().implicit_presence);

        let mut proto2 = file("q.proto", "p", vec![message("M", fields)]);
        proto2.set_syntax("proto2".to_string());
        let schema = schema_from_files(&[proto2]).unwrap();
        let m = schema.get_message("p.M").unwrap();
        assert!(m.fields.iter().all(|f| !f.implicit_presence));
    }

    #[test]
    fn test_duplicate_type_is_rejected() {
        let a = file("a.proto", "acme", vec![message("User", vec![])]);
        let b = file("b.proto", "acme", vec![message("User", vec![])]);

        let err = schema_from_files(&[a, b]).unwrap_err();
        assert!(matches!(err, SchemaError::Registration(_)));
        assert!(err.to_string().contains("acme.User"));
    }

    #[test]
    fn test_duplicate_file_is_rejected() {
        let a = file("a.proto", "one", vec![]);
        let b = file("a.proto", "two", vec![]);
        assert!(matches!(
            schema_from_files(&[a, b]),
            Err(SchemaError::Registration(_))
        ));
    }

    #[test]
    fn test_unknown_reference_is_rejected() {
        let m = message(
            "M",
            vec![ref_field("other", 1, Type::TYPE_MESSAGE, ".acme.Missing")],
        );
        let err = schema_from_files(&[file("m.proto", "acme", vec![m])]).unwrap_err();
        assert!(err.to_string().contains("acme.Missing"));
    }

    #[test]
    fn test_empty_enum_is_rejected() {
        let mut f = file("e.proto", "acme", vec![]);
        f.enum_type.push(status_enum(&[]));
        assert!(matches!(
            schema_from_files(&[f]),
            Err(SchemaError::Registration(_))
        ));
    }

    #[test]
    fn test_group_is_rejected() {
        let m = message("M", vec![field("legacy", 1, Type::TYPE_GROUP)]);
        let err = schema_from_files(&[file("g.proto", "", vec![m])]).unwrap_err();
        assert!(err.to_string().contains("TYPE_GROUP"));
    }

    #[test]
    fn test_descriptor_set_bytes_roundtrip() {
        let mut set = FileDescriptorSet::new();
        set.file.push(file(
            "p.proto",
            "acme",
            vec![message("Ping", vec![field("seq", 1, Type::TYPE_UINT64)])],
        ));
        let bytes = set.write_to_bytes().unwrap();

        let schema = schema_from_descriptor_set_bytes(&bytes).unwrap();
        assert!(schema.get_message("acme.Ping").is_some());
    }

    #[test]
    fn test_empty_descriptor_set_is_rejected() {
        assert!(matches!(
            schema_from_descriptor_set_bytes(&[]),
            Err(SchemaError::DescriptorDecode(_))
        ));
        assert!(schema_from_descriptor_set_bytes(&[0xff, 0xff]).is_err());
    }

    fn resolution_schema() -> ProtoSchema {
        schema_from_files(&[
            file("a.proto", "foo.bar", vec![message("X", vec![])]),
            file("b.proto", "foo.barbaz", vec![message("Y", vec![])]),
            file("c.proto", "acme.v1", vec![message("Person", vec![])]),
            file("d.proto", "acme.v2", vec![message("Person", vec![])]),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_exact_name() {
        let schema = resolution_schema();
        assert_eq!(resolve_message(&schema, "foo.bar.X").unwrap().name, "foo.bar.X");
        assert_eq!(resolve_message(&schema, ".foo.bar.X").unwrap().name, "foo.bar.X");
        assert_eq!(
            resolve_message(&schema, "acme.v2.Person").unwrap().name,
            "acme.v2.Person"
        );
    }

    #[test]
    fn test_resolve_by_trailing_segments() {
        let schema = resolution_schema();
        assert_eq!(resolve_message(&schema, "X").unwrap().name, "foo.bar.X");
        assert_eq!(resolve_message(&schema, "bar.X").unwrap().name, "foo.bar.X");
        assert_eq!(
            resolve_message(&schema, "v1.Person").unwrap().name,
            "acme.v1.Person"
        );
    }

    #[test]
    fn test_resolve_does_not_match_package_substrings() {
        let schema = resolution_schema();
        // foo.bar is a prefix of foo.barbaz, but Y lives only in foo.barbaz
        let err = resolve_message(&schema, "foo.bar.Y").unwrap_err();
        assert!(matches!(err, SchemaError::TypeNotFound(_)));
        let err = resolve_message(&schema, "ar.X").unwrap_err();
        assert!(matches!(err, SchemaError::TypeNotFound(_)));
    }

    #[test]
    fn test_resolve_ambiguous_short_name() {
        let schema = resolution_schema();
        match resolve_message(&schema, "Person") {
            Err(SchemaError::AmbiguousType { candidates, .. }) => {
                assert_eq!(candidates, vec!["acme.v1.Person", "acme.v2.Person"]);
            }
            other => panic!("Expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_missing_name() {
        let schema = resolution_schema();
        let err = resolve_message(&schema, "Nope").unwrap_err();
        assert!(err.is_lookup_failure());
        assert!(resolve_message(&schema, "").unwrap_err().is_lookup_failure());
    }
}

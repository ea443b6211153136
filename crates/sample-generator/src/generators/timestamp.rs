//! `google.protobuf.Timestamp` values.

use chrono::{DateTime, Utc};
use proto_types::{ProtoFieldValue, ProtoMessage, ProtoMessageDescriptor, ProtoType};

/// Fully-qualified name of the well-known timestamp type.
pub const WELL_KNOWN_TIMESTAMP: &str = "google.protobuf.Timestamp";

/// Where timestamp values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampSource {
    /// The wall clock at the moment of synthesis.
    ///
    /// This is NOT deterministic - each call returns the current time. It is
    /// the only value the synthesizer does not take from the canonical table.
    #[default]
    Now,
    /// A pinned instant, for reproducible fixtures.
    Fixed(DateTime<Utc>),
}

impl TimestampSource {
    pub fn instant(&self) -> DateTime<Utc> {
        match self {
            TimestampSource::Now => Utc::now(),
            TimestampSource::Fixed(dt) => *dt,
        }
    }
}

/// Whether `descriptor` is the well-known timestamp type.
pub fn is_timestamp(descriptor: &ProtoMessageDescriptor) -> bool {
    descriptor.name == WELL_KNOWN_TIMESTAMP
}

/// Build a Timestamp instance for the source's current instant.
///
/// Sets `seconds` and `nanos`; any other field the descriptor may declare is
/// left unset.
pub fn generate_timestamp(
    descriptor: &ProtoMessageDescriptor,
    source: &TimestampSource,
) -> ProtoMessage {
    let instant = source.instant();
    let mut message = ProtoMessage::empty(descriptor);

    if let Some(field) = descriptor.get_field("seconds") {
        if field.field_type == ProtoType::Int64 {
            message.set("seconds", ProtoFieldValue::Int64(instant.timestamp()));
        }
    }
    if let Some(field) = descriptor.get_field("nanos") {
        if field.field_type == ProtoType::Int32 {
            message.set(
                "nanos",
                ProtoFieldValue::Int32(instant.timestamp_subsec_nanos() as i32),
            );
        }
    }

    message
}

/// Parse an RFC 3339 instant (e.g. "2024-06-15T12:30:45Z").
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s.trim()).map(|dt| dt.with_timezone(&Utc))
}

//! Value sources for individual fields.
//!
//! Scalar fields take their value from the canonical table; the timestamp
//! well-known type takes its value from a clock.

pub mod canonical;
pub mod timestamp;

pub use canonical::canonical_value;
pub use timestamp::{
    generate_timestamp, is_timestamp, parse_instant, TimestampSource, WELL_KNOWN_TIMESTAMP,
};

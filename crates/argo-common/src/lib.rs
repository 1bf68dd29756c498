//! Common types and utilities shared across all argo-profiles crates.

pub mod field;
pub mod metadata;
pub mod record;
pub mod time;

pub use field::CanonicalField;
pub use metadata::{DatasetMetadata, MetadataValue, TIME_END_KEY, TIME_START_KEY};
pub use record::{MeasurementRecord, SourcedRecord, Timestamped};
pub use time::{format_timestamp, parse_timestamp, TimeParseError};

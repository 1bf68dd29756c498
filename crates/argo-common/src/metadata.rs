//! Per-dataset descriptive metadata.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::field::CanonicalField;
use crate::time::parse_timestamp;

/// Key of the earliest non-null record time.
pub const TIME_START_KEY: &str = "time_start";
/// Key of the latest non-null record time.
pub const TIME_END_KEY: &str = "time_end";

/// A metadata value: either a stringified attribute or a computed number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Number(f64),
    Text(String),
}

impl MetadataValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Number(n) => Some(*n),
            MetadataValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            MetadataValue::Number(_) => None,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Number(n) => write!(f, "{}", n),
            MetadataValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Number(value)
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

/// Flat key/value document describing one dataset.
///
/// Raw attributes come first in file order, followed by computed keys
/// (`{field}_min`, `{field}_max`, `time_start`, `time_end`). A computed key
/// is present only if at least one valid reading backed it. Serializes as a
/// plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetMetadata {
    fields: IndexMap<String, MetadataValue>,
}

impl DatasetMetadata {
    pub fn from_fields(fields: IndexMap<String, MetadataValue>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Observed (min, max) for a ranged field, if any reading existed.
    pub fn range(&self, field: CanonicalField) -> Option<(f64, f64)> {
        let min = self.get(&field.min_key())?.as_f64()?;
        let max = self.get(&field.max_key())?.as_f64()?;
        Some((min, max))
    }

    /// Earliest and latest record time, if any record carried one.
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = parse_timestamp(self.get(TIME_START_KEY)?.as_str()?).ok()?;
        let end = parse_timestamp(self.get(TIME_END_KEY)?.as_str()?).ok()?;
        Some((start, end))
    }

    /// Text form of a value, whatever its kind.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> DatasetMetadata {
        let mut fields = IndexMap::new();
        fields.insert("title".to_string(), MetadataValue::from("Argo float"));
        fields.insert("temperature_min".to_string(), MetadataValue::from(3.1));
        fields.insert("temperature_max".to_string(), MetadataValue::from(7.2));
        fields.insert(TIME_START_KEY.to_string(), MetadataValue::from("2025-08-01T00:00:00Z"));
        fields.insert(TIME_END_KEY.to_string(), MetadataValue::from("2025-08-03T12:00:00Z"));
        DatasetMetadata::from_fields(fields)
    }

    #[test]
    fn test_range_lookup() {
        let metadata = sample();
        assert_eq!(metadata.range(CanonicalField::Temperature), Some((3.1, 7.2)));
        assert_eq!(metadata.range(CanonicalField::Salinity), None);
    }

    #[test]
    fn test_time_span() {
        let (start, end) = sample().time_span().unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 8, 3, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_serializes_as_flat_object_in_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.starts_with(r#"{"title":"Argo float","temperature_min":3.1"#));

        let parsed: DatasetMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample());
    }
}

//! Metadata aggregation: one descriptive record per dataset.

use argo_common::{
    format_timestamp, CanonicalField, DatasetMetadata, MeasurementRecord, MetadataValue,
    TIME_END_KEY, TIME_START_KEY,
};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use netcdf_parser::AttrValue;

use crate::extractor::ProfilePositions;

/// Running min/max over finite values.
#[derive(Debug, Clone, Copy)]
struct Span<T> {
    bounds: Option<(T, T)>,
}

impl<T> Default for Span<T> {
    fn default() -> Self {
        Self { bounds: None }
    }
}

impl<T: PartialOrd + Copy> Span<T> {
    fn add(&mut self, value: T) {
        self.bounds = Some(match self.bounds {
            None => (value, value),
            Some((lo, hi)) => (
                if value < lo { value } else { lo },
                if value > hi { value } else { hi },
            ),
        });
    }
}

fn field_value(record: &MeasurementRecord, field: CanonicalField) -> Option<f64> {
    match field {
        CanonicalField::Temperature => Some(record.temperature),
        CanonicalField::Pressure => Some(record.pressure),
        CanonicalField::Salinity => record.salinity,
        _ => None,
    }
}

/// Build the metadata record of a dataset.
///
/// Raw attributes are copied first, stringified, in their original order.
/// Computed keys follow and are only present when at least one value backs
/// them. An empty record sequence yields the raw attributes alone.
pub fn aggregate_metadata(
    attributes: &[(String, AttrValue)],
    records: &[MeasurementRecord],
    positions: Option<&ProfilePositions>,
) -> DatasetMetadata {
    let mut fields: IndexMap<String, MetadataValue> = attributes
        .iter()
        .map(|(name, value)| (name.clone(), MetadataValue::Text(value.to_string())))
        .collect();

    if records.is_empty() {
        return DatasetMetadata::from_fields(fields);
    }

    for field in CanonicalField::RANGED {
        let mut span = Span::default();
        for value in records.iter().filter_map(|r| field_value(r, field)) {
            if value.is_finite() {
                span.add(value);
            }
        }
        insert_span(&mut fields, field, span);
    }

    if let Some(positions) = positions {
        let mut latitude = Span::default();
        let mut longitude = Span::default();
        let mut last_profile = None;
        for record in records {
            // Records are grouped by profile.
            if last_profile == Some(record.profile_id) {
                continue;
            }
            last_profile = Some(record.profile_id);
            if let Some((lat, lon)) = positions.position(record.profile_id) {
                latitude.add(lat);
                longitude.add(lon);
            }
        }
        insert_span(&mut fields, CanonicalField::Latitude, latitude);
        insert_span(&mut fields, CanonicalField::Longitude, longitude);
    }

    let mut time: Span<DateTime<Utc>> = Span::default();
    for t in records.iter().filter_map(|r| r.time) {
        time.add(t);
    }
    if let Some((start, end)) = time.bounds {
        fields.insert(TIME_START_KEY.to_string(), format_timestamp(&start).into());
        fields.insert(TIME_END_KEY.to_string(), format_timestamp(&end).into());
    }

    DatasetMetadata::from_fields(fields)
}

fn insert_span(
    fields: &mut IndexMap<String, MetadataValue>,
    field: CanonicalField,
    span: Span<f64>,
) {
    if let Some((min, max)) = span.bounds {
        fields.insert(field.min_key(), MetadataValue::Number(min));
        fields.insert(field.max_key(), MetadataValue::Number(max));
    }
}

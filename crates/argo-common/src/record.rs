//! Flat measurement records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One valid reading at a (profile, depth level) cell.
///
/// Only constructed when both pressure and temperature are finite;
/// salinity and time are independently optional. Field order matches the
/// canonical column order of the output table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub profile_id: u32,
    pub depth_level: u32,
    pub time: Option<DateTime<Utc>>,
    pub pressure: f64,
    pub temperature: f64,
    pub salinity: Option<f64>,
}

impl MeasurementRecord {
    /// Stable identity of the row within its dataset.
    pub fn key(&self) -> (u32, u32) {
        (self.profile_id, self.depth_level)
    }
}

/// A record tagged with the dataset it was extracted from.
///
/// Used once records of many datasets are merged for windowing.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedRecord {
    pub dataset: Arc<str>,
    pub record: MeasurementRecord,
}

impl SourcedRecord {
    pub fn new(dataset: Arc<str>, record: MeasurementRecord) -> Self {
        Self { dataset, record }
    }
}

/// Anything that can be placed on a time axis.
///
/// Rows without a timestamp cannot be windowed and are left out of
/// time-based chunking.
pub trait Timestamped {
    fn timestamp(&self) -> Option<DateTime<Utc>>;
}

impl Timestamped for MeasurementRecord {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.time
    }
}

impl Timestamped for SourcedRecord {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.record.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sourced_record_timestamp() {
        let time = Utc.with_ymd_and_hms(2025, 8, 3, 6, 0, 0).unwrap();
        let record = MeasurementRecord {
            profile_id: 1,
            depth_level: 4,
            time: Some(time),
            pressure: 10.0,
            temperature: 5.0,
            salinity: None,
        };
        let sourced = SourcedRecord::new(Arc::from("20250803_prof.nc"), record);

        assert_eq!(sourced.timestamp(), Some(time));
        assert_eq!(sourced.record.key(), (1, 4));
    }
}

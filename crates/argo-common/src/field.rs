//! Canonical semantic fields.
//!
//! Dataset producers name the same physical quantity differently
//! (`TEMP`, `temperature`, `TEMP_ADJUSTED`, ...). A `CanonicalField`
//! names the quantity itself; mapping it onto a concrete variable name
//! is the resolver's job.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the fixed measurement types a profile dataset can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalField {
    Temperature,
    Pressure,
    Salinity,
    Time,
    Latitude,
    Longitude,
}

impl CanonicalField {
    /// All fields, in a stable order.
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::Temperature,
        CanonicalField::Pressure,
        CanonicalField::Salinity,
        CanonicalField::Time,
        CanonicalField::Latitude,
        CanonicalField::Longitude,
    ];

    /// Fields whose per-dataset min/max is reported in metadata.
    pub const RANGED: [CanonicalField; 3] = [
        CanonicalField::Temperature,
        CanonicalField::Pressure,
        CanonicalField::Salinity,
    ];

    /// Lowercase column/key name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Temperature => "temperature",
            CanonicalField::Pressure => "pressure",
            CanonicalField::Salinity => "salinity",
            CanonicalField::Time => "time",
            CanonicalField::Latitude => "latitude",
            CanonicalField::Longitude => "longitude",
        }
    }

    /// Whether extraction is impossible without this field.
    pub fn is_mandatory(&self) -> bool {
        matches!(self, CanonicalField::Temperature | CanonicalField::Pressure)
    }

    /// Metadata key holding the minimum observed value, e.g. `temperature_min`.
    pub fn min_key(&self) -> String {
        format!("{}_min", self.as_str())
    }

    /// Metadata key holding the maximum observed value, e.g. `temperature_max`.
    pub fn max_key(&self) -> String {
        format!("{}_max", self.as_str())
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_keys() {
        assert_eq!(CanonicalField::Temperature.min_key(), "temperature_min");
        assert_eq!(CanonicalField::Salinity.max_key(), "salinity_max");
    }

    #[test]
    fn test_mandatory_fields() {
        let mandatory: Vec<_> = CanonicalField::ALL
            .iter()
            .filter(|f| f.is_mandatory())
            .collect();
        assert_eq!(
            mandatory,
            vec![&CanonicalField::Temperature, &CanonicalField::Pressure]
        );
    }
}

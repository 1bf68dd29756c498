//! Ingestion configuration: variable alias table and time window settings.

use std::collections::BTreeMap;

use argo_common::CanonicalField;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, Result};

/// Get the default ordered alias list for a canonical field.
///
/// Earlier entries take precedence when a dataset exposes several.
pub fn default_aliases(field: CanonicalField) -> &'static [&'static str] {
    match field {
        CanonicalField::Temperature => &["TEMP", "temp", "TEMPERATURE", "temperature", "TEMP_ADJUSTED"],
        CanonicalField::Pressure => &["PRES", "pres", "PRESSURE", "pressure", "PRES_ADJUSTED"],
        CanonicalField::Salinity => &["PSAL", "psal", "SALINITY", "salinity", "PSAL_ADJUSTED"],
        CanonicalField::Time => &["TIME", "time", "JULD", "juld", "TIME_ADJUSTED"],
        CanonicalField::Latitude => &["LATITUDE", "latitude", "lat", "LAT"],
        CanonicalField::Longitude => &["LONGITUDE", "longitude", "lon", "LON"],
    }
}

/// Fixed, ordered alias lists per canonical field.
///
/// Deserializes from a map of field name to alias list; fields left out
/// keep their default aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<CanonicalField, Vec<String>>")]
#[serde(into = "BTreeMap<CanonicalField, Vec<String>>")]
pub struct AliasTable {
    aliases: BTreeMap<CanonicalField, Vec<String>>,
}

impl AliasTable {
    /// Ordered aliases for a field.
    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        self.aliases.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace the alias list of one field.
    pub fn with_aliases<I, S>(mut self, field: CanonicalField, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases
            .insert(field, aliases.into_iter().map(Into::into).collect());
        self
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        let aliases = CanonicalField::ALL
            .iter()
            .map(|&field| {
                let names = default_aliases(field).iter().map(|s| s.to_string()).collect();
                (field, names)
            })
            .collect();
        Self { aliases }
    }
}

impl From<BTreeMap<CanonicalField, Vec<String>>> for AliasTable {
    fn from(overrides: BTreeMap<CanonicalField, Vec<String>>) -> Self {
        overrides
            .into_iter()
            .fold(AliasTable::default(), |table, (field, aliases)| {
                table.with_aliases(field, aliases)
            })
    }
}

impl From<AliasTable> for BTreeMap<CanonicalField, Vec<String>> {
    fn from(table: AliasTable) -> Self {
        table.aliases
    }
}

/// Widest accepted window, 1000 years.
pub const MAX_WINDOW_DAYS: u32 = 365_250;

/// Sliding time window settings, in calendar days.
///
/// Construct through [`WindowConfig::new`] or call [`WindowConfig::validate`]
/// after deserializing: an overlap that is not smaller than the width would
/// never advance the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub width_days: u32,
    pub overlap_days: u32,
}

impl WindowConfig {
    pub fn new(width_days: u32, overlap_days: u32) -> Result<Self> {
        let config = Self {
            width_days,
            overlap_days,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width_days == 0 {
            return Err(IngestionError::InvalidWindow(
                "window width must be at least one day".to_string(),
            ));
        }
        if self.width_days > MAX_WINDOW_DAYS {
            return Err(IngestionError::InvalidWindow(format!(
                "window width ({} days) exceeds {} days",
                self.width_days, MAX_WINDOW_DAYS
            )));
        }
        if self.overlap_days >= self.width_days {
            return Err(IngestionError::InvalidWindow(format!(
                "overlap ({} days) must be smaller than width ({} days)",
                self.overlap_days, self.width_days
            )));
        }
        Ok(())
    }

    pub fn width(&self) -> Duration {
        Duration::days(i64::from(self.width_days))
    }

    /// Distance the window start advances each iteration.
    pub fn step(&self) -> Duration {
        Duration::days(i64::from(self.width_days) - i64::from(self.overlap_days))
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width_days: 5,
            overlap_days: 2,
        }
    }
}

//! Variable resolution: canonical field to dataset variable name.

use argo_common::CanonicalField;
use netcdf_parser::Dataset;
use tracing::debug;

use crate::config::AliasTable;

/// Outcome of resolving one canonical field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(String),
    NotFound,
}

impl Resolution {
    pub fn name(&self) -> Option<&str> {
        match self {
            Resolution::Found(name) => Some(name),
            Resolution::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

/// Return the first alias of `field` present in the dataset.
///
/// Precedence follows the alias list, never the dataset's own variable
/// order.
pub fn resolve<D: Dataset + ?Sized>(
    dataset: &D,
    aliases: &AliasTable,
    field: CanonicalField,
) -> Resolution {
    aliases
        .aliases(field)
        .iter()
        .find(|name| dataset.has_variable(name))
        .map(|name| Resolution::Found(name.clone()))
        .unwrap_or(Resolution::NotFound)
}

/// Resolution of every canonical field for one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVariables {
    pub temperature: Resolution,
    pub pressure: Resolution,
    pub salinity: Resolution,
    pub time: Resolution,
    pub latitude: Resolution,
    pub longitude: Resolution,
}

impl ResolvedVariables {
    pub fn resolve<D: Dataset + ?Sized>(dataset: &D, aliases: &AliasTable) -> Self {
        let resolved = Self {
            temperature: resolve(dataset, aliases, CanonicalField::Temperature),
            pressure: resolve(dataset, aliases, CanonicalField::Pressure),
            salinity: resolve(dataset, aliases, CanonicalField::Salinity),
            time: resolve(dataset, aliases, CanonicalField::Time),
            latitude: resolve(dataset, aliases, CanonicalField::Latitude),
            longitude: resolve(dataset, aliases, CanonicalField::Longitude),
        };
        debug!(
            temperature = ?resolved.temperature.name(),
            pressure = ?resolved.pressure.name(),
            salinity = ?resolved.salinity.name(),
            time = ?resolved.time.name(),
            "Resolved variables"
        );
        resolved
    }

    pub fn get(&self, field: CanonicalField) -> &Resolution {
        match field {
            CanonicalField::Temperature => &self.temperature,
            CanonicalField::Pressure => &self.pressure,
            CanonicalField::Salinity => &self.salinity,
            CanonicalField::Time => &self.time,
            CanonicalField::Latitude => &self.latitude,
            CanonicalField::Longitude => &self.longitude,
        }
    }

    /// Mandatory fields that could not be resolved.
    pub fn missing_mandatory(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|f| f.is_mandatory() && !self.get(*f).is_found())
            .collect()
    }
}

//! Profile extraction: resolved arrays to ordered measurement records.
//!
//! Two temperature ranks are supported:
//!
//! - 1-D: a single profile, one reading per depth level.
//! - 2-D: a profile x depth-level grid.
//!
//! Records come out profile-major, depth-minor. That order is the row
//! order of every table built from them.

use argo_common::{CanonicalField, MeasurementRecord};
use chrono::{DateTime, Utc};
use netcdf_parser::{ArrayData, Dataset};
use tracing::{debug, warn};

use crate::resolver::{Resolution, ResolvedVariables};

/// How an auxiliary array (pressure, salinity) lines up with temperature.
///
/// Decided once per array pair from the shapes alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisLayout {
    /// Same shape as temperature; indexed by (profile, depth).
    PerProfile,
    /// Any other shape; one depth axis shared by every profile.
    SharedDepth,
}

impl AxisLayout {
    pub fn decide(temperature: &ArrayData, auxiliary: &ArrayData) -> Self {
        if temperature.shape() == auxiliary.shape() {
            AxisLayout::PerProfile
        } else {
            AxisLayout::SharedDepth
        }
    }

    /// Finite value at the cell, `None` when missing or out of bounds.
    fn value(self, array: &ArrayData, cell: usize, depth: usize) -> Option<f64> {
        let index = match self {
            AxisLayout::PerProfile => cell,
            AxisLayout::SharedDepth => depth,
        };
        array.flat(index).filter(|v| v.is_finite())
    }
}

/// Result of extracting one dataset.
///
/// Every variant other than `Records` means "no usable data" and carries
/// an empty record sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Records(Vec<MeasurementRecord>),
    MissingVariables(Vec<CanonicalField>),
    UnsupportedRank(usize),
}

impl Extraction {
    pub fn records(&self) -> &[MeasurementRecord] {
        match self {
            Extraction::Records(records) => records,
            _ => &[],
        }
    }

    pub fn into_records(self) -> Vec<MeasurementRecord> {
        match self {
            Extraction::Records(records) => records,
            _ => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

/// Arrays feeding the extractor, already fetched from a dataset.
#[derive(Debug, Clone)]
pub struct ProfileArrays {
    pub temperature: ArrayData,
    pub pressure: ArrayData,
    pub salinity: Option<ArrayData>,
    /// Decoded timestamps, one per profile.
    pub times: Option<Vec<Option<DateTime<Utc>>>>,
}

/// Build records from already-fetched arrays.
pub fn extract_records(arrays: &ProfileArrays) -> Extraction {
    let temperature = &arrays.temperature;
    let pressure_layout = AxisLayout::decide(temperature, &arrays.pressure);
    let salinity_source = arrays
        .salinity
        .as_ref()
        .map(|s| (s, AxisLayout::decide(temperature, s)));

    // A 1-D temperature array is profile 0; cell and depth offsets coincide.
    let (n_profiles, n_depths) = match temperature.shape() {
        &[n_depths] => (1, n_depths),
        &[n_profiles, n_depths] => (n_profiles, n_depths),
        _ => {
            debug!(rank = temperature.rank(), "Unsupported temperature rank");
            return Extraction::UnsupportedRank(temperature.rank());
        }
    };

    let mut records = Vec::with_capacity(n_profiles * n_depths);
    for profile in 0..n_profiles {
        let time = arrays
            .times
            .as_ref()
            .and_then(|times| times.get(profile).copied().flatten());
        for depth in 0..n_depths {
            let cell = profile * n_depths + depth;

            let Some(temp) = temperature.flat(cell).filter(|v| v.is_finite()) else {
                continue;
            };
            let Some(pres) = pressure_layout.value(&arrays.pressure, cell, depth) else {
                continue;
            };
            let salinity =
                salinity_source.and_then(|(array, layout)| layout.value(array, cell, depth));

            records.push(MeasurementRecord {
                profile_id: profile as u32,
                depth_level: depth as u32,
                time,
                pressure: pres,
                temperature: temp,
                salinity,
            });
        }
    }

    Extraction::Records(records)
}

/// Fetch the resolved arrays from a dataset and extract its records.
///
/// Missing mandatory variables yield [`Extraction::MissingVariables`]. A
/// time variable that cannot be decoded leaves every time null.
pub fn extract_profiles<D: Dataset + ?Sized>(
    dataset: &D,
    resolved: &ResolvedVariables,
) -> Extraction {
    let missing = resolved.missing_mandatory();
    if !missing.is_empty() {
        return Extraction::MissingVariables(missing);
    }

    let fetch = |resolution: &Resolution| {
        let name = resolution.name()?;
        match dataset.variable(name) {
            Ok(array) => Some(array),
            Err(e) => {
                warn!(variable = %name, error = %e, "Failed to read variable");
                None
            }
        }
    };

    let (temperature, pressure) = match (fetch(&resolved.temperature), fetch(&resolved.pressure)) {
        (Some(temperature), Some(pressure)) => (temperature, pressure),
        (temperature, pressure) => {
            let mut missing = Vec::new();
            if temperature.is_none() {
                missing.push(CanonicalField::Temperature);
            }
            if pressure.is_none() {
                missing.push(CanonicalField::Pressure);
            }
            return Extraction::MissingVariables(missing);
        }
    };

    let times = resolved.time.name().and_then(|name| match dataset.times(name) {
        Ok(times) => Some(times),
        Err(e) => {
            warn!(variable = %name, error = %e, "Undecodable time variable, times left null");
            None
        }
    });

    extract_records(&ProfileArrays {
        temperature,
        pressure,
        salinity: fetch(&resolved.salinity),
        times,
    })
}

/// Position of each profile, indexed by profile id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePositions {
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
}

impl ProfilePositions {
    pub fn new(latitudes: Vec<f64>, longitudes: Vec<f64>) -> Self {
        Self {
            latitudes,
            longitudes,
        }
    }

    /// Finite (latitude, longitude) of a profile.
    pub fn position(&self, profile_id: u32) -> Option<(f64, f64)> {
        let i = profile_id as usize;
        let lat = self.latitudes.get(i).copied().filter(|v| v.is_finite())?;
        let lon = self.longitudes.get(i).copied().filter(|v| v.is_finite())?;
        Some((lat, lon))
    }
}

/// Read profile positions when both latitude and longitude resolve.
pub fn extract_positions<D: Dataset + ?Sized>(
    dataset: &D,
    resolved: &ResolvedVariables,
) -> Option<ProfilePositions> {
    let lat_name = resolved.latitude.name()?;
    let lon_name = resolved.longitude.name()?;
    let latitudes = dataset.variable(lat_name).ok()?;
    let longitudes = dataset.variable(lon_name).ok()?;
    Some(ProfilePositions::new(
        latitudes.values().to_vec(),
        longitudes.values().to_vec(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AliasTable;
    use chrono::TimeZone;
    use netcdf_parser::MemoryDataset;

    fn arrays(temperature: ArrayData, pressure: ArrayData) -> ProfileArrays {
        ProfileArrays {
            temperature,
            pressure,
            salinity: None,
            times: None,
        }
    }

    #[test]
    fn test_layout_decided_by_full_shape() {
        let grid = ArrayData::grid(vec![vec![0.0; 3]; 2]);
        assert_eq!(AxisLayout::decide(&grid, &grid.clone()), AxisLayout::PerProfile);
        assert_eq!(
            AxisLayout::decide(&grid, &ArrayData::vector(vec![0.0; 3])),
            AxisLayout::SharedDepth
        );
        // Same element count, different shape.
        assert_eq!(
            AxisLayout::decide(&grid, &ArrayData::grid(vec![vec![0.0; 2]; 3])),
            AxisLayout::SharedDepth
        );
    }

    #[test]
    fn test_grid_row_order() {
        let temp = ArrayData::grid(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let pres = ArrayData::grid(vec![vec![10.0, 20.0, 30.0], vec![11.0, 21.0, 31.0]]);
        let records = extract_records(&arrays(temp, pres)).into_records();

        let keys: Vec<_> = records.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
    }

    #[test]
    fn test_per_profile_pressure() {
        let temp = ArrayData::grid(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let pres = ArrayData::grid(vec![vec![10.0, 20.0], vec![15.0, 25.0]]);
        let records = extract_records(&arrays(temp, pres)).into_records();

        let pressures: Vec<_> = records.iter().map(|r| r.pressure).collect();
        assert_eq!(pressures, vec![10.0, 20.0, 15.0, 25.0]);
    }

    #[test]
    fn test_shared_depth_pressure_broadcast() {
        let temp = ArrayData::grid(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let pres = ArrayData::vector(vec![5.0, 50.0, 500.0]);
        let records = extract_records(&arrays(temp, pres)).into_records();

        let pressures: Vec<_> = records.iter().map(|r| r.pressure).collect();
        assert_eq!(pressures, vec![5.0, 50.0, 500.0, 5.0, 50.0, 500.0]);
    }

    #[test]
    fn test_salinity_follows_its_own_layout() {
        let temp = ArrayData::grid(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let pres = ArrayData::grid(vec![vec![10.0, 20.0], vec![15.0, 25.0]]);
        let psal = ArrayData::vector(vec![34.1, 34.9]);
        let extraction = extract_records(&ProfileArrays {
            salinity: Some(psal),
            ..arrays(temp, pres)
        });

        let salinity: Vec<_> = extraction.records().iter().map(|r| r.salinity).collect();
        assert_eq!(salinity, vec![Some(34.1), Some(34.9), Some(34.1), Some(34.9)]);
    }

    #[test]
    fn test_validity_gate() {
        let temp = ArrayData::vector(vec![f64::NAN, 5.0, 5.0]);
        let pres = ArrayData::vector(vec![10.0, f64::NAN, 10.0]);
        let psal = ArrayData::vector(vec![35.0, 35.0, f64::NAN]);
        let extraction = extract_records(&ProfileArrays {
            salinity: Some(psal),
            ..arrays(temp, pres)
        });

        let records = extraction.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].depth_level, 2);
        assert_eq!(records[0].temperature, 5.0);
        assert_eq!(records[0].pressure, 10.0);
        assert_eq!(records[0].salinity, None);
    }

    #[test]
    fn test_single_profile_uses_first_time() {
        let t0 = Utc.with_ymd_and_hms(2025, 8, 3, 6, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 8, 4, 6, 0, 0).unwrap();
        let extraction = extract_records(&ProfileArrays {
            times: Some(vec![Some(t0), Some(t1)]),
            ..arrays(ArrayData::vector(vec![5.0, 6.0]), ArrayData::vector(vec![1.0, 2.0]))
        });

        assert!(extraction
            .records()
            .iter()
            .all(|r| r.profile_id == 0 && r.time == Some(t0)));
    }

    #[test]
    fn test_short_time_array_leaves_later_profiles_null() {
        let t0 = Utc.with_ymd_and_hms(2025, 8, 3, 6, 0, 0).unwrap();
        let temp = ArrayData::grid(vec![vec![1.0], vec![2.0]]);
        let pres = ArrayData::vector(vec![10.0]);
        let extraction = extract_records(&ProfileArrays {
            times: Some(vec![Some(t0)]),
            ..arrays(temp, pres)
        });

        let times: Vec<_> = extraction.records().iter().map(|r| r.time).collect();
        assert_eq!(times, vec![Some(t0), None]);
    }

    #[test]
    fn test_shared_depth_out_of_bounds_drops_row() {
        let temp = ArrayData::grid(vec![vec![1.0, 2.0, 3.0]]);
        let pres = ArrayData::vector(vec![10.0, 20.0]);
        let records = extract_records(&arrays(temp, pres)).into_records();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_unsupported_rank() {
        let temp = ArrayData::new(vec![1, 2, 2], vec![1.0; 4]).unwrap();
        let extraction = extract_records(&arrays(temp, ArrayData::vector(vec![1.0, 2.0])));
        assert_eq!(extraction, Extraction::UnsupportedRank(3));
        assert!(extraction.is_empty());
    }

    #[test]
    fn test_missing_pressure_signalled() {
        let ds = MemoryDataset::new().with_variable("TEMP", ArrayData::vector(vec![5.0]));
        let resolved = ResolvedVariables::resolve(&ds, &AliasTable::default());
        assert_eq!(
            extract_profiles(&ds, &resolved),
            Extraction::MissingVariables(vec![CanonicalField::Pressure])
        );
    }

    #[test]
    fn test_bad_time_units_degrade_to_null() {
        let ds = MemoryDataset::new()
            .with_variable("TEMP", ArrayData::vector(vec![5.0, 6.0]))
            .with_variable("PRES", ArrayData::vector(vec![1.0, 2.0]))
            .with_variable("JULD", ArrayData::vector(vec![27_000.0]))
            .with_variable_attribute("JULD", "units", "days after the launch");
        let resolved = ResolvedVariables::resolve(&ds, &AliasTable::default());

        let extraction = extract_profiles(&ds, &resolved);
        assert_eq!(extraction.records().len(), 2);
        assert!(extraction.records().iter().all(|r| r.time.is_none()));
    }

    #[test]
    fn test_positions() {
        let ds = MemoryDataset::new()
            .with_variable("LATITUDE", ArrayData::vector(vec![-45.2, f64::NAN]))
            .with_variable("LONGITUDE", ArrayData::vector(vec![120.5, 121.0]));
        let resolved = ResolvedVariables::resolve(&ds, &AliasTable::default());

        let positions = extract_positions(&ds, &resolved).unwrap();
        assert_eq!(positions.position(0), Some((-45.2, 120.5)));
        assert_eq!(positions.position(1), None);
        assert_eq!(positions.position(2), None);
    }
}

//! Ready-made in-memory datasets covering common producer layouts.

use netcdf_parser::{ArrayData, MemoryDataset};

use crate::generators::{
    juld_days, pressure_axis, pressure_grid, salinity_at, temperature_grid,
};

/// `units` of the Argo `JULD` variable.
pub const JULD_UNITS: &str = "days since 1950-01-01 00:00:00 UTC";

/// Global attributes carried by Argo profile files.
pub fn argo_attributes(dataset: MemoryDataset) -> MemoryDataset {
    dataset
        .with_attribute("title", "Argo float vertical profile")
        .with_attribute("institution", "CORIOLIS")
        .with_attribute("source", "Argo float")
        .with_attribute("history", "2025-08-05T10:00:00Z creation")
        .with_attribute("references", "http://www.argodatamgt.org/Documentation")
        .with_attribute("user_manual_version", "3.1")
        .with_attribute("Conventions", "Argo-3.1 CF-1.6")
        .with_attribute("featureType", "trajectoryProfile")
}

/// Multi-profile Argo file: 2-D `TEMP`/`PRES`/`PSAL` with per-profile
/// pressure, one `JULD` and one position per profile.
pub fn argo_multi_profile(profiles: usize, depths: usize) -> MemoryDataset {
    let salinity = (0..profiles)
        .map(|_| (0..depths).map(salinity_at).collect())
        .collect();

    argo_attributes(MemoryDataset::new())
        .with_variable("TEMP", ArrayData::grid(temperature_grid(profiles, depths)))
        .with_variable("PRES", ArrayData::grid(pressure_grid(profiles, depths)))
        .with_variable("PSAL", ArrayData::grid(salinity))
        .with_variable("JULD", ArrayData::vector(juld_days(profiles)))
        .with_variable_attribute("JULD", "units", JULD_UNITS)
        .with_variable(
            "LATITUDE",
            ArrayData::vector((0..profiles).map(|p| -45.0 + p as f64 * 0.1).collect()),
        )
        .with_variable(
            "LONGITUDE",
            ArrayData::vector((0..profiles).map(|p| 120.0 + p as f64 * 0.2).collect()),
        )
}

/// Gridded product: lowercase names, 2-D temperature over a shared 1-D
/// pressure axis, no salinity.
pub fn shared_depth_profiles(profiles: usize, depths: usize) -> MemoryDataset {
    MemoryDataset::new()
        .with_attribute("title", "Gridded temperature profiles")
        .with_variable("temperature", ArrayData::grid(temperature_grid(profiles, depths)))
        .with_variable("pressure", ArrayData::vector(pressure_axis(depths)))
        .with_variable("time", ArrayData::vector(juld_days(profiles)))
        .with_variable_attribute("time", "units", JULD_UNITS)
}

/// A single 1-D profile.
pub fn single_profile(depths: usize) -> MemoryDataset {
    let temperature = temperature_grid(1, depths).remove(0);
    argo_attributes(MemoryDataset::new())
        .with_variable("TEMP", ArrayData::vector(temperature))
        .with_variable("PRES", ArrayData::vector(pressure_axis(depths)))
        .with_variable("JULD", ArrayData::vector(juld_days(1)))
        .with_variable_attribute("JULD", "units", JULD_UNITS)
}

/// A file with attributes and a time axis but no temperature or pressure
/// (e.g. a trajectory or technical file).
pub fn missing_measurements() -> MemoryDataset {
    argo_attributes(MemoryDataset::new())
        .with_variable("JULD", ArrayData::vector(juld_days(3)))
        .with_variable_attribute("JULD", "units", JULD_UNITS)
}

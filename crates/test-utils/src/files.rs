//! Small NetCDF files written to disk, for tests of the native reader.
//!
//! The layout mirrors an Argo core profile file:
//! `N_PROF = 2`, `N_LEVELS = 3`, and
//!
//! - `TEMP`, `PRES`: `f64` with `_FillValue = 99999`; `TEMP[0][2]` and
//!   `PRES[1][1]` hold the fill value
//! - `PSAL`: packed `i16` with `scale_factor = 0.001`, `add_offset = 30`
//! - `JULD`: days since 1950 with a `units` attribute
//! - `LATITUDE`, `LONGITUDE`: one position per profile

use std::path::{Path, PathBuf};

use crate::fixtures::JULD_UNITS;
use crate::generators::{juld_days, pressure_at, salinity_at, temperature_at};

/// Fill value used by [`write_argo_netcdf`].
pub const ARGO_FILL_VALUE: f64 = 99999.0;

/// Packing of `PSAL` in [`write_argo_netcdf`].
pub const PSAL_SCALE_FACTOR: f64 = 0.001;
pub const PSAL_ADD_OFFSET: f64 = 30.0;

/// (profile, depth) cells written as fill in `TEMP` and `PRES`.
pub const TEMP_FILL_CELL: (usize, usize) = (0, 2);
pub const PRES_FILL_CELL: (usize, usize) = (1, 1);

const PROFILES: usize = 2;
const LEVELS: usize = 3;

/// Write the two-profile file described above to `dir/name`.
///
/// Non-fill cells follow the generator formulas, so expected values come
/// from [`temperature_at`], [`pressure_at`] and [`salinity_at`].
pub fn write_argo_netcdf(dir: &Path, name: &str) -> Result<PathBuf, netcdf::Error> {
    let path = dir.join(name);
    let mut file = netcdf::create(&path)?;

    file.add_dimension("N_PROF", PROFILES)?;
    file.add_dimension("N_LEVELS", LEVELS)?;

    file.add_attribute("title", "Argo float vertical profile")?;
    file.add_attribute("institution", "CORIOLIS")?;
    file.add_attribute("Conventions", "Argo-3.1 CF-1.6")?;
    file.add_attribute("featureType", "trajectoryProfile")?;

    let temp = fill_grid(temperature_at, TEMP_FILL_CELL);
    let mut var = file.add_variable::<f64>("TEMP", &["N_PROF", "N_LEVELS"])?;
    var.put_attribute("_FillValue", ARGO_FILL_VALUE)?;
    var.put_attribute("units", "degree_Celsius")?;
    var.put_values(&temp, ..)?;

    let pres = fill_grid(|_, d| pressure_at(d), PRES_FILL_CELL);
    let mut var = file.add_variable::<f64>("PRES", &["N_PROF", "N_LEVELS"])?;
    var.put_attribute("_FillValue", ARGO_FILL_VALUE)?;
    var.put_attribute("units", "decibar")?;
    var.put_values(&pres, ..)?;

    let psal: Vec<i16> = (0..PROFILES)
        .flat_map(|_| 0..LEVELS)
        .map(|d| ((salinity_at(d) - PSAL_ADD_OFFSET) / PSAL_SCALE_FACTOR).round() as i16)
        .collect();
    let mut var = file.add_variable::<i16>("PSAL", &["N_PROF", "N_LEVELS"])?;
    var.put_attribute("scale_factor", PSAL_SCALE_FACTOR)?;
    var.put_attribute("add_offset", PSAL_ADD_OFFSET)?;
    var.put_values(&psal, ..)?;

    let mut var = file.add_variable::<f64>("JULD", &["N_PROF"])?;
    var.put_attribute("units", JULD_UNITS)?;
    var.put_values(&juld_days(PROFILES), ..)?;

    let latitudes: Vec<f64> = (0..PROFILES).map(|p| -45.0 + p as f64 * 0.1).collect();
    let mut var = file.add_variable::<f64>("LATITUDE", &["N_PROF"])?;
    var.put_values(&latitudes, ..)?;

    let longitudes: Vec<f64> = (0..PROFILES).map(|p| 120.0 + p as f64 * 0.2).collect();
    let mut var = file.add_variable::<f64>("LONGITUDE", &["N_PROF"])?;
    var.put_values(&longitudes, ..)?;

    Ok(path)
}

/// Row-major `PROFILES x LEVELS` values with one cell replaced by the fill value.
fn fill_grid(value: impl Fn(usize, usize) -> f64, fill: (usize, usize)) -> Vec<f64> {
    (0..PROFILES)
        .flat_map(|p| (0..LEVELS).map(move |d| (p, d)))
        .map(|(p, d)| if (p, d) == fill { ARGO_FILL_VALUE } else { value(p, d) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::temp_test_dir;

    #[test]
    fn test_written_file_reopens() {
        let dir = temp_test_dir();
        let path = write_argo_netcdf(dir.path(), "R6903091_001.nc").unwrap();

        let file = netcdf::open(&path).unwrap();
        assert_eq!(file.dimension("N_PROF").unwrap().len(), 2);
        assert_eq!(file.dimension("N_LEVELS").unwrap().len(), 3);
        assert!(file.variable("PSAL").is_some());
    }
}

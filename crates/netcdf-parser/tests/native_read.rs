//! Reading real NetCDF files written by `test-utils`.

use chrono::Duration;
use netcdf_parser::{AttrValue, Dataset, NetCdfDataset};
use test_utils::{
    assert_approx_eq, base_time, pressure_at, salinity_at, temp_test_dir, temperature_at,
    write_argo_netcdf, PRES_FILL_CELL, TEMP_FILL_CELL,
};

fn open_written() -> NetCdfDataset {
    let dir = temp_test_dir();
    let path = write_argo_netcdf(dir.path(), "R6903091_001.nc").expect("Failed to write profile");
    NetCdfDataset::open(&path).expect("Failed to read profile")
}

#[test]
fn test_fill_values_become_nan() {
    let ds = open_written();

    let temp = ds.variable("TEMP").unwrap();
    assert_eq!(temp.shape(), &[2, 3]);
    for p in 0..2 {
        for d in 0..3 {
            let value = temp.get(&[p, d]).unwrap();
            if (p, d) == TEMP_FILL_CELL {
                assert!(value.is_nan(), "TEMP[{}][{}] should be NaN", p, d);
            } else {
                assert_approx_eq!(value, temperature_at(p, d), 1e-9);
            }
        }
    }

    let pres = ds.variable("PRES").unwrap();
    let (p, d) = PRES_FILL_CELL;
    assert!(pres.get(&[p, d]).unwrap().is_nan());
    assert_approx_eq!(pres.get(&[0, 1]).unwrap(), pressure_at(1), 1e-9);
}

#[test]
fn test_packed_variable_is_unpacked() {
    let ds = open_written();
    let psal = ds.variable("PSAL").unwrap();

    assert_eq!(psal.shape(), &[2, 3]);
    for p in 0..2 {
        for d in 0..3 {
            assert_approx_eq!(psal.get(&[p, d]).unwrap(), salinity_at(d), 1e-6);
        }
    }
}

#[test]
fn test_time_axis_decodes() {
    let ds = open_written();
    let times = ds.times("JULD").unwrap();

    assert_eq!(times, vec![Some(base_time()), Some(base_time() + Duration::days(1))]);
}

#[test]
fn test_attributes_are_converted() {
    let ds = open_written();

    let attrs = ds.attributes();
    let conventions = attrs.iter().find(|(k, _)| k == "Conventions").map(|(_, v)| v);
    assert_eq!(conventions.and_then(AttrValue::as_str), Some("Argo-3.1 CF-1.6"));
    assert_eq!(
        ds.variable_attribute("TEMP", "_FillValue").and_then(|v| v.as_f64()),
        Some(99999.0)
    );
    assert_eq!(
        ds.variable_attribute("PSAL", "scale_factor").and_then(|v| v.as_f64()),
        Some(0.001)
    );
    assert_eq!(
        ds.variable_attribute("JULD", "units").and_then(|v| v.as_str().map(str::to_string)),
        Some("days since 1950-01-01 00:00:00 UTC".to_string())
    );
}

#[test]
fn test_from_bytes_matches_open() {
    let dir = temp_test_dir();
    let path = write_argo_netcdf(dir.path(), "R6903091_001.nc").unwrap();
    let bytes = std::fs::read(&path).unwrap();

    let ds = NetCdfDataset::from_bytes(&bytes).unwrap();
    assert_eq!(ds.source(), "<memory>");
    let mut names = ds.variable_names();
    names.sort();
    assert_eq!(names, vec!["JULD", "LATITUDE", "LONGITUDE", "PRES", "PSAL", "TEMP"]);
}

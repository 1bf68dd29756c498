//! Generators for synthetic, ocean-like profile data.
//!
//! Values follow simple closed forms so tests can recompute what a given
//! (profile, depth) cell should hold.

use chrono::{DateTime, Duration, TimeZone, Utc};

use argo_common::MeasurementRecord;

/// Pressure in decibars at a depth level: 5, 15, 25, ...
pub fn pressure_at(depth: usize) -> f64 {
    5.0 + 10.0 * depth as f64
}

/// Temperature in degrees Celsius, cooling with depth and warming slightly
/// with each profile: `20 - 0.5 * depth + 0.1 * profile`.
pub fn temperature_at(profile: usize, depth: usize) -> f64 {
    20.0 - 0.5 * depth as f64 + 0.1 * profile as f64
}

/// Practical salinity: `35 + 0.01 * depth`.
pub fn salinity_at(depth: usize) -> f64 {
    35.0 + 0.01 * depth as f64
}

/// A `profiles x depths` temperature grid, row-major.
pub fn temperature_grid(profiles: usize, depths: usize) -> Vec<Vec<f64>> {
    (0..profiles)
        .map(|p| (0..depths).map(|d| temperature_at(p, d)).collect())
        .collect()
}

/// A pressure grid where every profile repeats the same depth axis.
pub fn pressure_grid(profiles: usize, depths: usize) -> Vec<Vec<f64>> {
    (0..profiles).map(|_| pressure_axis(depths)).collect()
}

/// A shared 1-D pressure axis.
pub fn pressure_axis(depths: usize) -> Vec<f64> {
    (0..depths).map(pressure_at).collect()
}

/// Reference epoch of the synthetic time axis.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap()
}

/// Days since 1950-01-01 (Argo `JULD`) for `n` profiles spaced one day
/// apart from [`base_time`].
pub fn juld_days(n: usize) -> Vec<f64> {
    let epoch = Utc.with_ymd_and_hms(1950, 1, 1, 0, 0, 0).unwrap();
    let start = (base_time() - epoch).num_days() as f64;
    (0..n).map(|i| start + i as f64).collect()
}

/// Records for one profile per day over `days` days, `depths` levels each.
///
/// Handy for exercising the windower without building a dataset.
pub fn daily_records(days: usize, depths: usize) -> Vec<MeasurementRecord> {
    (0..days)
        .flat_map(|day| {
            (0..depths).map(move |depth| MeasurementRecord {
                profile_id: day as u32,
                depth_level: depth as u32,
                time: Some(base_time() + Duration::days(day as i64)),
                pressure: pressure_at(depth),
                temperature: temperature_at(day, depth),
                salinity: Some(salinity_at(depth)),
            })
        })
        .collect()
}

//! Test support for the argo-profiles workspace.
//!
//! - [`generators`]: closed-form temperature, pressure and salinity values
//! - [`fixtures`]: in-memory datasets shaped like common producers
//! - [`files`]: the same kind of dataset written as a real NetCDF file
//! - [`paths`]: sample-file lookup and temporary directories
//!
//! Tests that need a downloaded sample use [`require_test_file!`] and are
//! skipped when it is absent.

pub mod files;
pub mod fixtures;
pub mod generators;
pub mod paths;

pub use files::*;
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Path of a sample file, or return early from the test when it is missing.
///
/// ```ignore
/// let path = require_test_file!("argo_profile.nc");
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!("SKIPPED: sample '{}' not found (set TEST_DATA_DIR)", $name);
                return;
            }
        }
    }};
}

/// Assert two numbers differ by at most `epsilon`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        let diff = (left - right).abs();
        assert!(
            diff <= epsilon,
            "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
            left,
            right,
            diff,
            epsilon
        );
    }};
}

/// [`assert_approx_eq!`] on both halves of a (latitude, longitude) pair.
#[macro_export]
macro_rules! assert_coords_approx_eq {
    (($lat1:expr, $lon1:expr), ($lat2:expr, $lon2:expr), $epsilon:expr) => {{
        $crate::assert_approx_eq!($lat1, $lat2, $epsilon);
        $crate::assert_approx_eq!($lon1, $lon2, $epsilon);
    }};
}

//! Dataset handles over NetCDF profile files.
//!
//! A [`Dataset`] is a read-only view of one file: named n-dimensional numeric
//! variables, their attributes, and the global attributes. Two backends are
//! provided:
//!
//! - [`NetCdfDataset`] reads a NetCDF-3/4 file (from disk or from bytes) with
//!   the native netcdf library and materializes every numeric variable.
//! - [`MemoryDataset`] is assembled in code, mainly for tests.
//!
//! # Missing values
//!
//! `_FillValue` and `missing_value` entries are converted to NaN on load, so
//! consumers only ever test `f64::is_nan`.
//!
//! # Time variables
//!
//! [`Dataset::times`] decodes CF `"<unit> since <epoch>"` offsets into UTC
//! timestamps. See [`cf_time`].

pub mod cf_time;
pub mod dataset;
pub mod error;
pub mod memory;
pub mod native;

pub use cf_time::CfTimeUnits;
pub use dataset::{ArrayData, AttrValue, Dataset};
pub use error::{NetCdfError, NetCdfResult};
pub use memory::MemoryDataset;
pub use native::{silence_hdf5_errors, NetCdfDataset};

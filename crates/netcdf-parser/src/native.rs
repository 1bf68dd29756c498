//! Native NetCDF reading using the netcdf library.
//!
//! Profile files are small, so every numeric variable is read eagerly into
//! memory when the file is opened. Fill values become NaN and packed
//! variables are unpacked through `scale_factor`/`add_offset`.
//!
//! # Performance Notes
//!
//! The netcdf library requires a file path (it wraps libnetcdf/HDF5 which need
//! file handles). When reading from bytes, we write to a temp file first.
//! On Linux, we use `/dev/shm` (memory-backed tmpfs) to minimize I/O latency.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;

use tracing::{debug, trace};

use crate::dataset::{ArrayData, AttrValue, Dataset};
use crate::error::{NetCdfError, NetCdfResult};
use crate::memory::MemoryDataset;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This function disables that output by
/// calling H5Eset_auto2 with null handlers. Safe to call multiple times.
///
/// Call it early in `main()`, before any HDF5/NetCDF operations occur.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// A NetCDF file, fully materialized.
#[derive(Debug, Clone)]
pub struct NetCdfDataset {
    source: String,
    inner: MemoryDataset,
}

impl NetCdfDataset {
    /// Open and read a NetCDF file from disk.
    pub fn open(path: impl AsRef<Path>) -> NetCdfResult<Self> {
        silence_hdf5_errors();

        let path = path.as_ref();
        let file = netcdf::open(path).map_err(|e| {
            NetCdfError::InvalidFormat(format!("Failed to open NetCDF {}: {}", path.display(), e))
        })?;

        let inner = read_file(&file)?;
        Ok(Self {
            source: path.display().to_string(),
            inner,
        })
    }

    /// Read a NetCDF file held in memory, e.g. a downloaded response body.
    pub fn from_bytes(data: &[u8]) -> NetCdfResult<Self> {
        let mut temp = tempfile::Builder::new()
            .prefix("argo_profile_")
            .suffix(".nc")
            .tempfile_in(get_optimal_temp_dir())?;
        temp.write_all(data)?;
        temp.flush()?;

        let mut dataset = Self::open(temp.path())?;
        dataset.source = "<memory>".to_string();
        Ok(dataset)
    }

    /// Where the dataset was read from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Dataset for NetCdfDataset {
    fn has_variable(&self, name: &str) -> bool {
        self.inner.has_variable(name)
    }

    fn variable_names(&self) -> Vec<String> {
        self.inner.variable_names()
    }

    fn variable(&self, name: &str) -> NetCdfResult<ArrayData> {
        self.inner.variable(name)
    }

    fn variable_attribute(&self, variable: &str, attribute: &str) -> Option<AttrValue> {
        self.inner.variable_attribute(variable, attribute)
    }

    fn attributes(&self) -> Vec<(String, AttrValue)> {
        self.inner.attributes()
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn read_file(file: &netcdf::File) -> NetCdfResult<MemoryDataset> {
    let mut dataset = MemoryDataset::new();

    for attr in file.attributes() {
        if let Some(value) = convert_attribute(&attr) {
            dataset = dataset.with_attribute(attr.name().to_string(), value);
        }
    }

    for var in file.variables() {
        let name = var.name();

        let raw: Vec<f64> = match var.get_values::<f64, _>(..) {
            Ok(values) => values,
            Err(e) => {
                // Character arrays (platform numbers, QC flags) land here.
                debug!(variable = %name, error = %e, "Skipping non-numeric variable");
                continue;
            }
        };

        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let values = unpack(&var, raw);
        let array = if shape.is_empty() {
            ArrayData::vector(values)
        } else {
            ArrayData::new(shape, values)?
        };
        trace!(variable = %name, shape = ?array.shape(), "Read variable");

        for attr in var.attributes() {
            if let Some(value) = convert_attribute(&attr) {
                dataset = dataset.with_variable_attribute(name.clone(), attr.name().to_string(), value);
            }
        }
        dataset = dataset.with_variable(name, array);
    }

    Ok(dataset)
}

/// Map fill values to NaN and apply the packing transform.
fn unpack(var: &netcdf::Variable, raw: Vec<f64>) -> Vec<f64> {
    let fill_value = get_f64_attr(var, "_FillValue");
    let missing_value = get_f64_attr(var, "missing_value");
    let scale_factor = get_f64_attr(var, "scale_factor").unwrap_or(1.0);
    let add_offset = get_f64_attr(var, "add_offset").unwrap_or(0.0);

    raw.into_iter()
        .map(|val| {
            if Some(val) == fill_value || Some(val) == missing_value {
                f64::NAN
            } else {
                val * scale_factor + add_offset
            }
        })
        .collect()
}

fn convert_attribute(attr: &netcdf::Attribute) -> Option<AttrValue> {
    use netcdf::AttributeValue as V;

    let value = match attr.value() {
        Ok(value) => value,
        Err(e) => {
            debug!(attribute = %attr.name(), error = %e, "Unreadable attribute");
            return None;
        }
    };

    Some(match value {
        V::Str(s) => AttrValue::Text(s),
        V::Strs(v) => AttrValue::Text(v.join(" ")),
        V::Double(x) => AttrValue::Float(x),
        V::Doubles(v) => AttrValue::Floats(v),
        V::Float(x) => AttrValue::Float(x as f64),
        V::Floats(v) => AttrValue::Floats(v.into_iter().map(f64::from).collect()),
        V::Int(x) => AttrValue::Int(x as i64),
        V::Ints(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        V::Short(x) => AttrValue::Int(x as i64),
        V::Shorts(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        V::Schar(x) => AttrValue::Int(x as i64),
        V::Uchar(x) => AttrValue::Int(x as i64),
        V::Ushort(x) => AttrValue::Int(x as i64),
        V::Uint(x) => AttrValue::Int(x as i64),
        V::Longlong(x) => AttrValue::Int(x),
        V::Longlongs(v) => AttrValue::Ints(v),
        other => {
            trace!(attribute = %attr.name(), value = ?other, "Unsupported attribute type");
            return None;
        }
    })
}

/// Get the optimal temp directory for NetCDF file operations.
///
/// On Linux, uses /dev/shm (memory-backed tmpfs) if available for faster I/O.
/// Falls back to the system temp directory elsewhere.
fn get_optimal_temp_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        let shm_path = Path::new("/dev/shm");
        if shm_path.exists() && shm_path.is_dir() {
            let test_path = shm_path.join(format!(".netcdf_test_{}", std::process::id()));
            if std::fs::write(&test_path, b"test").is_ok() {
                let _ = std::fs::remove_file(&test_path);
                return shm_path.to_path_buf();
            }
        }
    }

    std::env::temp_dir()
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimal_temp_dir() {
        let dir = get_optimal_temp_dir();
        assert!(dir.exists(), "Temp dir should exist");
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let result = NetCdfDataset::from_bytes(b"definitely not netcdf");
        assert!(matches!(result, Err(NetCdfError::InvalidFormat(_))));
    }

    #[test]
    fn test_missing_file_rejected() {
        assert!(NetCdfDataset::open("/nonexistent/profile.nc").is_err());
    }
}

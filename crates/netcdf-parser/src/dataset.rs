//! The dataset handle capability.
//!
//! A [`Dataset`] exposes a variable namespace of n-dimensional numeric
//! arrays plus global attributes. Backends (in-memory, native NetCDF)
//! implement it once; everything downstream reads through it.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::cf_time::CfTimeUnits;
use crate::error::{NetCdfError, NetCdfResult};

/// Dense row-major n-dimensional array of `f64`.
///
/// Missing values (fill values, sentinels) are stored as NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayData {
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl ArrayData {
    /// Create an array, checking that the shape covers the values exactly.
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> NetCdfResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(NetCdfError::ShapeMismatch {
                shape,
                len: values.len(),
            });
        }
        Ok(Self { shape, values })
    }

    /// One-dimensional array.
    pub fn vector(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            values,
        }
    }

    /// Two-dimensional array from rows; ragged rows are padded with NaN.
    pub fn grid(rows: Vec<Vec<f64>>) -> Self {
        let n_rows = rows.len();
        let n_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut values = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            let pad = n_cols - row.len();
            values.extend(row);
            values.extend(std::iter::repeat(f64::NAN).take(pad));
        }
        Self {
            shape: vec![n_rows, n_cols],
            values,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value at a flat (row-major) offset.
    pub fn flat(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Value at a multi-dimensional index. `None` if the index has the wrong
    /// rank or falls outside the shape.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            offset = offset * dim + i;
        }
        self.flat(offset)
    }
}

/// A global or variable attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Int(i64),
    Float(f64),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric scalar view (first element for arrays).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            AttrValue::Ints(v) => v.first().map(|x| *x as f64),
            AttrValue::Floats(v) => v.first().copied(),
            AttrValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(items: &[T]) -> String {
            items
                .iter()
                .map(|x| x.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        }

        match self {
            AttrValue::Text(s) => f.write_str(s),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Ints(v) => write!(f, "[{}]", join(v)),
            AttrValue::Floats(v) => write!(f, "[{}]", join(v)),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

/// Read access to one materialized dataset.
pub trait Dataset {
    /// Whether the variable namespace contains `name`.
    fn has_variable(&self, name: &str) -> bool;

    /// All variable names, in backend order.
    fn variable_names(&self) -> Vec<String>;

    /// Fetch a variable's values.
    fn variable(&self, name: &str) -> NetCdfResult<ArrayData>;

    /// Fetch an attribute attached to a variable.
    fn variable_attribute(&self, variable: &str, attribute: &str) -> Option<AttrValue>;

    /// Global attributes in file order.
    fn attributes(&self) -> Vec<(String, AttrValue)>;

    /// Decode a time variable through its CF `units` attribute.
    ///
    /// Elements that are missing or out of range decode to `None`. Fails
    /// when the units attribute is absent or cannot be understood.
    fn times(&self, name: &str) -> NetCdfResult<Vec<Option<DateTime<Utc>>>> {
        let units = self
            .variable_attribute(name, "units")
            .and_then(|u| u.as_str().map(str::to_string))
            .ok_or_else(|| NetCdfError::InvalidFormat(format!("{} has no units attribute", name)))?;
        let units = CfTimeUnits::parse(&units)?;
        let array = self.variable(name)?;
        Ok(array.values().iter().map(|&v| units.decode(v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_must_cover_values() {
        assert!(ArrayData::new(vec![2, 3], vec![0.0; 6]).is_ok());
        assert!(matches!(
            ArrayData::new(vec![2, 3], vec![0.0; 5]),
            Err(NetCdfError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_row_major_indexing() {
        let grid = ArrayData::grid(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(grid.shape(), &[2, 3]);
        assert_eq!(grid.get(&[0, 2]), Some(3.0));
        assert_eq!(grid.get(&[1, 0]), Some(4.0));
        assert_eq!(grid.get(&[2, 0]), None);
        assert_eq!(grid.get(&[1]), None);
    }

    #[test]
    fn test_ragged_grid_padded_with_nan() {
        let grid = ArrayData::grid(vec![vec![1.0], vec![2.0, 3.0]]);
        assert_eq!(grid.shape(), &[2, 2]);
        assert!(grid.get(&[0, 1]).unwrap().is_nan());
    }

    #[test]
    fn test_attr_display() {
        assert_eq!(AttrValue::from("Argo float").to_string(), "Argo float");
        assert_eq!(AttrValue::Int(3).to_string(), "3");
        assert_eq!(AttrValue::Floats(vec![1.5, 2.0]).to_string(), "[1.5 2]");
    }
}

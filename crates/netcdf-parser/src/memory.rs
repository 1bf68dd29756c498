//! In-memory dataset backend.
//!
//! Useful for tests and for producers that hand over already-decoded
//! arrays instead of files.

use std::collections::HashMap;

use crate::dataset::{ArrayData, AttrValue, Dataset};
use crate::error::{NetCdfError, NetCdfResult};

/// A dataset held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    variables: Vec<(String, ArrayData)>,
    variable_attributes: HashMap<(String, String), AttrValue>,
    attributes: Vec<(String, AttrValue)>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a variable.
    pub fn with_variable(mut self, name: impl Into<String>, array: ArrayData) -> Self {
        let name = name.into();
        match self.variables.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = array,
            None => self.variables.push((name, array)),
        }
        self
    }

    /// Attach an attribute to a variable.
    pub fn with_variable_attribute(
        mut self,
        variable: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Self {
        self.variable_attributes
            .insert((variable.into(), attribute.into()), value.into());
        self
    }

    /// Add or replace a global attribute, keeping first-insertion order.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }
}

impl Dataset for MemoryDataset {
    fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|(n, _)| n == name)
    }

    fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|(n, _)| n.clone()).collect()
    }

    fn variable(&self, name: &str) -> NetCdfResult<ArrayData> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a.clone())
            .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", name)))
    }

    fn variable_attribute(&self, variable: &str, attribute: &str) -> Option<AttrValue> {
        self.variable_attributes
            .get(&(variable.to_string(), attribute.to_string()))
            .cloned()
    }

    fn attributes(&self) -> Vec<(String, AttrValue)> {
        self.attributes.clone()
    }
}

//! Storage collaborators for extracted profile data.
//!
//! Provides:
//! - A local output layout: one CSV table and one JSON metadata document
//!   per dataset
//! - A PostgreSQL catalog holding metadata and measurement rows

pub mod catalog;
pub mod error;
pub mod files;

pub use catalog::{Catalog, MeasurementRow, ProfileMetadataRow};
pub use error::{StorageError, StorageResult};
pub use files::{OutputLayout, WrittenDataset};

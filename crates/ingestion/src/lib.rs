//! Oceanographic profile ingestion library.
//!
//! Turns dataset handles into flat measurement tables, per-dataset metadata
//! records and overlapping time windows.
//!
//! # Architecture
//!
//! Four stages, each a plain function over values:
//!
//! - [`resolver`]: canonical field to variable name via an ordered alias table
//! - [`extractor`]: resolved arrays to ordered [`MeasurementRecord`]s
//! - [`aggregator`]: attributes and records to [`DatasetMetadata`]
//! - [`windower`]: merged records to overlapping [`TimeChunk`]s
//!
//! The first three run per dataset ([`process_dataset`], or
//! [`process_batch`] across many in parallel). The windower runs on the
//! merged output of all datasets. Nothing here performs network or file
//! discovery I/O.
//!
//! [`MeasurementRecord`]: argo_common::MeasurementRecord
//! [`DatasetMetadata`]: argo_common::DatasetMetadata

pub mod aggregator;
pub mod config;
pub mod error;
pub mod extractor;
mod ingester;
pub mod resolver;
pub mod table;
pub mod windower;

// Re-exports
pub use aggregator::aggregate_metadata;
pub use config::{default_aliases, AliasTable, WindowConfig, MAX_WINDOW_DAYS};
pub use error::{IngestionError, Result};
pub use extractor::{
    extract_positions, extract_profiles, extract_records, AxisLayout, Extraction, ProfileArrays,
    ProfilePositions,
};
pub use ingester::{merge_records, process_batch, process_dataset, DatasetOutcome};
pub use resolver::{resolve, Resolution, ResolvedVariables};
pub use table::{
    filter_table_by_profile, read_records, render_csv, retain_profile, write_table, TableRow,
    RECORD_COLUMNS,
};
pub use windower::{TimeChunk, TimeWindower};

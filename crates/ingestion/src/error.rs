//! Error types for the ingestion crate.
//!
//! Data-quality conditions (missing variables, unsupported ranks, bad
//! readings) are not errors; they surface as values such as
//! [`crate::Extraction`]. What remains here are configuration contract
//! violations and failures of the table I/O.

use thiserror::Error;

/// Errors that can occur during ingestion.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Invalid window configuration: {0}")]
    InvalidWindow(String),

    #[error("Failed to read or write table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing table column: {0}")]
    MissingColumn(String),

    #[error("Invalid value '{value}' in column {column}")]
    InvalidValue { column: String, value: String },

    #[error("Table is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;

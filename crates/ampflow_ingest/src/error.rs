//! Error types for the ingestion pipeline.
//!
//! Row-level and file-level errors are contained where they occur (see
//! [`ValidationError`] and [`ReadError`]); only session-fatal conditions
//! surface as [`IngestError`].

use std::path::PathBuf;
use thiserror::Error;

/// Pipeline result type for session-level operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Session-fatal errors. Everything else is contained and counted.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The input root directory does not exist
    #[error("Input root not found: {0}")]
    RootNotFound(PathBuf),

    /// Invalid configuration, rejected before any work begins
    #[error("Invalid configuration: {0}")]
    Config(#[from] ampflow_protocol::ConfigError),

    /// The store could not be opened at session start
    #[error("Store error: {0}")]
    Db(#[from] ampflow_db::DbError),

    /// A pipeline task panicked (a bug, not an input problem)
    #[error("Pipeline task panicked: {0}")]
    TaskPanic(String),
}

/// File-level read failures. These fail one FileTask and never the session.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Undecodable or malformed input at a specific data row (1-based)
    #[error("Parse error at row {row}: {source}")]
    Csv {
        row: u64,
        #[source]
        source: csv::Error,
    },
}

/// One row rejected because a numeric field did not parse as a real number.
///
/// The row is dropped whole; the file continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}' is not a number: '{raw_value}'")]
pub struct ValidationError {
    pub field: &'static str,
    pub raw_value: String,
}

//! Ingestion configuration.

use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors, reported before any work begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chunk_size must be greater than 0")]
    ZeroChunkSize,

    #[error("max_threads must be at least 1")]
    ZeroThreads,

    #[error("storage path has no file name: {0}")]
    BadStoragePath(String),
}

/// Log verbosity recognized in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive suffix for a tracing `EnvFilter` (e.g. `ampflow=info`).
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_filter())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            // Accept the legacy WARNING spelling from old config files
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}

/// Options for one ingestion session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Rows per batch; one batch is one write transaction
    pub chunk_size: usize,
    /// SQLite database file for the store
    pub storage_path: PathBuf,
    /// Number of parallel parse workers
    pub max_threads: usize,
    /// Input file extension matched by the scanner (no leading dot)
    pub file_extension: String,
    /// Log verbosity
    pub log_level: LogLevel,
}

impl IngestConfig {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            chunk_size: defaults::DEFAULT_CHUNK_SIZE,
            storage_path: storage_path.into(),
            max_threads: defaults::DEFAULT_MAX_THREADS,
            file_extension: defaults::DEFAULT_FILE_EXTENSION.to_string(),
            log_level: LogLevel::default(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Reject configurations the pipeline cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.max_threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        if self.storage_path.file_name().is_none() {
            return Err(ConfigError::BadStoragePath(
                self.storage_path.display().to_string(),
            ));
        }
        Ok(())
    }

    /// Capacity of the bounded write queue for this configuration.
    pub fn write_queue_capacity(&self) -> usize {
        self.max_threads * defaults::WRITE_QUEUE_DEPTH_PER_WORKER
    }
}

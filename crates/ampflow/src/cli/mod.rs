//! CLI command implementations.

pub mod ingest;
pub mod output;
pub mod query;

use std::path::PathBuf;

/// Resolve the store path: explicit flag, or the default under ampflow home.
pub fn store_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        ampflow_logging::ampflow_home().join(ampflow_protocol::defaults::DEFAULT_DB_FILENAME)
    })
}

//! Embedded measurement store for Ampflow.
//!
//! This crate is the single source of truth for all SQLite access. The
//! ingestion pipeline writes through [`MeasurementDb::insert_batch`]; query
//! consumers (CLI, charts) read through the catalog methods. Do not use raw
//! sqlx elsewhere.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ampflow_db::{MeasurementDb, Result};
//!
//! let db = MeasurementDb::open("~/.ampflow/ampflow.sqlite3").await?;
//! let outcome = db.insert_batch(&records).await?;
//! let models = db.list_model_names().await?;
//! ```

mod error;
mod schema;
mod types;

// Method implementations organized by domain
mod catalog;
mod ingest;

pub use error::{DbError, Result};
pub use ingest::InsertOutcome;
pub use types::{MeasurementRecord, MeasurementTriple, ModelSummary, SummaryStats};

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// The measurement store.
///
/// Cloning is cheap (shared pool). Write discipline is by convention: only
/// the session's write coordinator calls [`MeasurementDb::insert_batch`];
/// everything else is read-only and may run concurrently thanks to WAL mode.
#[derive(Clone)]
pub struct MeasurementDb {
    pool: SqlitePool,
}

impl MeasurementDb {
    /// Open or create a store at the given path.
    ///
    /// Creates parent directories and the schema if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        info!(path = %path.display(), "Measurement store opened");

        Ok(db)
    }

    /// Open an existing store (fails if not present).
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DbError::NotFound(format!(
                "Store not found: {}",
                path.display()
            )));
        }

        let url = format!("sqlite:{}?mode=rw", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Ok(Self { pool })
    }

    /// Get the underlying pool (escape hatch for ad-hoc queries).
    ///
    /// Prefer the typed methods instead.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the store.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn open_creates_store() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("test.sqlite3");

        let db = MeasurementDb::open(&db_path).await.unwrap();
        assert!(db_path.exists());

        db.close().await;
    }

    #[tokio::test]
    async fn open_existing_fails_if_not_exists() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("nonexistent.sqlite3");

        let result = MeasurementDb::open_existing(&db_path).await;
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("test.sqlite3");

        let db = MeasurementDb::open(&db_path).await.unwrap();
        db.close().await;

        // Reopening an existing store must not fail on schema creation
        let db = MeasurementDb::open(&db_path).await.unwrap();
        assert_eq!(db.count_measurements().await.unwrap(), 0);
        db.close().await;
    }
}

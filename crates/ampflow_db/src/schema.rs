//! Schema creation for the measurement store.
//!
//! All CREATE TABLE statements live here - single source of truth.

use crate::error::Result;
use crate::MeasurementDb;
use tracing::info;

impl MeasurementDb {
    /// Ensure pragmas and tables exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        // WAL allows readers to run while the session's writer commits
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&self.pool)
            .await?;

        self.create_measurement_tables().await?;

        info!("Store schema verified");
        Ok(())
    }

    /// Create the measurement table and its lookup indexes.
    ///
    /// The UNIQUE constraint is the dedup key: two rows with equal
    /// (ModelName, BarCode, V_Current, A_Current, Offset) are the same
    /// physical measurement and only the first is retained.
    async fn create_measurement_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS measurements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                Time TEXT NOT NULL DEFAULT '',
                BarCode TEXT NOT NULL DEFAULT '',
                ModelName TEXT NOT NULL DEFAULT '',
                Name_ TEXT NOT NULL DEFAULT '',
                Status_V TEXT NOT NULL DEFAULT '',
                V_Current REAL NOT NULL DEFAULT 0,
                V_Min REAL NOT NULL DEFAULT 0,
                V_Max REAL NOT NULL DEFAULT 0,
                Status_A TEXT NOT NULL DEFAULT '',
                A_Current REAL NOT NULL DEFAULT 0,
                A_Min REAL NOT NULL DEFAULT 0,
                A_Max REAL NOT NULL DEFAULT 0,
                Status_O TEXT NOT NULL DEFAULT '',
                Offset REAL NOT NULL DEFAULT 0,
                Offset_Min REAL NOT NULL DEFAULT 0,
                Offset_Max REAL NOT NULL DEFAULT 0,
                Status_VAO TEXT NOT NULL DEFAULT '',
                RResult TEXT NOT NULL DEFAULT '',
                Result TEXT NOT NULL DEFAULT '',
                UNIQUE(ModelName, BarCode, V_Current, A_Current, Offset)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_measurements_model ON measurements(ModelName)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_measurements_barcode ON measurements(BarCode)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

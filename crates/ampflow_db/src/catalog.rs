//! Read-path queries for consumers of the finished store.
//!
//! These run concurrently with an active ingestion session (WAL mode,
//! single writer).

use crate::error::Result;
use crate::types::{MeasurementTriple, ModelSummary, SummaryStats};
use crate::MeasurementDb;
use sqlx::Row;

impl MeasurementDb {
    /// Total number of persisted measurements.
    pub async fn count_measurements(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM measurements")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n") as u64)
    }

    /// Distinct model names, sorted.
    pub async fn list_model_names(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT ModelName FROM measurements ORDER BY ModelName",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| row.get::<String, _>("ModelName"))
            .collect())
    }

    /// All (V_Current, A_Current, Offset) samples for one model.
    pub async fn model_series(&self, model_name: &str) -> Result<Vec<MeasurementTriple>> {
        let rows = sqlx::query_as::<_, MeasurementTriple>(
            "SELECT V_Current, A_Current, Offset FROM measurements WHERE ModelName = ?",
        )
        .bind(model_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Distinct measurement locations for a model, passing rows only, sorted.
    pub async fn model_locations(&self, model_name: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT Name_
            FROM measurements
            WHERE ModelName = ? AND Result = 'OK'
            ORDER BY Name_
            "#,
        )
        .bind(model_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| row.get::<String, _>("Name_"))
            .collect())
    }

    /// Min/max/avg of the three measured quantities for one model.
    ///
    /// Returns `None` when the model has no rows.
    pub async fn model_summary(&self, model_name: &str) -> Result<Option<ModelSummary>> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS rows,
                MIN(V_Current) AS v_min, MAX(V_Current) AS v_max, AVG(V_Current) AS v_avg,
                MIN(A_Current) AS a_min, MAX(A_Current) AS a_max, AVG(A_Current) AS a_avg,
                MIN(Offset) AS o_min, MAX(Offset) AS o_max, AVG(Offset) AS o_avg
            FROM measurements
            WHERE ModelName = ?
            "#,
        )
        .bind(model_name)
        .fetch_one(&self.pool)
        .await?;

        let rows: i64 = row.get("rows");
        if rows == 0 {
            return Ok(None);
        }

        Ok(Some(ModelSummary {
            rows: rows as u64,
            v_current: SummaryStats {
                min: row.get("v_min"),
                max: row.get("v_max"),
                avg: row.get("v_avg"),
            },
            a_current: SummaryStats {
                min: row.get("a_min"),
                max: row.get("a_max"),
                avg: row.get("a_avg"),
            },
            offset: SummaryStats {
                min: row.get("o_min"),
                max: row.get("o_max"),
                avg: row.get("o_avg"),
            },
        }))
    }
}

//! Write-path operations (used only by the session's write coordinator).

use crate::error::Result;
use crate::types::MeasurementRecord;
use crate::MeasurementDb;
use tracing::debug;

/// Result of one transactional batch insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InsertOutcome {
    /// Rows actually persisted
    pub inserted: u64,
    /// Rows skipped because their dedup key already exists
    pub duplicates: u64,
}

const INSERT_SQL: &str = r#"
    INSERT OR IGNORE INTO measurements
    (Time, BarCode, ModelName, Name_, Status_V, V_Current, V_Min, V_Max,
     Status_A, A_Current, A_Min, A_Max, Status_O, Offset, Offset_Min, Offset_Max,
     Status_VAO, RResult, Result)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

impl MeasurementDb {
    /// Insert a batch of records inside one transaction.
    ///
    /// A record whose dedup key already exists is silently skipped and
    /// counted in [`InsertOutcome::duplicates`]. On any other failure the
    /// transaction rolls back and the whole batch is unapplied; the caller
    /// decides whether to continue with later batches.
    pub async fn insert_batch(&self, records: &[MeasurementRecord]) -> Result<InsertOutcome> {
        if records.is_empty() {
            return Ok(InsertOutcome::default());
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for record in records {
            let result = sqlx::query(INSERT_SQL)
                .bind(&record.time)
                .bind(&record.bar_code)
                .bind(&record.model_name)
                .bind(&record.name)
                .bind(&record.status_v)
                .bind(record.v_current)
                .bind(record.v_min)
                .bind(record.v_max)
                .bind(&record.status_a)
                .bind(record.a_current)
                .bind(record.a_min)
                .bind(record.a_max)
                .bind(&record.status_o)
                .bind(record.offset)
                .bind(record.offset_min)
                .bind(record.offset_max)
                .bind(&record.status_vao)
                .bind(&record.r_result)
                .bind(&record.result)
                .execute(&mut *tx)
                .await?;

            // INSERT OR IGNORE reports 0 rows affected on a dedup conflict
            inserted += result.rows_affected();
        }

        tx.commit().await?;

        let duplicates = records.len() as u64 - inserted;
        if duplicates > 0 {
            debug!(inserted, duplicates, "Batch committed with duplicate skips");
        }

        Ok(InsertOutcome {
            inserted,
            duplicates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(model: &str, bar_code: &str, v: f64, a: f64, offset: f64) -> MeasurementRecord {
        MeasurementRecord {
            model_name: model.to_string(),
            bar_code: bar_code.to_string(),
            v_current: v,
            a_current: a,
            offset,
            result: "OK".to_string(),
            ..Default::default()
        }
    }

    async fn open_temp() -> (TempDir, MeasurementDb) {
        let tmp = TempDir::new().unwrap();
        let db = MeasurementDb::open(tmp.path().join("test.sqlite3"))
            .await
            .unwrap();
        (tmp, db)
    }

    #[tokio::test]
    async fn insert_batch_counts_inserts_and_duplicates() {
        let (_tmp, db) = open_temp().await;

        let batch = vec![
            record("X", "B1", 1.0, 2.0, 0.1),
            record("X", "B2", 1.0, 2.0, 0.1),
            // Same dedup key as the first record
            record("X", "B1", 1.0, 2.0, 0.1),
        ];

        let outcome = db.insert_batch(&batch).await.unwrap();
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(db.count_measurements().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn reinserting_same_batch_is_idempotent() {
        let (_tmp, db) = open_temp().await;

        let batch = vec![
            record("X", "B1", 1.0, 2.0, 0.1),
            record("Y", "B2", 3.0, 4.0, 0.2),
        ];

        let first = db.insert_batch(&batch).await.unwrap();
        assert_eq!(first.inserted, 2);

        let second = db.insert_batch(&batch).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(db.count_measurements().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn differing_key_fields_do_not_collide() {
        let (_tmp, db) = open_temp().await;

        // Same model/barcode, different measured values
        let batch = vec![
            record("X", "B1", 1.0, 2.0, 0.1),
            record("X", "B1", 1.5, 2.0, 0.1),
            record("X", "B1", 1.0, 2.5, 0.1),
            record("X", "B1", 1.0, 2.0, 0.2),
        ];

        let outcome = db.insert_batch(&batch).await.unwrap();
        assert_eq!(outcome.inserted, 4);
        assert_eq!(outcome.duplicates, 0);
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let (_tmp, db) = open_temp().await;
        let outcome = db.insert_batch(&[]).await.unwrap();
        assert_eq!(outcome, InsertOutcome::default());
    }
}

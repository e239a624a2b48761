//! The single write coordinator.
//!
//! Exactly one of these runs per session, draining the write queue batch by
//! batch. Each batch is one transaction with ignore-on-conflict dedup
//! semantics; a batch-level failure rolls back that batch, is reported, and
//! the coordinator continues - one bad batch never stops the rest of the
//! session.

use crate::bus::BusSender;
use crate::pool::WriteBatch;
use ampflow_db::MeasurementDb;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Aggregate write results for one session.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WriteTotals {
    pub rows_written: u64,
    pub duplicates: u64,
    pub failed_batches: u64,
}

pub(crate) struct WriteCoordinator {
    db: MeasurementDb,
    bus: BusSender,
}

impl WriteCoordinator {
    pub fn new(db: MeasurementDb, bus: BusSender) -> Self {
        Self { db, bus }
    }

    /// Drain the queue until every producer is gone, then report totals.
    ///
    /// Runs on the async runtime while parse workers run on blocking
    /// threads; the receiver closing is the signal that no more batches
    /// will ever arrive.
    pub async fn drain(self, mut rx: mpsc::Receiver<WriteBatch>) -> WriteTotals {
        let mut totals = WriteTotals::default();

        while let Some(batch) = rx.recv().await {
            let batch_rows = batch.records.len();
            match self.db.insert_batch(&batch.records).await {
                Ok(outcome) => {
                    totals.rows_written += outcome.inserted;
                    totals.duplicates += outcome.duplicates;
                    debug!(
                        source = %batch.source.display(),
                        rows = batch_rows,
                        inserted = outcome.inserted,
                        duplicates = outcome.duplicates,
                        "Batch committed"
                    );
                }
                Err(e) => {
                    // The transaction already rolled back; the batch is
                    // wholly unapplied
                    totals.failed_batches += 1;
                    error!(
                        source = %batch.source.display(),
                        rows = batch_rows,
                        error = %e,
                        "Batch rolled back"
                    );
                    self.bus.error(format!(
                        "Write failed for {} rows from {}: {}",
                        batch_rows,
                        batch.source.display(),
                        e
                    ));
                }
            }
        }

        debug!(
            rows_written = totals.rows_written,
            duplicates = totals.duplicates,
            failed_batches = totals.failed_batches,
            "Write queue drained"
        );

        totals
    }
}

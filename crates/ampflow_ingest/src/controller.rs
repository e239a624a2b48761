//! Session orchestration: scan → parse → write → report.
//!
//! One controller runs one session at a time (`run` borrows it mutably, so
//! overlapping invocations do not compile). The session's stop token is
//! long-lived and cleared at the start of each run, matching the
//! start-button/stop-button lifecycle of the consumers driving this
//! pipeline.

use crate::bus::BusSender;
use crate::cancel::StopToken;
use crate::error::{IngestError, Result};
use crate::perf::PerformanceMonitor;
use crate::pool::{self, FileTask, PoolCounters, WorkerContext};
use crate::scanner::FileScanner;
use crate::writer::WriteCoordinator;
use ampflow_db::MeasurementDb;
use ampflow_protocol::{IngestConfig, IngestReport, SessionOutcome, SessionState};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::info;

/// Orchestrates one ingestion session end to end.
pub struct IngestionController {
    config: IngestConfig,
    bus: BusSender,
    stop: StopToken,
    state: SessionState,
}

impl IngestionController {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            config,
            bus: BusSender::sink(),
            stop: StopToken::new(),
            state: SessionState::Idle,
        }
    }

    /// Attach a progress bus listener.
    pub fn with_bus(mut self, bus: BusSender) -> Self {
        self.bus = bus;
        self
    }

    /// Token consumers use to request cancellation of the current session.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run one complete session over the files under `root`.
    ///
    /// Only a fatal resource failure (invalid configuration, missing root,
    /// store cannot be opened) returns `Err`; row- and file-level problems
    /// are contained and land in the report.
    pub async fn run(&mut self, root: impl AsRef<Path>) -> Result<IngestReport> {
        let root = root.as_ref();
        self.config.validate()?;
        self.stop.reset();

        self.state = SessionState::Scanning;
        let db = MeasurementDb::open(&self.config.storage_path).await?;

        let files = FileScanner::new(root)
            .with_extension(self.config.file_extension.clone())
            .collect_files()?;
        let total = files.len() as u64;

        info!(root = %root.display(), total, "Scan complete");
        self.bus.progress_max(total);
        self.bus.log(format!(
            "Found {} {} files under {}",
            total,
            self.config.file_extension,
            root.display()
        ));

        let perf = PerformanceMonitor::new();
        let counters = Arc::new(PoolCounters::default());
        let tasks: Arc<Mutex<VecDeque<FileTask>>> = Arc::new(Mutex::new(
            files.into_iter().map(FileTask::new).collect(),
        ));

        self.state = SessionState::Running;
        let (batch_tx, batch_rx) = mpsc::channel(self.config.write_queue_capacity());
        let writer = WriteCoordinator::new(db.clone(), self.bus.clone());
        let writer_handle = tokio::spawn(writer.drain(batch_rx));

        let worker_count = self.config.max_threads.min(total as usize);
        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let ctx = WorkerContext {
                tasks: tasks.clone(),
                batch_tx: batch_tx.clone(),
                bus: self.bus.clone(),
                stop: self.stop.clone(),
                perf: perf.clone(),
                counters: counters.clone(),
                chunk_size: self.config.chunk_size,
            };
            workers.push(tokio::task::spawn_blocking(move || {
                pool::run_worker(worker_id, ctx)
            }));
        }
        // Workers hold the only remaining senders; the queue closes when the
        // last of them exits
        drop(batch_tx);

        for worker in workers {
            worker
                .await
                .map_err(|e| IngestError::TaskPanic(e.to_string()))?;
        }

        // All file tasks are terminal (or abandoned after a stop); the
        // coordinator now finishes whatever is still queued
        self.state = SessionState::Draining;
        let totals = writer_handle
            .await
            .map_err(|e| IngestError::TaskPanic(e.to_string()))?;

        db.close().await;

        let files_failed = counters.failed.load(Ordering::SeqCst);
        let outcome = if self.stop.is_stopped() {
            SessionOutcome::Cancelled
        } else if files_failed > 0 {
            SessionOutcome::PartialFailure
        } else {
            SessionOutcome::Success
        };

        let report = IngestReport {
            outcome,
            files_completed: counters.completed.load(Ordering::SeqCst),
            files_failed,
            files_skipped: counters.skipped.load(Ordering::SeqCst),
            rows_written: totals.rows_written,
            duplicates: totals.duplicates,
            rows_rejected: counters.rejected.load(Ordering::SeqCst),
            perf: perf.stats(),
        };

        info!(
            outcome = %outcome,
            files_completed = report.files_completed,
            files_failed = report.files_failed,
            rows_written = report.rows_written,
            duplicates = report.duplicates,
            rows_rejected = report.rows_rejected,
            "Session finished"
        );
        self.bus.info(format!(
            "Import finished ({}): {} rows written, {} duplicates skipped, {} rows rejected",
            outcome, report.rows_written, report.duplicates, report.rows_rejected
        ));
        self.bus.finished();
        self.state = SessionState::Finished(outcome);

        Ok(report)
    }
}

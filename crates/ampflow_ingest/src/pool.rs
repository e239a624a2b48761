//! Parse worker pool.
//!
//! Each worker claims one file task at a time from a shared queue, runs the
//! chunked reader and the validator over it, and pushes validated batches
//! onto the bounded write queue. `blocking_send` on a full queue is the
//! backpressure that bounds memory no matter how fast the parsers run.
//!
//! Failure containment: a file-level error (unreadable, undecodable, no
//! valid rows at all) marks that task Failed and the worker moves on - one
//! file never aborts the session. The stop token is checked between files,
//! never mid-file.

use crate::bus::BusSender;
use crate::cancel::StopToken;
use crate::perf::PerformanceMonitor;
use crate::reader::ChunkedRecordReader;
use crate::validate::validate_row;
use ampflow_db::MeasurementRecord;
use ampflow_protocol::FileState;
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Per-file unit of work.
///
/// Owned exclusively by the worker processing it; state changes are
/// published read-only through the progress bus.
#[derive(Debug, Clone)]
pub struct FileTask {
    pub path: PathBuf,
    pub state: FileState,
    pub rows_processed: u64,
    pub error: Option<String>,
}

impl FileTask {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: FileState::Pending,
            rows_processed: 0,
            error: None,
        }
    }
}

/// One validated batch bound for the write queue.
pub(crate) struct WriteBatch {
    pub source: PathBuf,
    pub records: Vec<MeasurementRecord>,
}

/// Shared counters the controller reads after the pool drains.
#[derive(Default)]
pub(crate) struct PoolCounters {
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub skipped: AtomicU64,
    pub terminal: AtomicU64,
    pub rejected: AtomicU64,
}

/// Everything one worker needs; clone per worker.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub tasks: Arc<Mutex<VecDeque<FileTask>>>,
    pub batch_tx: mpsc::Sender<WriteBatch>,
    pub bus: BusSender,
    pub stop: StopToken,
    pub perf: PerformanceMonitor,
    pub counters: Arc<PoolCounters>,
    pub chunk_size: usize,
}

/// Worker loop: claim, process, repeat until the queue is empty or a stop
/// is requested.
pub(crate) fn run_worker(worker_id: usize, ctx: WorkerContext) {
    loop {
        if ctx.stop.is_stopped() {
            debug!(worker_id, "Stop requested; worker exits");
            break;
        }

        let task = ctx
            .tasks
            .lock()
            .expect("file task queue lock poisoned")
            .pop_front();

        let Some(mut task) = task else {
            debug!(worker_id, "No more files; worker exits");
            break;
        };

        process_file(&ctx, &mut task);

        let done = ctx.counters.terminal.fetch_add(1, Ordering::SeqCst) + 1;
        ctx.bus.progress(done);
    }
}

fn process_file(ctx: &WorkerContext, task: &mut FileTask) {
    task.state = FileState::Processing;
    ctx.bus.file_status(&task.path, FileState::Processing);
    debug!(path = %task.path.display(), "Parsing file");

    let reader = ChunkedRecordReader::new(ctx.chunk_size);
    let batches = match reader.open(&task.path) {
        Ok(Some(batches)) => batches,
        Ok(None) => {
            warn!(path = %task.path.display(), "File has no header row; skipping");
            ctx.bus
                .log(format!("Skipped empty file: {}", task.path.display()));
            finish(ctx, task, FileState::Skipped);
            return;
        }
        Err(e) => {
            fail(ctx, task, e);
            return;
        }
    };

    let mut valid_rows = 0u64;
    for batch in batches {
        let raw = match batch {
            Ok(raw) => raw,
            Err(e) => {
                fail(ctx, task, e);
                return;
            }
        };

        let raw_len = raw.len() as u64;
        let mut records = Vec::with_capacity(raw.len());
        for row in &raw {
            match validate_row(row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    ctx.counters.rejected.fetch_add(1, Ordering::SeqCst);
                    warn!(
                        path = %task.path.display(),
                        row = row.row(),
                        field = e.field,
                        raw_value = %e.raw_value,
                        "Row rejected"
                    );
                    ctx.bus.log(format!(
                        "Rejected row {} in {}: {}",
                        row.row(),
                        task.path.display(),
                        e
                    ));
                }
            }
        }

        ctx.perf.record_rows(raw_len);
        task.rows_processed += raw_len;
        valid_rows += records.len() as u64;

        if !records.is_empty() {
            let batch = WriteBatch {
                source: task.path.clone(),
                records,
            };
            // Blocks while the write queue is full - this is the backpressure
            if ctx.batch_tx.blocking_send(batch).is_err() {
                fail(ctx, task, "write queue closed before the file finished");
                return;
            }
        }
    }

    if task.rows_processed > 0 && valid_rows == 0 {
        fail(ctx, task, "no row in the file passed validation");
        return;
    }

    ctx.perf.record_file();
    finish(ctx, task, FileState::Completed);
    ctx.bus.log(format!(
        "Processed {}: {} rows",
        task.path.display(),
        task.rows_processed
    ));
}

fn finish(ctx: &WorkerContext, task: &mut FileTask, state: FileState) {
    task.state = state;
    match state {
        FileState::Completed => ctx.counters.completed.fetch_add(1, Ordering::SeqCst),
        FileState::Skipped => ctx.counters.skipped.fetch_add(1, Ordering::SeqCst),
        FileState::Failed => ctx.counters.failed.fetch_add(1, Ordering::SeqCst),
        _ => 0,
    };
    ctx.bus.file_status(&task.path, state);
}

fn fail(ctx: &WorkerContext, task: &mut FileTask, error: impl fmt::Display) {
    let message = format!("Failed to process {}: {}", task.path.display(), error);
    warn!(path = %task.path.display(), error = %error, "File failed");
    task.error = Some(error.to_string());
    ctx.bus.error(message);
    finish(ctx, task, FileState::Failed);
}

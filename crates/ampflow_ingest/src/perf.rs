//! Session throughput accounting.

use ampflow_protocol::PerfStats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Accumulates file/row counters and elapsed time for one session.
///
/// Clone is cheap and shares state; counters only increase within a session.
/// Create a fresh monitor at session start to reset.
#[derive(Clone)]
pub struct PerformanceMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    started: Instant,
    files_processed: AtomicU64,
    rows_processed: AtomicU64,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                started: Instant::now(),
                files_processed: AtomicU64::new(0),
                rows_processed: AtomicU64::new(0),
            }),
        }
    }

    /// Record one file reaching the end of its parse.
    pub fn record_file(&self) {
        self.inner.files_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `rows` raw rows read from input.
    pub fn record_rows(&self, rows: u64) {
        self.inner.rows_processed.fetch_add(rows, Ordering::Relaxed);
    }

    /// Snapshot of the current counters and throughput.
    pub fn stats(&self) -> PerfStats {
        let elapsed = self.inner.started.elapsed();
        let rows = self.inner.rows_processed.load(Ordering::Relaxed);
        let elapsed_secs = elapsed.as_secs_f64();

        PerfStats {
            elapsed_ms: elapsed.as_millis() as u64,
            files_processed: self.inner.files_processed.load(Ordering::Relaxed),
            rows_processed: rows,
            rows_per_sec: if elapsed_secs > 0.0 {
                rows as f64 / elapsed_secs
            } else {
                0.0
            },
        }
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let monitor = PerformanceMonitor::new();
        let shared = monitor.clone();

        shared.record_file();
        shared.record_rows(100);
        monitor.record_rows(50);

        let stats = monitor.stats();
        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.rows_processed, 150);
    }

    #[test]
    fn rate_is_zero_without_rows() {
        let stats = PerformanceMonitor::new().stats();
        assert_eq!(stats.rows_per_sec, 0.0);
    }
}

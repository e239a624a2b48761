//! Cooperative session cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Token for cooperative cancellation of an ingestion session.
///
/// Clone is cheap and shares state. Workers check it between files, never
/// mid-file; the session drains in-flight batches before reporting
/// `Cancelled`.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
}

impl StopToken {
    /// Create a new token (not stopped).
    pub fn new() -> Self {
        Self {
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Request a stop.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Clear the token for a new session.
    pub(crate) fn reset(&self) {
        self.stopped.store(false, Ordering::SeqCst);
    }
}

//! Progress bus: many producers, one consumer.
//!
//! Workers and the write coordinator publish [`IngestEvent`]s; the consumer
//! (CLI progress bar, monitor, test harness) drains on its own schedule via
//! blocking receive or non-blocking poll. Events are advisory: sending to a
//! dropped receiver is silently ignored so a vanished listener can never
//! stall the pipeline.

use ampflow_protocol::{FileState, IngestEvent};
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

/// Create a connected (sender, receiver) pair.
pub fn progress_bus() -> (BusSender, BusReceiver) {
    let (tx, rx) = mpsc::channel();
    (BusSender { tx }, BusReceiver { rx })
}

/// Cloneable producer handle.
#[derive(Clone)]
pub struct BusSender {
    tx: mpsc::Sender<IngestEvent>,
}

impl BusSender {
    /// A sender with no listener; every emit is dropped.
    pub fn sink() -> Self {
        let (tx, _) = mpsc::channel();
        Self { tx }
    }

    pub fn emit(&self, event: IngestEvent) {
        let _ = self.tx.send(event);
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(IngestEvent::Log {
            message: message.into(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(IngestEvent::Info {
            message: message.into(),
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(IngestEvent::Error {
            message: message.into(),
        });
    }

    pub fn progress_max(&self, total: u64) {
        self.emit(IngestEvent::ProgressMax { total });
    }

    pub fn progress(&self, done: u64) {
        self.emit(IngestEvent::Progress { done });
    }

    pub fn file_status(&self, path: &Path, state: FileState) {
        self.emit(IngestEvent::FileStatus {
            path: path.to_path_buf(),
            state,
        });
    }

    pub fn finished(&self) {
        self.emit(IngestEvent::Finished);
    }
}

/// Consumer handle.
pub struct BusReceiver {
    rx: mpsc::Receiver<IngestEvent>,
}

impl BusReceiver {
    /// Blocking receive; `None` once all senders are gone.
    pub fn recv(&self) -> Option<IngestEvent> {
        self.rx.recv().ok()
    }

    /// Blocking receive with a deadline.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<IngestEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Non-blocking poll for UI loops.
    pub fn try_recv(&self) -> Option<IngestEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain everything currently buffered.
    pub fn drain(&self) -> Vec<IngestEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn single_producer_events_arrive_in_order() {
        let (tx, rx) = progress_bus();

        tx.progress_max(3);
        tx.file_status(Path::new("a.csv"), FileState::Processing);
        tx.progress(1);
        tx.finished();
        drop(tx);

        let events = rx.drain();
        assert_eq!(
            events,
            vec![
                IngestEvent::ProgressMax { total: 3 },
                IngestEvent::FileStatus {
                    path: PathBuf::from("a.csv"),
                    state: FileState::Processing
                },
                IngestEvent::Progress { done: 1 },
                IngestEvent::Finished,
            ]
        );
    }

    #[test]
    fn sink_sender_never_blocks_or_errors() {
        let tx = BusSender::sink();
        for _ in 0..1000 {
            tx.log("dropped on the floor");
        }
    }

    #[test]
    fn recv_returns_none_after_all_senders_drop() {
        let (tx, rx) = progress_bus();
        let tx2 = tx.clone();
        tx.info("one");
        drop(tx);
        drop(tx2);

        assert!(matches!(rx.recv(), Some(IngestEvent::Info { .. })));
        assert!(rx.recv().is_none());
    }
}

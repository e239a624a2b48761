//! Lifecycle states, progress events, and session reports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Canonical Enums (used across all crates)
// ============================================================================

/// Per-file task lifecycle.
/// This is the CANONICAL definition - use this everywhere for file status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    /// Discovered by the scanner, not yet claimed by a worker
    #[default]
    Pending,
    /// A worker owns the file and is parsing it
    Processing,
    /// All batches produced and handed to the writer
    Completed,
    /// File-level failure (unreadable, undecodable)
    Failed,
    /// Skipped without processing (e.g., no header row)
    Skipped,
}

impl FileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileState::Pending => "PENDING",
            FileState::Processing => "PROCESSING",
            FileState::Completed => "COMPLETED",
            FileState::Failed => "FAILED",
            FileState::Skipped => "SKIPPED",
        }
    }

    /// A terminal state is never left again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FileState::Completed | FileState::Failed | FileState::Skipped
        )
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(FileState::Pending),
            "PROCESSING" => Ok(FileState::Processing),
            "COMPLETED" => Ok(FileState::Completed),
            "FAILED" => Ok(FileState::Failed),
            "SKIPPED" => Ok(FileState::Skipped),
            _ => Err(format!("Invalid file state: '{}'", s)),
        }
    }
}

/// Session lifecycle for one ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// No session running
    Idle,
    /// Walking the input tree, building the file queue
    Scanning,
    /// Workers parsing, writer committing
    Running,
    /// All files terminal, writer flushing remaining batches
    Draining,
    /// Terminal, with the final outcome
    Finished(SessionOutcome),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Finished(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "IDLE"),
            SessionState::Scanning => write!(f, "SCANNING"),
            SessionState::Running => write!(f, "RUNNING"),
            SessionState::Draining => write!(f, "DRAINING"),
            SessionState::Finished(outcome) => write!(f, "FINISHED({})", outcome),
        }
    }
}

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionOutcome {
    /// No file task failed
    Success,
    /// At least one file failed, at least one completed
    PartialFailure,
    /// The stop flag was set before the session could finish
    Cancelled,
}

impl SessionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionOutcome::Success => "SUCCESS",
            SessionOutcome::PartialFailure => "PARTIAL_FAILURE",
            SessionOutcome::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Progress events
// ============================================================================

/// Events flowing from pipeline producers to whoever is listening
/// (CLI progress bar, monitor, test harness).
///
/// Events from a single producer arrive in emission order; there is no
/// ordering guarantee across producers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestEvent {
    /// Free-form log line for the listener's log pane
    Log { message: String },
    /// Total number of files the session will process
    ProgressMax { total: u64 },
    /// Number of files that have reached a terminal state so far
    Progress { done: u64 },
    /// A file task changed state
    FileStatus { path: PathBuf, state: FileState },
    /// User-facing informational message
    Info { message: String },
    /// User-facing error message (the session keeps running)
    Error { message: String },
    /// The session reached a terminal state; no more events follow
    Finished,
}

// ============================================================================
// Session report
// ============================================================================

/// Throughput statistics for one session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PerfStats {
    pub elapsed_ms: u64,
    pub files_processed: u64,
    pub rows_processed: u64,
    /// Rows per second; 0 when elapsed is 0.
    pub rows_per_sec: f64,
}

impl PerfStats {
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

/// Aggregate result of one ingestion session.
///
/// `rows_written + duplicates + rows_rejected` accounts for every raw row
/// read from completed files; no row vanishes silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub outcome: SessionOutcome,
    pub files_completed: u64,
    pub files_failed: u64,
    pub files_skipped: u64,
    pub rows_written: u64,
    pub duplicates: u64,
    pub rows_rejected: u64,
    pub perf: PerfStats,
}

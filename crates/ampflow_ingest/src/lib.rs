//! Measurement-log ingestion pipeline.
//!
//! Directory scan → chunked parse → row validation → transactional,
//! deduplicating writes, with bounded parallel parsers and a single
//! serialized writer.
//!
//! # Design
//!
//! - Parse workers are blocking tasks; each owns one file at a time and
//!   pushes validated batches onto a bounded write queue (backpressure).
//! - Exactly one write coordinator drains the queue; each batch is one
//!   SQLite transaction with ignore-on-conflict dedup semantics.
//! - Producers report through the [`bus`] channel; the
//!   [`perf::PerformanceMonitor`] and any UI consume it on their own
//!   schedule.
//! - Cancellation is cooperative: the shared [`cancel::StopToken`] is
//!   checked between files, never mid-file, and in-flight batches always
//!   commit or roll back whole.

pub mod bus;
pub mod cancel;
pub mod controller;
pub mod error;
pub mod perf;
pub mod pool;
pub mod reader;
pub mod scanner;
pub mod validate;

mod writer;

pub use bus::{progress_bus, BusReceiver, BusSender};
pub use cancel::StopToken;
pub use controller::IngestionController;
pub use error::{IngestError, ReadError, Result, ValidationError};
pub use perf::PerformanceMonitor;
pub use pool::FileTask;
pub use reader::{ChunkedRecordReader, RawRow, RecordBatch};
pub use scanner::FileScanner;
pub use validate::validate_row;

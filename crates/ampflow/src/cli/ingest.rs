//! `ampflow ingest` - run one ingestion session with a live progress bar.

use crate::cli::output::format_elapsed;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;

use ampflow_ingest::{progress_bus, BusReceiver, IngestionController};
use ampflow_protocol::{FileState, IngestConfig, IngestEvent, LogLevel, SessionOutcome};

pub struct IngestArgs {
    pub root: PathBuf,
    pub db: Option<PathBuf>,
    pub chunk_size: Option<usize>,
    pub threads: Option<usize>,
    pub ext: String,
    pub log_level: LogLevel,
}

pub async fn run(args: IngestArgs) -> Result<ExitCode> {
    let storage_path = crate::cli::store_path(args.db);
    let mut config = IngestConfig::new(&storage_path)
        .with_file_extension(args.ext)
        .with_log_level(args.log_level);
    if let Some(chunk_size) = args.chunk_size {
        config = config.with_chunk_size(chunk_size);
    }
    if let Some(threads) = args.threads {
        config = config.with_max_threads(threads);
    }

    println!("Importing {} into {}", args.root.display(), storage_path.display());

    let (bus_tx, bus_rx) = progress_bus();
    let mut controller = IngestionController::new(config).with_bus(bus_tx);

    // Ctrl-C requests a cooperative stop; in-flight work drains cleanly
    let stop = controller.stop_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing in-flight work");
            stop.stop();
        }
    });

    let renderer = std::thread::spawn(move || render_progress(bus_rx));

    let report = controller
        .run(&args.root)
        .await
        .context("Ingestion session failed")?;

    if renderer.join().is_err() {
        warn!("Progress renderer exited abnormally");
    }

    println!(
        "{}: {} files completed, {} failed, {} skipped",
        report.outcome, report.files_completed, report.files_failed, report.files_skipped
    );
    println!(
        "{} rows written, {} duplicates skipped, {} rows rejected",
        report.rows_written, report.duplicates, report.rows_rejected
    );
    println!(
        "{} rows in {} ({:.0} rows/s)",
        report.perf.rows_processed,
        format_elapsed(report.perf.elapsed()),
        report.perf.rows_per_sec
    );

    Ok(match report.outcome {
        SessionOutcome::Success | SessionOutcome::Cancelled => ExitCode::SUCCESS,
        SessionOutcome::PartialFailure => ExitCode::FAILURE,
    })
}

/// Drive an indicatif bar from the progress bus until `Finished`.
fn render_progress(rx: BusReceiver) {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} files {msg}")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );

    while let Some(event) = rx.recv() {
        match event {
            IngestEvent::ProgressMax { total } => bar.set_length(total),
            IngestEvent::Progress { done } => bar.set_position(done),
            IngestEvent::FileStatus { path, state } => {
                if state == FileState::Processing {
                    if let Some(name) = path.file_name() {
                        bar.set_message(name.to_string_lossy().into_owned());
                    }
                }
            }
            IngestEvent::Error { message } => bar.println(format!("error: {message}")),
            IngestEvent::Info { message } => bar.println(message),
            IngestEvent::Log { .. } => {}
            IngestEvent::Finished => break,
        }
    }

    bar.finish_and_clear();
}

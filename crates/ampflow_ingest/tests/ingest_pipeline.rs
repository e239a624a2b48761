//! End-to-end pipeline tests over real directories and a real store.

use ampflow_db::MeasurementDb;
use ampflow_ingest::{progress_bus, IngestError, IngestionController};
use ampflow_protocol::{FileState, IngestConfig, IngestEvent, SessionOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HEADER: &str = "Time,BarCode,ModelName,Name_,Status_V,V_Current,V_Min,V_Max,\
Status_A,A_Current,A_Min,A_Max,Status_O,Offset,Offset_Min,Offset_Max,Status_VAO,RResult,Result";

fn data_row(model: &str, bar_code: &str, v: &str, a: &str, offset: &str) -> String {
    format!(
        "2024-03-01 10:00:00,{bar_code},{model},P1,OK,{v},0,5,OK,{a},0,50,OK,{offset},-1,1,OK,PASS,OK"
    )
}

fn write_csv(dir: &Path, name: &str, rows: &[String]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut contents = String::from(HEADER);
    contents.push('\n');
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    fs::write(&path, contents).unwrap();
    path
}

struct Env {
    _tmp: TempDir,
    input: PathBuf,
    store: PathBuf,
}

impl Env {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("input");
        fs::create_dir_all(&input).unwrap();
        let store = tmp.path().join("store.sqlite3");
        Self {
            _tmp: tmp,
            input,
            store,
        }
    }

    fn config(&self) -> IngestConfig {
        IngestConfig::new(&self.store)
    }

    async fn stored_rows(&self) -> u64 {
        let db = MeasurementDb::open_existing(&self.store).await.unwrap();
        let count = db.count_measurements().await.unwrap();
        db.close().await;
        count
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn session_accounts_for_every_row() {
    let env = Env::new();
    write_csv(
        &env.input,
        "a.csv",
        &[
            data_row("X", "B1", "1.0", "2.0", "0.1"),
            data_row("X", "B2", "1.1", "2.0", "0.1"),
            data_row("X", "B3", "1.2", "2.0", "0.1"),
        ],
    );
    write_csv(
        &env.input,
        "nested/b.csv",
        &[
            // Duplicate of the first row in a.csv
            data_row("X", "B1", "1.0", "2.0", "0.1"),
            // Bad numeric - rejected
            data_row("X", "B4", "not-a-volt", "2.0", "0.1"),
        ],
    );

    let (tx, rx) = progress_bus();
    let mut controller = IngestionController::new(env.config()).with_bus(tx);
    let report = controller.run(&env.input).await.unwrap();

    assert_eq!(report.outcome, SessionOutcome::Success);
    assert_eq!(report.files_completed, 2);
    assert_eq!(report.files_failed, 0);
    assert_eq!(report.rows_written, 3);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.rows_rejected, 1);

    // No row silently vanishes
    assert_eq!(
        report.rows_written + report.duplicates + report.rows_rejected,
        report.perf.rows_processed
    );
    assert_eq!(env.stored_rows().await, 3);

    let events = rx.drain();
    assert!(events.contains(&IngestEvent::ProgressMax { total: 2 }));
    assert!(events.contains(&IngestEvent::Progress { done: 2 }));
    assert_eq!(events.last(), Some(&IngestEvent::Finished));
    let completed = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                IngestEvent::FileStatus {
                    state: FileState::Completed,
                    ..
                }
            )
        })
        .count();
    assert_eq!(completed, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn reingesting_the_same_tree_changes_nothing() {
    let env = Env::new();
    write_csv(
        &env.input,
        "a.csv",
        &[
            data_row("X", "B1", "1.0", "2.0", "0.1"),
            data_row("X", "B2", "1.1", "2.0", "0.1"),
            data_row("Y", "B3", "1.2", "2.0", "0.1"),
        ],
    );

    let mut controller = IngestionController::new(env.config());
    let first = controller.run(&env.input).await.unwrap();
    assert_eq!(first.rows_written, 3);
    assert_eq!(env.stored_rows().await, 3);

    let second = controller.run(&env.input).await.unwrap();
    assert_eq!(second.outcome, SessionOutcome::Success);
    assert_eq!(second.rows_written, 0);
    assert_eq!(second.duplicates, 3);
    assert_eq!(env.stored_rows().await, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn mid_batch_rejection_drops_only_the_bad_row() {
    let env = Env::new();
    // R1..R5 with a non-numeric V_Current in R3; chunk size 2 splits the
    // file into [R1,R2], [R3,R4], [R5] and validation drops R3 from the
    // middle batch
    write_csv(
        &env.input,
        "five.csv",
        &[
            data_row("M", "R1", "1.0", "1.0", "0.1"),
            data_row("M", "R2", "2.0", "1.0", "0.1"),
            data_row("M", "R3", "oops", "1.0", "0.1"),
            data_row("M", "R4", "4.0", "1.0", "0.1"),
            data_row("M", "R5", "5.0", "1.0", "0.1"),
        ],
    );

    let config = env.config().with_chunk_size(2).with_max_threads(1);
    let mut controller = IngestionController::new(config);
    let report = controller.run(&env.input).await.unwrap();

    assert_eq!(report.outcome, SessionOutcome::Success);
    assert_eq!(report.rows_written, 4);
    assert_eq!(report.rows_rejected, 1);
    assert_eq!(report.duplicates, 0);
    assert_eq!(env.stored_rows().await, 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn identical_measurement_in_two_files_persists_once() {
    let env = Env::new();
    write_csv(
        &env.input,
        "first.csv",
        &[data_row("X", "B1", "1.0", "2.0", "0.1")],
    );
    write_csv(
        &env.input,
        "second.csv",
        &[data_row("X", "B1", "1.0", "2.0", "0.1")],
    );

    let mut controller = IngestionController::new(env.config());
    let report = controller.run(&env.input).await.unwrap();

    assert_eq!(report.rows_written, 1);
    assert_eq!(report.duplicates, 1);
    assert_eq!(env.stored_rows().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn single_worker_processes_files_sequentially() {
    let env = Env::new();
    for i in 0..3 {
        write_csv(
            &env.input,
            &format!("file{i}.csv"),
            &[data_row("M", &format!("B{i}"), "1.0", "2.0", &format!("0.{i}"))],
        );
    }

    let (tx, rx) = progress_bus();
    let config = env.config().with_max_threads(1);
    let mut controller = IngestionController::new(config).with_bus(tx);
    let report = controller.run(&env.input).await.unwrap();

    assert_eq!(report.outcome, SessionOutcome::Success);
    assert_eq!(report.files_completed, 3);
    assert_eq!(report.perf.files_processed, 3);

    // With one worker, Processing/terminal events strictly alternate
    let statuses: Vec<(PathBuf, FileState)> = rx
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            IngestEvent::FileStatus { path, state } => Some((path, state)),
            _ => None,
        })
        .collect();
    assert_eq!(statuses.len(), 6);
    for pair in statuses.chunks(2) {
        assert_eq!(pair[0].1, FileState::Processing);
        assert!(pair[1].1.is_terminal());
        assert_eq!(pair[0].0, pair[1].0);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn undecodable_file_fails_without_aborting_the_session() {
    let env = Env::new();
    write_csv(
        &env.input,
        "good.csv",
        &[data_row("X", "B1", "1.0", "2.0", "0.1")],
    );
    fs::write(
        env.input.join("bad.csv"),
        [HEADER.as_bytes(), b"\n\xff\xfe broken bytes,1\n"].concat(),
    )
    .unwrap();

    let (tx, rx) = progress_bus();
    let mut controller = IngestionController::new(env.config()).with_bus(tx);
    let report = controller.run(&env.input).await.unwrap();

    assert_eq!(report.outcome, SessionOutcome::PartialFailure);
    assert_eq!(report.files_completed, 1);
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.rows_written, 1);
    assert_eq!(env.stored_rows().await, 1);

    let events = rx.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        IngestEvent::FileStatus {
            state: FileState::Failed,
            ..
        }
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, IngestEvent::Error { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn file_with_no_valid_rows_fails() {
    let env = Env::new();
    write_csv(
        &env.input,
        "good.csv",
        &[data_row("X", "B1", "1.0", "2.0", "0.1")],
    );
    write_csv(
        &env.input,
        "hopeless.csv",
        &[
            data_row("X", "B2", "bad", "2.0", "0.1"),
            data_row("X", "B3", "worse", "2.0", "0.1"),
        ],
    );

    let mut controller = IngestionController::new(env.config());
    let report = controller.run(&env.input).await.unwrap();

    assert_eq!(report.outcome, SessionOutcome::PartialFailure);
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.rows_rejected, 2);
    assert_eq!(env.stored_rows().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_file_is_skipped_not_failed() {
    let env = Env::new();
    write_csv(
        &env.input,
        "good.csv",
        &[data_row("X", "B1", "1.0", "2.0", "0.1")],
    );
    fs::write(env.input.join("empty.csv"), b"").unwrap();

    let mut controller = IngestionController::new(env.config());
    let report = controller.run(&env.input).await.unwrap();

    assert_eq!(report.outcome, SessionOutcome::Success);
    assert_eq!(report.files_completed, 1);
    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.files_failed, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_tree_finishes_successfully() {
    let env = Env::new();

    let (tx, rx) = progress_bus();
    let mut controller = IngestionController::new(env.config()).with_bus(tx);
    let report = controller.run(&env.input).await.unwrap();

    assert_eq!(report.outcome, SessionOutcome::Success);
    assert_eq!(report.rows_written, 0);
    assert_eq!(env.stored_rows().await, 0);

    let events = rx.drain();
    assert!(events.contains(&IngestEvent::ProgressMax { total: 0 }));
    assert_eq!(events.last(), Some(&IngestEvent::Finished));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_root_aborts_before_any_work() {
    let env = Env::new();
    let mut controller = IngestionController::new(env.config());
    let result = controller.run(env.input.join("does-not-exist")).await;
    assert!(matches!(result, Err(IngestError::RootNotFound(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelling_mid_run_drains_cleanly() {
    let env = Env::new();
    // Three sizable files; one worker. The listener requests a stop as soon
    // as the first file reaches a terminal state, which lands while the
    // second file is mid-parse - the worker then refuses to claim the third.
    for file_idx in 0..3 {
        let rows: Vec<String> = (0..10_000)
            .map(|row_idx| {
                data_row(
                    "M",
                    &format!("F{file_idx}R{row_idx}"),
                    &format!("{}.{}", file_idx, row_idx),
                    "1.0",
                    "0.1",
                )
            })
            .collect();
        write_csv(&env.input, &format!("file{file_idx}.csv"), &rows);
    }

    let (tx, rx) = progress_bus();
    let config = env.config().with_max_threads(1).with_chunk_size(100);
    let mut controller = IngestionController::new(config).with_bus(tx);
    let stop = controller.stop_token();

    let listener = std::thread::spawn(move || {
        while let Some(event) = rx.recv() {
            if matches!(event, IngestEvent::Progress { .. }) {
                stop.stop();
            }
            if event == IngestEvent::Finished {
                break;
            }
        }
    });

    let report = controller.run(&env.input).await.unwrap();
    listener.join().unwrap();

    assert_eq!(report.outcome, SessionOutcome::Cancelled);
    assert!(report.files_completed < 3);
    assert_eq!(report.files_failed, 0);

    // Every batch either committed whole or never happened: the store holds
    // exactly the rows the report claims, and every raw row read is
    // accounted for.
    assert_eq!(env.stored_rows().await, report.rows_written);
    assert_eq!(
        report.rows_written + report.duplicates + report.rows_rejected,
        report.perf.rows_processed
    );
}

//! Read-only commands over the finished store.

use crate::cli::output::print_table;
use ampflow_db::{MeasurementDb, SummaryStats};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::ExitCode;

async fn open_store(db: Option<PathBuf>) -> Result<MeasurementDb> {
    let path = crate::cli::store_path(db);
    MeasurementDb::open_existing(&path)
        .await
        .with_context(|| format!("No store at {} - run `ampflow ingest` first", path.display()))
}

pub async fn models(db: Option<PathBuf>) -> Result<ExitCode> {
    let store = open_store(db).await?;
    let models = store.list_model_names().await?;

    if models.is_empty() {
        println!("The store holds no measurements yet.");
    } else {
        print_table(
            &["ModelName"],
            models.into_iter().map(|name| vec![name]).collect(),
        );
    }

    store.close().await;
    Ok(ExitCode::SUCCESS)
}

pub async fn stats(model: &str, db: Option<PathBuf>) -> Result<ExitCode> {
    let store = open_store(db).await?;
    let summary = store.model_summary(model).await?;
    store.close().await;

    let Some(summary) = summary else {
        println!("No measurements for model '{model}'.");
        return Ok(ExitCode::FAILURE);
    };

    println!("{} measurements for {}", summary.rows, model);
    print_table(
        &["Measure", "Min", "Max", "Avg"],
        vec![
            stat_row("V_Current", summary.v_current),
            stat_row("A_Current", summary.a_current),
            stat_row("Offset", summary.offset),
        ],
    );
    Ok(ExitCode::SUCCESS)
}

pub async fn locations(model: &str, db: Option<PathBuf>) -> Result<ExitCode> {
    let store = open_store(db).await?;
    let locations = store.model_locations(model).await?;
    store.close().await;

    if locations.is_empty() {
        println!("No passing measurements for model '{model}'.");
        return Ok(ExitCode::FAILURE);
    }

    print_table(
        &["Location"],
        locations.into_iter().map(|name| vec![name]).collect(),
    );
    Ok(ExitCode::SUCCESS)
}

fn stat_row(label: &str, stats: SummaryStats) -> Vec<String> {
    vec![
        label.to_string(),
        format!("{:.4}", stats.min),
        format!("{:.4}", stats.max),
        format!("{:.4}", stats.avg),
    ]
}

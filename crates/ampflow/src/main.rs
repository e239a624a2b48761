//! Ampflow launcher.
//!
//! Non-graphical surface over the ingestion pipeline and the measurement
//! store: `ingest` runs a session with a live progress bar, the query
//! commands read the finished store.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use ampflow_logging::{init_logging, LogConfig};
use ampflow_protocol::LogLevel;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "ampflow", about = "Measurement-log ingestion into an embedded store")]
struct Cli {
    /// Enable verbose logging (mirror the log file on stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Log level for the session log file (DEBUG, INFO, WARNING, ERROR)
    #[arg(long, global = true, default_value = "INFO", env = "AMPFLOW_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import every measurement-log file under a directory
    Ingest {
        /// Directory to import
        root: PathBuf,

        /// Store file (default: ~/.ampflow/ampflow.sqlite3)
        #[arg(long = "db")]
        db: Option<PathBuf>,

        /// Rows per write transaction
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Parallel parse workers
        #[arg(long)]
        threads: Option<usize>,

        /// Input file extension (no leading dot)
        #[arg(long, default_value = "csv")]
        ext: String,
    },

    /// List the model names present in the store
    Models {
        /// Store file (default: ~/.ampflow/ampflow.sqlite3)
        #[arg(long = "db")]
        db: Option<PathBuf>,
    },

    /// Min/max/avg statistics for one model
    Stats {
        /// Model name to summarize
        model: String,

        /// Store file (default: ~/.ampflow/ampflow.sqlite3)
        #[arg(long = "db")]
        db: Option<PathBuf>,
    },

    /// List a model's measurement locations (passing rows only)
    Locations {
        /// Model name to inspect
        model: String,

        /// Store file (default: ~/.ampflow/ampflow.sqlite3)
        #[arg(long = "db")]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    let log_level: LogLevel = match args.log_level.parse() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let default_filter = format!("ampflow={}", log_level.as_filter());
    if let Err(e) = init_logging(LogConfig {
        app_name: "ampflow",
        default_filter: &default_filter,
        verbose: args.verbose,
    }) {
        eprintln!("error: failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match dispatch(args.command, log_level).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Commands, log_level: LogLevel) -> Result<ExitCode> {
    match command {
        Commands::Ingest {
            root,
            db,
            chunk_size,
            threads,
            ext,
        } => {
            cli::ingest::run(cli::ingest::IngestArgs {
                root,
                db,
                chunk_size,
                threads,
                ext,
                log_level,
            })
            .await
        }
        Commands::Models { db } => cli::query::models(db).await,
        Commands::Stats { model, db } => cli::query::stats(&model, db).await,
        Commands::Locations { model, db } => cli::query::locations(&model, db).await,
    }
}

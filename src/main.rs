//! Rank history CLI.
//!
//! Scans a KovaaK's-style stats directory, replays every observed date
//! through the rank calculator executable, and prints the reconstructed
//! history as JSON.
//!
//! Usage:
//!   rank-history --stats-dir ~/stats --calculator ./kovaaks-rank-cli \
//!     --benchmark "Voltaic S5" --difficulty Advanced

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rank_history::calculator::cli::{CliRankCalculator, DEFAULT_CALL_TIMEOUT};
use rank_history::dispatch::{DEFAULT_BATCH_SIZE, DEFAULT_WORKER_COUNT};
use rank_history::{BenchmarkQuery, EngineConfig, HistoryEngine, HistoryPoint, RunReport};

#[derive(Parser, Debug)]
#[command(name = "rank-history")]
#[command(about = "Reconstruct benchmark rank history from local score logs")]
struct Cli {
    /// Directory holding per-session score logs
    #[arg(long, env = "KOVAAKS_STATS_DIR")]
    stats_dir: PathBuf,

    /// Path to the rank calculator executable
    #[arg(long, env = "RANK_CLI_PATH")]
    calculator: PathBuf,

    /// Benchmark name, e.g. "Voltaic S5"
    #[arg(long)]
    benchmark: String,

    /// Difficulty name, e.g. "Advanced"
    #[arg(long)]
    difficulty: String,

    /// Steam id; structure fetches accept a dummy value
    #[arg(long, env = "STEAM_ID", default_value = "00000000000000000")]
    steam_id: String,

    /// Dates per calculator call
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Concurrent calculator calls
    #[arg(long, default_value_t = DEFAULT_WORKER_COUNT)]
    workers: usize,

    /// Per-call timeout in seconds
    #[arg(long, default_value_t = DEFAULT_CALL_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Write JSON output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunOutput<'a> {
    history: &'a [HistoryPoint],
    rank_names: &'a [String],
    report: &'a RunReport,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let calculator = Arc::new(CliRankCalculator::new(
        cli.calculator,
        Duration::from_secs(cli.timeout_secs),
    ));
    let engine = HistoryEngine::new(
        calculator,
        EngineConfig {
            stats_dir: cli.stats_dir,
            batch_size: cli.batch_size,
            worker_count: cli.workers,
        },
    );
    let query = BenchmarkQuery {
        steam_id: cli.steam_id,
        benchmark: cli.benchmark,
        difficulty: cli.difficulty,
    };

    let reconstruction = engine.reconstruct(&query).await?;

    let output = RunOutput {
        history: &reconstruction.history,
        rank_names: &reconstruction.rank_names,
        report: &reconstruction.report,
    };
    let json = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "History written");
        }
        None => println!("{json}"),
    }

    if reconstruction.report.batches_failed > 0 {
        info!(
            failed = reconstruction.report.batches_failed,
            "Some batches failed; the history has gaps"
        );
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rank_history=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

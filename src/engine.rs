//! Run orchestration: structure fetch → stats scan → override series →
//! batch dispatch → assembled history.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::calculator::protocol::{BenchmarkQuery, DateOverrides};
use crate::calculator::RankCalculator;
use crate::dispatch::{dispatch_batches, partition_batches};
use crate::models::{EngineConfig, HistoryPoint, RunReport};
use crate::stats::scan_stats_dir;

/// Result of one reconstruction run: the (possibly gappy) history, the
/// benchmark's display rank names, and the run counters.
#[derive(Debug)]
pub struct Reconstruction {
    pub history: Vec<HistoryPoint>,
    pub rank_names: Vec<String>,
    pub report: RunReport,
}

/// Rank history reconstruction engine.
///
/// Holds no state across runs; every invocation re-scans the stats
/// directory and re-fetches the benchmark structure.
pub struct HistoryEngine {
    calculator: Arc<dyn RankCalculator>,
    config: EngineConfig,
}

impl HistoryEngine {
    pub fn new(calculator: Arc<dyn RankCalculator>, config: EngineConfig) -> Self {
        Self { calculator, config }
    }

    /// Reconstruct the rank history for one benchmark.
    ///
    /// Fatal errors: unreachable stats directory, failed structure fetch, or
    /// a benchmark with no scenarios. Everything else (unparseable files,
    /// failed batches) degrades the history and shows up in the report.
    pub async fn reconstruct(&self, query: &BenchmarkQuery) -> Result<Reconstruction> {
        let started = Instant::now();

        let structure = self
            .calculator
            .fetch_structure(query)
            .await
            .with_context(|| {
                format!(
                    "Failed to fetch structure for {} ({})",
                    query.benchmark, query.difficulty
                )
            })?;
        let order = structure.scenario_order();
        if order.is_empty() {
            bail!(
                "Benchmark {} ({}) has no scenarios",
                query.benchmark,
                query.difficulty
            );
        }
        let rank_names = structure.rank_names();
        info!(
            benchmark = %query.benchmark,
            difficulty = %query.difficulty,
            scenarios = order.len(),
            ranks = rank_names.len(),
            "Benchmark structure fetched"
        );

        let stats_dir = self.config.stats_dir.clone();
        let targets = order.clone();
        let (index, scan) = tokio::task::spawn_blocking(move || {
            scan_stats_dir(&stats_dir, &targets)
        })
        .await
        .context("Stats scan task panicked")??;

        let mut report = RunReport {
            files_seen: scan.files_seen,
            records_parsed: scan.records_parsed,
            files_skipped: scan.files_skipped,
            dates_total: index.date_count(),
            ..RunReport::default()
        };

        let series = index.override_series(&order);
        if series.is_empty() {
            info!("No dated observations found; history is empty");
            return Ok(Reconstruction {
                history: Vec::new(),
                rank_names,
                report,
            });
        }

        let items: Vec<DateOverrides> = series
            .into_iter()
            .map(|(date, score_overrides)| DateOverrides {
                date,
                score_overrides,
            })
            .collect();
        let batches = partition_batches(items, self.config.batch_size);

        let outcome = dispatch_batches(
            self.calculator.clone(),
            query.clone(),
            batches,
            self.config.worker_count,
        )
        .await;
        report.batches_total = outcome.batches_total;
        report.batches_failed = outcome.batches_failed;

        let history = assemble_history(outcome.points);
        info!(
            points = history.len(),
            dates = report.dates_total,
            failed_batches = report.batches_failed,
            elapsed = ?started.elapsed(),
            "Reconstruction complete"
        );
        Ok(Reconstruction {
            history,
            rank_names,
            report,
        })
    }
}

/// Merge completed batches into one chronological series.
///
/// Batch partitioning guarantees each date appears in exactly one batch, so
/// a sort by date is all the reassembly needed.
pub fn assemble_history(mut points: Vec<HistoryPoint>) -> Vec<HistoryPoint> {
    points.sort_by_key(|point| point.date);
    points
}

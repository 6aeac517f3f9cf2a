//! End-to-end reconstruction runs against an in-process fake calculator and
//! a scratch stats directory.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

use rank_history::calculator::protocol::{
    BenchmarkQuery, BenchmarkStructure, DateOverrides, RankDetails, RankResult,
};
use rank_history::calculator::RankCalculator;
use rank_history::{EngineConfig, HistoryEngine};

const STRUCTURE_JSON: &str = r#"{
    "categories": {
        "Tracking": {"scenarios": {"Sphere Track": {}, "Ground Track": {}}},
        "Flicking": {"scenarios": {"B180 Flick": {}}}
    },
    "ranks": [{"name": "Iron"}, {"name": "Bronze"}, {"name": "Silver"}, {"name": "Gold"}]
}"#;

/// Ranks a date by how many scenarios have a positive override, and records
/// every override vector it was sent.
struct FakeCalculator {
    poison: Vec<NaiveDate>,
    seen: Mutex<Vec<(NaiveDate, Vec<f64>)>>,
}

impl FakeCalculator {
    fn new() -> Self {
        Self {
            poison: Vec::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn with_poison(dates: Vec<NaiveDate>) -> Self {
        Self {
            poison: dates,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen_vectors(&self) -> Vec<(NaiveDate, Vec<f64>)> {
        let mut seen = self.seen.lock().unwrap().clone();
        seen.sort_by_key(|(date, _)| *date);
        seen
    }
}

#[async_trait]
impl RankCalculator for FakeCalculator {
    async fn fetch_structure(&self, _query: &BenchmarkQuery) -> Result<BenchmarkStructure> {
        Ok(serde_json::from_str(STRUCTURE_JSON).unwrap())
    }

    async fn rank_batch(
        &self,
        _query: &BenchmarkQuery,
        batch: &[DateOverrides],
    ) -> Result<Vec<RankResult>> {
        {
            let mut seen = self.seen.lock().unwrap();
            for item in batch {
                seen.push((
                    item.date,
                    item.score_overrides.iter().map(|s| s.wire_value()).collect(),
                ));
            }
        }
        if batch.iter().any(|item| self.poison.contains(&item.date)) {
            bail!("injected batch failure");
        }
        Ok(batch
            .iter()
            .map(|item| {
                let played = item
                    .score_overrides
                    .iter()
                    .filter(|s| s.wire_value() > 0.0)
                    .count() as u32;
                RankResult {
                    date: item.date,
                    rank: played,
                    rank_name: format!("Rank {played}"),
                    details: Some(RankDetails {
                        harmonic_mean: Some(100.0 * played as f64),
                        progress_to_next_rank: Some(0.25),
                    }),
                }
            })
            .collect())
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn write_log(dir: &Path, scenario: &str, stamp: &str, body: &str) {
    let name = format!("{scenario} - CHALLENGE - {stamp} Stats.csv");
    std::fs::write(dir.join(name), body).unwrap();
}

/// Stats fixture with four distinct dates across two target scenarios, one
/// malformed file name, one foreign scenario, and one log missing its score
/// line (contributing a date but no record).
fn populate_stats(dir: &Path) {
    write_log(dir, "Sphere Track", "2024.01.01-09.00.00", "Score:,100.0\n");
    write_log(dir, "Sphere Track", "2024.02.01-09.00.00", "Score:,200.0\n");
    write_log(dir, "B180 Flick", "2024.02.15-21.30.00", "Score:,50.0\n");
    write_log(dir, "Sphere Track", "2024.03.01-09.00.00", "Kills:,4\n");
    write_log(dir, "Some Other Scenario", "2024.04.01-09.00.00", "Score:,77.0\n");
    std::fs::write(dir.join("BadFile.csv"), "Score:,1.0\n").unwrap();
}

fn engine(calculator: Arc<FakeCalculator>, stats_dir: &Path, batch_size: usize) -> HistoryEngine {
    HistoryEngine::new(
        calculator,
        EngineConfig {
            stats_dir: stats_dir.to_path_buf(),
            batch_size,
            worker_count: 4,
        },
    )
}

fn query() -> BenchmarkQuery {
    BenchmarkQuery {
        steam_id: "00000000000000000".to_string(),
        benchmark: "Voltaic S5".to_string(),
        difficulty: "Advanced".to_string(),
    }
}

#[tokio::test]
async fn test_full_reconstruction() {
    let dir = tempfile::tempdir().unwrap();
    populate_stats(dir.path());
    let calculator = Arc::new(FakeCalculator::new());

    let reconstruction = engine(calculator.clone(), dir.path(), 2)
        .reconstruct(&query())
        .await
        .unwrap();

    // One point per distinct date, ascending, no duplicates.
    let dates: Vec<NaiveDate> = reconstruction.history.iter().map(|p| p.date).collect();
    assert_eq!(
        dates,
        vec![d(2024, 1, 1), d(2024, 2, 1), d(2024, 2, 15), d(2024, 3, 1)]
    );
    let unique: BTreeSet<NaiveDate> = dates.iter().copied().collect();
    assert_eq!(unique.len(), dates.len());

    // Running-maximum override vectors in canonical scenario order
    // (Sphere Track, Ground Track, B180 Flick).
    assert_eq!(
        calculator.seen_vectors(),
        vec![
            (d(2024, 1, 1), vec![100.0, 0.0, 0.0]),
            (d(2024, 2, 1), vec![200.0, 0.0, 0.0]),
            (d(2024, 2, 15), vec![200.0, 0.0, 50.0]),
            (d(2024, 3, 1), vec![200.0, 0.0, 50.0]),
        ]
    );

    assert_eq!(reconstruction.history[2].rank, 2);
    assert_eq!(reconstruction.history[2].rank_name, "Rank 2");
    assert_eq!(reconstruction.history[2].energy, Some(200.0));

    assert_eq!(
        reconstruction.rank_names,
        vec!["Iron", "Bronze", "Silver", "Gold"]
    );

    let report = &reconstruction.report;
    assert_eq!(report.files_seen, 5);
    assert_eq!(report.records_parsed, 3);
    // BadFile.csv plus the log with no score line.
    assert_eq!(report.files_skipped, 2);
    assert_eq!(report.dates_total, 4);
    assert_eq!(report.batches_total, 2);
    assert_eq!(report.batches_failed, 0);
}

#[tokio::test]
async fn test_failed_batch_leaves_a_gap() {
    let dir = tempfile::tempdir().unwrap();
    populate_stats(dir.path());
    // Batch size 2 puts 2024-01-01 and 2024-02-01 in the poisoned batch.
    let calculator = Arc::new(FakeCalculator::with_poison(vec![d(2024, 2, 1)]));

    let reconstruction = engine(calculator, dir.path(), 2)
        .reconstruct(&query())
        .await
        .unwrap();

    let dates: Vec<NaiveDate> = reconstruction.history.iter().map(|p| p.date).collect();
    assert_eq!(dates, vec![d(2024, 2, 15), d(2024, 3, 1)]);
    assert_eq!(reconstruction.report.batches_total, 2);
    assert_eq!(reconstruction.report.batches_failed, 1);
    assert_eq!(reconstruction.report.dates_total, 4);
}

#[tokio::test]
async fn test_reruns_send_identical_override_vectors() {
    let dir = tempfile::tempdir().unwrap();
    populate_stats(dir.path());

    let first = Arc::new(FakeCalculator::new());
    engine(first.clone(), dir.path(), 3)
        .reconstruct(&query())
        .await
        .unwrap();

    let second = Arc::new(FakeCalculator::new());
    engine(second.clone(), dir.path(), 3)
        .reconstruct(&query())
        .await
        .unwrap();

    assert_eq!(first.seen_vectors(), second.seen_vectors());
}

#[tokio::test]
async fn test_missing_stats_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    let calculator = Arc::new(FakeCalculator::new());

    assert!(engine(calculator, &missing, 2)
        .reconstruct(&query())
        .await
        .is_err());
}

#[tokio::test]
async fn test_empty_stats_directory_yields_empty_history() {
    let dir = tempfile::tempdir().unwrap();
    let calculator = Arc::new(FakeCalculator::new());

    let reconstruction = engine(calculator.clone(), dir.path(), 2)
        .reconstruct(&query())
        .await
        .unwrap();
    assert!(reconstruction.history.is_empty());
    assert_eq!(reconstruction.report.batches_total, 0);
    assert!(calculator.seen_vectors().is_empty());
}

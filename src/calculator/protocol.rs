//! Wire types for the rank-calculator process protocol.
//!
//! One JSON object in on stdin, one JSON object out on stdout (or stderr).
//! Two request shapes: a structure fetch (`fetchOnly`) used once per run to
//! obtain the canonical scenario order and rank names, and a batch rank
//! request carrying per-date score-override vectors.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{HistoryPoint, ScoreOverride};

/// Identifies the benchmark a run is reconstructing.
#[derive(Debug, Clone)]
pub struct BenchmarkQuery {
    pub steam_id: String,
    pub benchmark: String,
    pub difficulty: String,
}

/// Score overrides for one replayed date. The vector is positional: one slot
/// per scenario in the benchmark's canonical order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateOverrides {
    pub date: NaiveDate,
    pub score_overrides: Vec<ScoreOverride>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRankRequest<'a> {
    pub steam_id: &'a str,
    pub benchmark_name: &'a str,
    pub difficulty: &'a str,
    pub batch_overrides: &'a [DateOverrides],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureRequest<'a> {
    pub steam_id: &'a str,
    pub benchmark_name: &'a str,
    pub difficulty: &'a str,
    pub fetch_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRankResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub results: Vec<RankResult>,
}

/// Calculated rank for one replayed date.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankResult {
    pub date: NaiveDate,
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub rank_name: String,
    #[serde(default)]
    pub details: Option<RankDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankDetails {
    #[serde(default)]
    pub harmonic_mean: Option<f64>,
    #[serde(default)]
    pub progress_to_next_rank: Option<f64>,
}

impl From<RankResult> for HistoryPoint {
    fn from(result: RankResult) -> Self {
        let details = result.details.unwrap_or_default();
        HistoryPoint {
            date: result.date,
            rank: result.rank,
            rank_name: result.rank_name,
            energy: details.harmonic_mean,
            progress: details.progress_to_next_rank.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<BenchmarkStructure>,
}

/// Benchmark layout as the calculator reports it.
///
/// Categories keep their JSON object order: the calculator addresses
/// scenarios by slot index, so the order the structure arrives in IS the
/// canonical order for every override vector of the run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BenchmarkStructure {
    #[serde(default)]
    pub categories: serde_json::Map<String, Value>,
    #[serde(default)]
    pub ranks: Vec<RankInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankInfo {
    pub name: String,
}

impl BenchmarkStructure {
    /// Scenario names across all categories, in calculator order.
    pub fn scenario_order(&self) -> Vec<String> {
        let mut order = Vec::new();
        for category in self.categories.values() {
            if let Some(scenarios) = category.get("scenarios").and_then(Value::as_object) {
                order.extend(scenarios.keys().cloned());
            }
        }
        order
    }

    /// Display rank names, lowest first.
    pub fn rank_names(&self) -> Vec<String> {
        self.ranks.iter().map(|r| r.name.clone()).collect()
    }
}

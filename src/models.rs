use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::dispatch::{DEFAULT_BATCH_SIZE, DEFAULT_WORKER_COUNT};

/// One slot of a score-override vector sent to the rank calculator.
///
/// The calculator identifies scenarios positionally, not by name, and its
/// wire format encodes "no score" states as magic floats. Keeping the states
/// tagged here means a legitimate score can never be confused with a
/// sentinel; the floats only appear at the serialization boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreOverride {
    /// Best score known as of the query date.
    Best(f64),
    /// No qualifying score as of the query date. The calculator treats the
    /// scenario as unplayed (wire value 0).
    NotYet,
    /// Defer to whatever score the calculator already has on record
    /// (wire sentinel -1). Not produced by the history engine; available to
    /// callers that want live data for some slots.
    Stored,
}

impl ScoreOverride {
    /// Float the calculator protocol expects for this slot.
    pub fn wire_value(&self) -> f64 {
        match self {
            ScoreOverride::Best(score) => *score,
            ScoreOverride::NotYet => 0.0,
            ScoreOverride::Stored => -1.0,
        }
    }
}

impl Serialize for ScoreOverride {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.wire_value())
    }
}

/// The calculator's answer for one date, tagged back with that date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub rank: u32,
    pub rank_name: String,
    /// Harmonic-mean energy, absent for rank-index-only benchmarks.
    pub energy: Option<f64>,
    /// Progress toward the next rank, 0.0-1.0.
    pub progress: f64,
}

/// Aggregate counters for one reconstruction run.
///
/// A completed run always reports these alongside the (possibly incomplete)
/// history: per-file parse problems and failed batches degrade the output,
/// they never abort it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Score-log files seen in the stats directory.
    pub files_seen: usize,
    /// Files that yielded a (scenario, date, score) record.
    pub records_parsed: usize,
    /// Candidate files skipped for a malformed name, bad date, or missing
    /// score line.
    pub files_skipped: usize,
    /// Distinct calendar dates observed across all scenarios.
    pub dates_total: usize,
    /// Calculator batches dispatched.
    pub batches_total: usize,
    /// Batches dropped after a transport or calculator failure; their dates
    /// are gaps in the history.
    pub batches_failed: usize,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding per-session score logs.
    pub stats_dir: PathBuf,
    /// Dates per calculator call.
    pub batch_size: usize,
    /// Concurrent calculator calls.
    pub worker_count: usize,
}

impl EngineConfig {
    pub fn new(stats_dir: impl Into<PathBuf>) -> Self {
        Self {
            stats_dir: stats_dir.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            worker_count: DEFAULT_WORKER_COUNT,
        }
    }
}

//! Score-log scanner.
//!
//! Walks a stats directory once and folds every parseable score log into a
//! [`TimelineIndex`]. File names look like
//! `Scenario Name - Mode - 2024.01.05-10.30.00 Stats.csv`; the score sits in
//! the file body on the first line starting with `Score:`, second
//! comma-delimited token. Anything that fails to parse is skipped and
//! counted, never fatal; only a missing or unreadable directory aborts.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::timeline::TimelineIndex;

/// Suffix marking a per-session score log.
pub const STATS_SUFFIX: &str = " Stats.csv";
/// Field delimiter inside log file names.
const NAME_DELIMITER: &str = " - ";
/// Timestamp format of the trailing file-name field.
const TIMESTAMP_FORMAT: &str = "%Y.%m.%d-%H.%M.%S";
/// Marker of the score line inside a log file.
const SCORE_MARKER: &str = "Score:";

/// Counters from one directory walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Files matching the score-log suffix.
    pub files_seen: usize,
    /// Files that yielded a (scenario, date, score) record.
    pub records_parsed: usize,
    /// `.csv` entries skipped: wrong suffix, malformed name, unparseable
    /// date, or no usable score line.
    pub files_skipped: usize,
}

/// Scan `dir` for score logs of the `targets` scenarios.
///
/// Returns the finalized timeline index (including the distinct-date set)
/// together with the scan counters. Directory entries are visited in
/// whatever order the filesystem yields; the index sorts before any query,
/// so the result does not depend on that order.
pub fn scan_stats_dir(dir: &Path, targets: &[String]) -> Result<(TimelineIndex, ScanReport)> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read stats directory {}", dir.display()))?;

    let target_set: HashSet<&str> = targets.iter().map(String::as_str).collect();
    let mut index = TimelineIndex::new(targets);
    let mut report = ScanReport::default();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "Unreadable directory entry, skipping");
                continue;
            }
        };
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if !name.ends_with(".csv") {
            continue;
        }
        if !name.ends_with(STATS_SUFFIX) {
            debug!(file = %name, "Not a score log, skipping");
            report.files_skipped += 1;
            continue;
        }
        report.files_seen += 1;

        let fields: Vec<&str> = name.split(NAME_DELIMITER).collect();
        if fields.len() < 3 {
            debug!(file = %name, "Malformed log name, skipping");
            report.files_skipped += 1;
            continue;
        }

        let scenario = fields[0].trim();
        if !target_set.contains(scenario) {
            // A valid log for some other benchmark's scenario.
            continue;
        }

        let stamp = fields
            .last()
            .and_then(|f| f.strip_suffix(STATS_SUFFIX))
            .map(str::trim)
            .unwrap_or("");
        let date = match NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT) {
            Ok(dt) => dt.date(),
            Err(e) => {
                debug!(file = %name, error = %e, "Bad timestamp in log name, skipping");
                report.files_skipped += 1;
                continue;
            }
        };

        // The date comes from the file name; it counts even when the score
        // line below turns out to be missing.
        index.note_date(date);

        match read_score(&entry.path()) {
            Some(score) => {
                index.record(scenario, date, score);
                report.records_parsed += 1;
            }
            None => {
                debug!(file = %name, "No usable score line, skipping");
                report.files_skipped += 1;
            }
        }
    }

    index.finalize();
    info!(
        files = report.files_seen,
        records = report.records_parsed,
        skipped = report.files_skipped,
        dates = index.date_count(),
        "Stats scan complete"
    );
    Ok((index, report))
}

/// Pull the score out of one log file.
///
/// Reads line-wise and stops at the first `Score:` line; the score is
/// expected once per file near the top. Log files in the wild carry stray
/// bytes, so lines are decoded lossily rather than rejected.
fn read_score(path: &Path) -> Option<f64> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).ok()?;
        if n == 0 {
            return None;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end();
        if !line.starts_with(SCORE_MARKER) {
            continue;
        }
        return line
            .split(',')
            .nth(1)
            .and_then(|token| token.trim().parse::<f64>().ok());
    }
}

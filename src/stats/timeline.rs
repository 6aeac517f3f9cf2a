//! Per-scenario score timelines and override vector construction.
//!
//! The index maps each target scenario to its dated observations and owns
//! the set of distinct observation dates. Override vectors are computed with
//! a running maximum over each scenario's sorted timeline, so replaying the
//! full date series costs one pass per scenario instead of one scan per
//! (scenario, date) pair.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::models::ScoreOverride;

/// One parsed score observation. Duplicate dates for a scenario are all
/// retained; a session can run multiple times the same day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub score: f64,
}

/// Scenario timelines plus the distinct-date set for one reconstruction run.
#[derive(Debug, Clone, Default)]
pub struct TimelineIndex {
    timelines: HashMap<String, Vec<Observation>>,
    dates: BTreeSet<NaiveDate>,
    sorted: bool,
}

impl TimelineIndex {
    /// Empty index pre-seeded with the target scenario names.
    pub fn new(targets: &[String]) -> Self {
        Self {
            timelines: targets
                .iter()
                .map(|name| (name.clone(), Vec::new()))
                .collect(),
            dates: BTreeSet::new(),
            sorted: true,
        }
    }

    /// Mark a calendar date as observed. Dates come from file names, so a
    /// file whose score line is missing still contributes its date.
    pub fn note_date(&mut self, date: NaiveDate) {
        self.dates.insert(date);
    }

    /// Fold one score observation into its scenario's timeline.
    pub fn record(&mut self, scenario: &str, date: NaiveDate, score: f64) {
        self.note_date(date);
        self.timelines
            .entry(scenario.to_string())
            .or_default()
            .push(Observation { date, score });
        self.sorted = false;
    }

    /// Sort every timeline by (date, score). Insertion follows filesystem
    /// iteration order, which carries no guarantee; queries only run against
    /// the sorted form so results are deterministic.
    pub fn finalize(&mut self) {
        for timeline in self.timelines.values_mut() {
            timeline.sort_by(|a, b| {
                a.date
                    .cmp(&b.date)
                    .then(a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
            });
        }
        self.sorted = true;
    }

    /// Distinct observation dates in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.dates.iter().copied().collect()
    }

    pub fn date_count(&self) -> usize {
        self.dates.len()
    }

    pub fn observation_count(&self) -> usize {
        self.timelines.values().map(Vec::len).sum()
    }

    /// Best score for `scenario` among observations on or before `date`.
    ///
    /// `NotYet` both when the scenario has never been observed and when its
    /// observations all fall after `date`; the calculator protocol does not
    /// distinguish the two.
    pub fn best_as_of(&self, scenario: &str, date: NaiveDate) -> ScoreOverride {
        debug_assert!(self.sorted, "query before finalize()");
        let Some(timeline) = self.timelines.get(scenario) else {
            return ScoreOverride::NotYet;
        };
        let mut best: Option<f64> = None;
        for obs in timeline {
            if obs.date > date {
                break;
            }
            best = Some(best.map_or(obs.score, |b| b.max(obs.score)));
        }
        match best {
            Some(score) => ScoreOverride::Best(score),
            None => ScoreOverride::NotYet,
        }
    }

    /// Override vector for a single date, one slot per scenario in the
    /// caller-supplied canonical order.
    pub fn override_vector(&self, order: &[String], date: NaiveDate) -> Vec<ScoreOverride> {
        order
            .iter()
            .map(|name| self.best_as_of(name, date))
            .collect()
    }

    /// One override vector per distinct date, ascending.
    ///
    /// Walks each scenario's sorted timeline once, advancing a running
    /// maximum as the dates advance: O(observations + dates) per scenario.
    pub fn override_series(&self, order: &[String]) -> Vec<(NaiveDate, Vec<ScoreOverride>)> {
        debug_assert!(self.sorted, "query before finalize()");
        let dates = self.dates();
        let mut vectors: Vec<Vec<ScoreOverride>> = dates
            .iter()
            .map(|_| Vec::with_capacity(order.len()))
            .collect();

        for name in order {
            let timeline = self
                .timelines
                .get(name)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let mut next = 0;
            let mut best: Option<f64> = None;
            for (i, date) in dates.iter().enumerate() {
                while next < timeline.len() && timeline[next].date <= *date {
                    let score = timeline[next].score;
                    best = Some(best.map_or(score, |b| b.max(score)));
                    next += 1;
                }
                vectors[i].push(match best {
                    Some(score) => ScoreOverride::Best(score),
                    None => ScoreOverride::NotYet,
                });
            }
        }

        dates.into_iter().zip(vectors).collect()
    }
}

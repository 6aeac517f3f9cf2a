//! Rank calculator client.
//!
//! The rank math lives in an external executable; this crate only speaks its
//! process protocol. The trait keeps that seam abstract so the dispatcher
//! and engine are testable without spawning real processes.

pub mod cli;
pub mod protocol;

use anyhow::Result;
use async_trait::async_trait;

use self::protocol::{BenchmarkQuery, BenchmarkStructure, DateOverrides, RankResult};

pub use self::cli::CliRankCalculator;

/// Source of rank truth for a benchmark.
#[async_trait]
pub trait RankCalculator: Send + Sync {
    /// Fetch the benchmark structure: canonical scenario order + rank names.
    /// Called once per run, before the reconstruction loop.
    async fn fetch_structure(&self, query: &BenchmarkQuery) -> Result<BenchmarkStructure>;

    /// Rank one batch of replayed dates. Any failure (transport, timeout,
    /// malformed response, calculator-reported error) loses exactly this
    /// batch.
    async fn rank_batch(
        &self,
        query: &BenchmarkQuery,
        batch: &[DateOverrides],
    ) -> Result<Vec<RankResult>>;
}

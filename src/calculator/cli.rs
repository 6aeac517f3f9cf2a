//! Process transport for the rank calculator CLI.
//!
//! Each call spawns the executable, writes one JSON request to its stdin and
//! reads one JSON reply before the process exits. Some builds of the CLI
//! report errors on stderr, so stdout is tried first and stderr second; exit
//! status is irrelevant once a parseable reply is in hand. The whole round
//! trip runs under a deadline, and `kill_on_drop` reaps the child if the
//! deadline (or the caller) abandons it mid-flight.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::protocol::{
    BatchRankRequest, BatchRankResponse, BenchmarkQuery, BenchmarkStructure, DateOverrides,
    RankResult, StructureRequest, StructureResponse,
};
use super::RankCalculator;

/// Default deadline for one calculator round trip.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Client for the rank calculator executable.
pub struct CliRankCalculator {
    executable: PathBuf,
    call_timeout: Duration,
}

impl CliRankCalculator {
    pub fn new(executable: impl Into<PathBuf>, call_timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            call_timeout,
        }
    }

    async fn round_trip<R: Serialize>(&self, request: &R) -> Result<Value> {
        let payload = serde_json::to_vec(request).context("Failed to encode request")?;

        let exchange = async {
            let mut child = Command::new(&self.executable)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .with_context(|| {
                    format!("Failed to launch rank calculator {}", self.executable.display())
                })?;

            let mut stdin = child
                .stdin
                .take()
                .context("Rank calculator stdin unavailable")?;

            // Write and read concurrently; a calculator that streams its
            // reply before draining stdin must not deadlock us.
            let write = async {
                stdin.write_all(&payload).await?;
                stdin.shutdown().await?;
                drop(stdin);
                Ok::<(), std::io::Error>(())
            };
            let (write_result, output) = tokio::join!(write, child.wait_with_output());
            if let Err(e) = write_result {
                // Usually EPIPE from a child that bailed early; its reply
                // (or lack of one) tells the real story below.
                debug!(error = %e, "Short write to rank calculator");
            }
            output.context("Failed to collect rank calculator output")
        };

        let output = timeout(self.call_timeout, exchange)
            .await
            .map_err(|_| {
                anyhow!(
                    "Rank calculator timed out after {:.0?}",
                    self.call_timeout
                )
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Ok(value) = serde_json::from_str::<Value>(stdout.trim()) {
            return Ok(value);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if let Ok(value) = serde_json::from_str::<Value>(stderr.trim()) {
            return Ok(value);
        }
        bail!(
            "Rank calculator returned no parseable JSON (exit {:?}); stdout: {:?}; stderr: {:?}",
            output.status.code(),
            truncate(&stdout),
            truncate(&stderr)
        );
    }
}

#[async_trait]
impl RankCalculator for CliRankCalculator {
    async fn fetch_structure(&self, query: &BenchmarkQuery) -> Result<BenchmarkStructure> {
        let request = StructureRequest {
            steam_id: &query.steam_id,
            benchmark_name: &query.benchmark,
            difficulty: &query.difficulty,
            fetch_only: true,
        };
        let reply = self.round_trip(&request).await?;
        let response: StructureResponse =
            serde_json::from_value(reply).context("Malformed structure response")?;
        if !response.success {
            bail!(
                "Structure fetch failed: {}",
                response.error.as_deref().unwrap_or("Unknown error")
            );
        }
        response
            .data
            .context("Structure response missing data object")
    }

    async fn rank_batch(
        &self,
        query: &BenchmarkQuery,
        batch: &[DateOverrides],
    ) -> Result<Vec<RankResult>> {
        let request = BatchRankRequest {
            steam_id: &query.steam_id,
            benchmark_name: &query.benchmark,
            difficulty: &query.difficulty,
            batch_overrides: batch,
        };
        let reply = self.round_trip(&request).await?;
        let response: BatchRankResponse =
            serde_json::from_value(reply).context("Malformed batch response")?;
        if !response.success {
            bail!(
                "Batch rejected: {}",
                response.error.as_deref().unwrap_or("Unknown error")
            );
        }
        Ok(response.results)
    }
}

fn truncate(s: &str) -> &str {
    let cut = s.len().min(200);
    let mut end = cut;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

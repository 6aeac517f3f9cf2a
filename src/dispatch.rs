//! Batch dispatcher.
//!
//! Partitions the replayed date series into fixed-size batches and feeds
//! them to the rank calculator from a bounded pool of workers. Workers drain
//! a shared job queue and hand outcomes to a single collecting loop, so the
//! only cross-task state is the two channels. Completion order is
//! irrelevant: every result carries its own date and the assembler sorts at
//! the end. A failed batch loses only its own dates.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::calculator::protocol::{BenchmarkQuery, DateOverrides};
use crate::calculator::RankCalculator;
use crate::models::HistoryPoint;

/// Dates per calculator call; amortizes the per-process overhead of the
/// transport.
pub const DEFAULT_BATCH_SIZE: usize = 50;
/// Concurrent calculator calls.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// What came back from one dispatch run.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// History points from all completed batches, in completion order.
    pub points: Vec<HistoryPoint>,
    pub batches_total: usize,
    pub batches_failed: usize,
}

/// Split per-date override items into calculator-call-sized batches.
pub fn partition_batches(items: Vec<DateOverrides>, batch_size: usize) -> Vec<Vec<DateOverrides>> {
    items
        .chunks(batch_size.max(1))
        .map(<[DateOverrides]>::to_vec)
        .collect()
}

/// Run every batch through the calculator under bounded concurrency.
pub async fn dispatch_batches(
    calculator: Arc<dyn RankCalculator>,
    query: BenchmarkQuery,
    batches: Vec<Vec<DateOverrides>>,
    worker_count: usize,
) -> DispatchOutcome {
    let total = batches.len();
    if total == 0 {
        return DispatchOutcome::default();
    }

    let (job_tx, job_rx) = mpsc::channel::<(usize, Vec<DateOverrides>)>(total);
    for job in batches.into_iter().enumerate() {
        // Capacity equals the batch count, so this never blocks.
        let _ = job_tx.send(job).await;
    }
    drop(job_tx);
    let job_rx = Arc::new(Mutex::new(job_rx));

    let (result_tx, mut result_rx) = mpsc::channel::<anyhow::Result<Vec<HistoryPoint>>>(total);
    let workers = worker_count.max(1).min(total);

    for worker in 0..workers {
        let jobs = job_rx.clone();
        let results = result_tx.clone();
        let calculator = calculator.clone();
        let query = query.clone();
        tokio::spawn(async move {
            loop {
                let job = { jobs.lock().await.recv().await };
                let Some((index, batch)) = job else {
                    break;
                };
                debug!(worker, batch = index, dates = batch.len(), "Dispatching batch");
                let outcome = calculator
                    .rank_batch(&query, &batch)
                    .await
                    .map(|ranked| ranked.into_iter().map(HistoryPoint::from).collect());
                if results.send(outcome).await.is_err() {
                    break;
                }
            }
        });
    }
    drop(result_tx);

    let mut outcome = DispatchOutcome {
        points: Vec::new(),
        batches_total: total,
        batches_failed: 0,
    };
    while let Some(result) = result_rx.recv().await {
        match result {
            Ok(mut points) => outcome.points.append(&mut points),
            Err(e) => {
                outcome.batches_failed += 1;
                warn!(error = %e, "Batch failed; its dates are dropped from the history");
            }
        }
    }
    outcome
}

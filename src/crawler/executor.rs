//! Bounded concurrency executor
//!
//! Runs the fetch-and-extract unit for many ad URLs under a fixed ceiling.
//! URLs are scheduled in fixed-size batches; every task in a batch is
//! awaited before the batch is handed to the sink and the next one starts.
//! A failing or panicking task only costs its own item.

use crate::model::{AdRecord, KnownKeys};
use crate::HarvestError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Produces the record for one ad URL
#[async_trait]
pub trait AdSource: Send + Sync {
    async fn fetch_ad(&self, url: &str) -> Result<AdRecord, HarvestError>;
}

/// Receives the records of every finished batch
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn batch_completed(&self, records: Vec<AdRecord>);
}

/// Per-call accounting: `successful.len() + errors + skipped` equals the
/// number of URLs passed in
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub successful: Vec<AdRecord>,
    pub errors: usize,
    pub skipped: usize,
}

impl ExecutionReport {
    pub fn total(&self) -> usize {
        self.successful.len() + self.errors + self.skipped
    }

    fn absorb(&mut self, other: ExecutionReport) {
        self.successful.extend(other.successful);
        self.errors += other.errors;
        self.skipped += other.skipped;
    }
}

enum Outcome {
    Collected(AdRecord),
    Skipped,
    Failed,
}

pub struct Executor {
    source: Arc<dyn AdSource>,
    permits: Arc<Semaphore>,
    batch_size: usize,
    batch_delay: Duration,
}

impl Executor {
    pub fn new(
        source: Arc<dyn AdSource>,
        max_concurrent: usize,
        batch_size: usize,
        batch_delay: Duration,
    ) -> Self {
        Self {
            source,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            batch_size: batch_size.max(1),
            batch_delay,
        }
    }

    /// Processes `urls` batch by batch
    ///
    /// URLs in `known` are skipped without a request. After each batch the
    /// sink receives that batch's records, then the inter-batch pause runs
    /// (not after the last batch). Once `cancel` fires, unstarted items are
    /// counted as errors and in-flight fetches are abandoned.
    pub async fn run(
        &self,
        urls: &[String],
        known: &Arc<KnownKeys>,
        sink: &dyn BatchSink,
        cancel: &CancellationToken,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let batches: Vec<&[String]> = urls.chunks(self.batch_size).collect();
        let batch_count = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            if cancel.is_cancelled() {
                let skipped = batch.iter().filter(|url| known.contains(*url)).count();
                report.skipped += skipped;
                report.errors += batch.len() - skipped;
                continue;
            }

            let batch_report = self.run_batch(batch, known, cancel).await;
            info!(
                "Batch {}/{}: {} collected, {} skipped, {} failed",
                index + 1,
                batch_count,
                batch_report.successful.len(),
                batch_report.skipped,
                batch_report.errors
            );

            if !batch_report.successful.is_empty() {
                sink.batch_completed(batch_report.successful.clone()).await;
            }
            report.absorb(batch_report);

            if index + 1 < batch_count && !self.batch_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.batch_delay) => {}
                }
            }
        }

        report
    }

    async fn run_batch(
        &self,
        batch: &[String],
        known: &Arc<KnownKeys>,
        cancel: &CancellationToken,
    ) -> ExecutionReport {
        let mut tasks = JoinSet::new();

        for (position, url) in batch.iter().enumerate() {
            let url = url.clone();
            let known = Arc::clone(known);
            let source = Arc::clone(&self.source);
            let permits = Arc::clone(&self.permits);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                if known.contains(&url) {
                    debug!("Skipping known ad {}", url);
                    return (position, Outcome::Skipped);
                }

                let _permit = tokio::select! {
                    _ = cancel.cancelled() => return (position, Outcome::Failed),
                    permit = permits.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return (position, Outcome::Failed),
                    },
                };

                // A fetch that is already done wins over a concurrent cancel
                let result = tokio::select! {
                    biased;
                    result = source.fetch_ad(&url) => result,
                    _ = cancel.cancelled() => {
                        debug!("Abandoned {} on shutdown", url);
                        return (position, Outcome::Failed);
                    }
                };

                match result {
                    Ok(record) => (position, Outcome::Collected(record)),
                    Err(e) => {
                        warn!("Failed to collect {}: {}", url, e);
                        (position, Outcome::Failed)
                    }
                }
            });
        }

        let mut collected = Vec::new();
        let mut report = ExecutionReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, Outcome::Collected(record))) => collected.push((position, record)),
                Ok((_, Outcome::Skipped)) => report.skipped += 1,
                Ok((_, Outcome::Failed)) => report.errors += 1,
                Err(e) => {
                    warn!("Ad task did not complete: {}", e);
                    report.errors += 1;
                }
            }
        }

        collected.sort_by_key(|(position, _)| *position);
        report.successful = collected.into_iter().map(|(_, record)| record).collect();
        report
    }
}

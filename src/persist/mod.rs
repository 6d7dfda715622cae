//! Persistence coordinator
//!
//! Moves collected records into the store. Records are appended to the
//! shared [`PipelineState`] buffer and flushed from the persisted cursor
//! onward, so a record is written at least once no matter which trigger
//! (batch completion, periodic tick or shutdown drain) gets to it first.

use crate::crawler::BatchSink;
use crate::model::{AdRecord, KnownKeys};
use crate::state::PipelineState;
use crate::storage::{SharedStore, StorageError};
use crate::HarvestError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of one flush attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Buffer was already fully persisted
    Nothing,
    /// `count` records were written and the cursor moved to `cursor`
    Flushed { count: usize, cursor: usize },
    /// The write failed; `pending` records remain past the cursor
    Failed { pending: usize },
}

/// Owns the path from collected records to durable rows
#[derive(Clone)]
pub struct PersistenceCoordinator {
    store: SharedStore,
    state: Arc<PipelineState>,
}

impl PersistenceCoordinator {
    pub fn new(store: SharedStore, state: Arc<PipelineState>) -> Self {
        Self { store, state }
    }

    pub fn state(&self) -> &Arc<PipelineState> {
        &self.state
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Reads every stored URL once at run start
    pub fn load_known_keys(&self) -> Result<KnownKeys, HarvestError> {
        let store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        let known = store.load_known_urls()?;
        debug!("Loaded {} known ad URLs", known.len());
        Ok(known)
    }

    /// Writes `records` in one transaction, keyed by URL
    pub fn upsert_batch(&self, records: &[AdRecord]) -> Result<usize, StorageError> {
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        store.upsert_ads(records)
    }

    /// Persists every buffered record past the cursor
    ///
    /// The suffix is copied out of the buffer first; the write happens on the
    /// blocking pool with no pipeline lock held. Failures are logged and
    /// leave the cursor where it was, so the next trigger retries them.
    pub async fn flush_pending_tail(&self) -> FlushOutcome {
        let tail = self.state.pending_tail();
        if tail.is_empty() {
            return FlushOutcome::Nothing;
        }

        let pending = tail.records.len();
        let coordinator = self.clone();
        let records = tail.records;
        let written =
            tokio::task::spawn_blocking(move || coordinator.upsert_batch(&records)).await;

        match written {
            Ok(Ok(_)) => {
                let cursor = self.state.advance_cursor(tail.end);
                debug!(
                    "Flushed {} records ({}..{}), cursor at {}",
                    pending, tail.start, tail.end, cursor
                );
                FlushOutcome::Flushed {
                    count: pending,
                    cursor,
                }
            }
            Ok(Err(e)) => {
                warn!("Failed to persist {} records: {}", pending, e);
                FlushOutcome::Failed { pending }
            }
            Err(e) => {
                warn!("Persist task for {} records did not finish: {}", pending, e);
                FlushOutcome::Failed { pending }
            }
        }
    }

    /// Appends a finished batch to the buffer and flushes it
    pub async fn record_batch(&self, records: Vec<AdRecord>) -> FlushOutcome {
        if !records.is_empty() {
            let buffered = self.state.append(&records);
            debug!("Buffered {} records ({} total)", records.len(), buffered);
        }
        self.flush_pending_tail().await
    }

    /// Starts the periodic flusher
    ///
    /// The first tick fires one full `period` after start. The task exits
    /// when `cancel` fires and does not flush on its way out; the drain path
    /// owns the final flush.
    pub fn spawn_autosave(&self, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        if let FlushOutcome::Flushed { count, .. } =
                            coordinator.flush_pending_tail().await
                        {
                            info!("Autosave persisted {} records", count);
                        }
                    }
                }
            }
            debug!("Autosave stopped");
        })
    }
}

#[async_trait]
impl BatchSink for PersistenceCoordinator {
    async fn batch_completed(&self, records: Vec<AdRecord>) {
        self.record_batch(records).await;
    }
}

//! Storage traits and error types

use crate::model::{AdRecord, KnownKeys};
use crate::storage::{AdSummary, RunCounters, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable sink for ad records and run bookkeeping
///
/// Every write is keyed by the ad URL: writing a record whose URL is already
/// stored updates that row.
pub trait AdStore: Send {
    // ===== Ads =====

    /// Returns every URL currently stored
    fn load_known_urls(&self) -> StorageResult<KnownKeys>;

    /// Inserts or updates `records` in a single transaction
    ///
    /// Returns the number of rows written. `discovered_at` is stamped with the
    /// write time.
    fn upsert_ads(&mut self, records: &[AdRecord]) -> StorageResult<usize>;

    fn get_ad(&self, url: &str) -> StorageResult<Option<AdRecord>>;

    /// All stored ads ordered by insertion
    fn list_ads(&self) -> StorageResult<Vec<AdRecord>>;

    fn count_ads(&self) -> StorageResult<u64>;

    fn summarize_ads(&self) -> StorageResult<AdSummary>;

    // ===== Runs =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counters: RunCounters,
    ) -> StorageResult<()>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}

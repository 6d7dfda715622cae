//! Store wrappers for exercising failure paths in tests

use crate::model::{AdRecord, KnownKeys};
use crate::storage::{
    AdStore, AdSummary, RunCounters, RunRecord, RunStatus, SqliteStorage, StorageError,
    StorageResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn take_failure(remaining: &AtomicUsize) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// In-memory store whose first writes fail
///
/// `upsert_failures` upserts and `finish_failures` run completions fail
/// before the store starts behaving. Sizes of successful upserts are
/// recorded in `written`.
pub(crate) struct FlakyStore {
    inner: SqliteStorage,
    upsert_failures: AtomicUsize,
    finish_failures: AtomicUsize,
    pub written: Arc<Mutex<Vec<usize>>>,
}

impl FlakyStore {
    pub fn new(upsert_failures: usize, finish_failures: usize) -> Self {
        Self {
            inner: SqliteStorage::new_in_memory().unwrap(),
            upsert_failures: AtomicUsize::new(upsert_failures),
            finish_failures: AtomicUsize::new(finish_failures),
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl AdStore for FlakyStore {
    fn load_known_urls(&self) -> StorageResult<KnownKeys> {
        self.inner.load_known_urls()
    }

    fn upsert_ads(&mut self, records: &[AdRecord]) -> StorageResult<usize> {
        if take_failure(&self.upsert_failures) {
            return Err(StorageError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        let written = self.inner.upsert_ads(records)?;
        self.written.lock().unwrap().push(records.len());
        Ok(written)
    }

    fn get_ad(&self, url: &str) -> StorageResult<Option<AdRecord>> {
        self.inner.get_ad(url)
    }

    fn list_ads(&self) -> StorageResult<Vec<AdRecord>> {
        self.inner.list_ads()
    }

    fn count_ads(&self) -> StorageResult<u64> {
        self.inner.count_ads()
    }

    fn summarize_ads(&self) -> StorageResult<AdSummary> {
        self.inner.summarize_ads()
    }

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        self.inner.create_run(config_hash)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counters: RunCounters,
    ) -> StorageResult<()> {
        if take_failure(&self.finish_failures) {
            return Err(StorageError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        self.inner.finish_run(run_id, status, counters)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.inner.get_run(run_id)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.inner.get_latest_run()
    }
}

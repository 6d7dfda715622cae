//! Storage module for persisting collected ads
//!
//! This module handles all database operations for the collector:
//! - SQLite database initialization and schema management
//! - URL-keyed ad upserts and reads
//! - Run bookkeeping

mod schema;
mod sqlite;
mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use sqlite::SqliteStorage;
pub use traits::{AdStore, StorageError, StorageResult};

use crate::HarvestError;

use std::path::Path;
use std::sync::{Arc, Mutex};

/// Store handle shared between the run loop, the flusher and the shutdown path
pub type SharedStore = Arc<Mutex<dyn AdStore>>;

/// Opens (or creates) the ad database at `path`
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// Opens the ad database and wraps it for sharing across tasks
pub fn open_shared(path: &Path) -> Result<SharedStore, HarvestError> {
    let storage = open_storage(path)?;
    Ok(Arc::new(Mutex::new(storage)))
}

/// Represents a collection run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub counters: RunCounters,
}

/// Totals recorded when a run finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub pages_visited: u64,
    pub ads_collected: u64,
    pub ads_skipped: u64,
    pub ads_failed: u64,
}

/// Status of a collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Aggregates over the stored ads, used by `--stats`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdSummary {
    pub total: u64,
    pub with_phone: u64,
    pub with_vin: u64,
    pub promotional: u64,
    pub average_price_usd: Option<f64>,
    pub average_odometer: Option<f64>,
}

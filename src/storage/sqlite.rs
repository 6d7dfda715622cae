//! SQLite storage implementation

use crate::model::{AdRecord, KnownKeys};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{AdStore, StorageError, StorageResult};
use crate::storage::{AdSummary, RunCounters, RunRecord, RunStatus};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const AD_COLUMNS: &str = "url, title, price_usd, odometer, username, phone_number, \
     image_url, images_count, car_number, car_vin, discovered_at";

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, \
     pages_visited, ads_collected, ads_skipped, ads_failed";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database file and applies the schema
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn ad_from_row(row: &Row<'_>) -> rusqlite::Result<AdRecord> {
    Ok(AdRecord {
        url: row.get(0)?,
        title: row.get(1)?,
        price_usd: row.get(2)?,
        odometer: row.get(3)?,
        username: row.get(4)?,
        phone_number: row.get(5)?,
        image_url: row.get(6)?,
        images_count: row.get(7)?,
        car_number: row.get(8)?,
        car_vin: row.get(9)?,
        discovered_at: row.get(10)?,
    })
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Failed),
        counters: RunCounters {
            pages_visited: row.get(5)?,
            ads_collected: row.get(6)?,
            ads_skipped: row.get(7)?,
            ads_failed: row.get(8)?,
        },
    })
}

impl AdStore for SqliteStorage {
    // ===== Ads =====

    fn load_known_urls(&self) -> StorageResult<KnownKeys> {
        let mut stmt = self.conn.prepare("SELECT url FROM ads")?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<KnownKeys, _>>()?;
        Ok(urls)
    }

    fn upsert_ads(&mut self, records: &[AdRecord]) -> StorageResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO ads (url, title, price_usd, odometer, username, phone_number,
                                  image_url, images_count, car_number, car_vin, discovered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(url) DO UPDATE SET
                    title = excluded.title,
                    price_usd = excluded.price_usd,
                    odometer = excluded.odometer,
                    username = excluded.username,
                    phone_number = excluded.phone_number,
                    image_url = excluded.image_url,
                    images_count = excluded.images_count,
                    car_number = excluded.car_number,
                    car_vin = excluded.car_vin,
                    discovered_at = excluded.discovered_at",
            )?;

            for record in records {
                written += stmt.execute(params![
                    record.url,
                    record.title,
                    record.price_usd,
                    record.odometer,
                    record.username,
                    record.phone_number,
                    record.image_url,
                    record.images_count,
                    record.car_number,
                    record.car_vin,
                    now,
                ])?;
            }
        }
        tx.commit()?;

        Ok(written)
    }

    fn get_ad(&self, url: &str) -> StorageResult<Option<AdRecord>> {
        let ad = self
            .conn
            .query_row(
                &format!("SELECT {} FROM ads WHERE url = ?1", AD_COLUMNS),
                params![url],
                ad_from_row,
            )
            .optional()?;
        Ok(ad)
    }

    fn list_ads(&self) -> StorageResult<Vec<AdRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM ads ORDER BY id", AD_COLUMNS))?;
        let ads = stmt
            .query_map([], ad_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ads)
    }

    fn count_ads(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ads", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn summarize_ads(&self) -> StorageResult<AdSummary> {
        let summary = self.conn.query_row(
            "SELECT COUNT(*),
                    COUNT(phone_number),
                    COUNT(car_vin),
                    SUM(CASE WHEN url LIKE '%/newauto/%' THEN 1 ELSE 0 END),
                    AVG(price_usd),
                    AVG(odometer)
             FROM ads",
            [],
            |row| {
                Ok(AdSummary {
                    total: row.get::<_, i64>(0)? as u64,
                    with_phone: row.get::<_, i64>(1)? as u64,
                    with_vin: row.get::<_, i64>(2)? as u64,
                    promotional: row.get::<_, Option<i64>>(3)?.unwrap_or(0) as u64,
                    average_price_usd: row.get(4)?,
                    average_odometer: row.get(5)?,
                })
            },
        )?;
        Ok(summary)
    }

    // ===== Runs =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        counters: RunCounters,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs
             SET status = ?1, finished_at = ?2, pages_visited = ?3,
                 ads_collected = ?4, ads_skipped = ?5, ads_failed = ?6
             WHERE id = ?7",
            params![
                status.to_db_string(),
                now,
                counters.pages_visited,
                counters.ads_collected,
                counters.ads_skipped,
                counters.ads_failed,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(url: &str, price: i64) -> AdRecord {
        AdRecord {
            title: Some("Audi A4 2016".to_string()),
            price_usd: Some(price),
            odometer: Some(95_000),
            phone_number: Some(380_671_234_567),
            ..AdRecord::new(url)
        }
    }

    #[test]
    fn test_create_in_memory() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert_eq!(storage.count_ads().unwrap(), 0);
    }

    #[test]
    fn test_upsert_inserts_and_stamps_discovered_at() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let written = storage
            .upsert_ads(&[sample("https://a/1", 10_000), sample("https://a/2", 12_000)])
            .unwrap();
        assert_eq!(written, 2);

        let ad = storage.get_ad("https://a/1").unwrap().unwrap();
        assert_eq!(ad.price_usd, Some(10_000));
        assert_eq!(ad.phone_number, Some(380_671_234_567));
        assert!(ad.discovered_at.is_some());
    }

    #[test]
    fn test_upsert_same_url_updates_instead_of_duplicating() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.upsert_ads(&[sample("https://a/1", 10_000)]).unwrap();
        storage.upsert_ads(&[sample("https://a/1", 9_500)]).unwrap();

        assert_eq!(storage.count_ads().unwrap(), 1);
        let ad = storage.get_ad("https://a/1").unwrap().unwrap();
        assert_eq!(ad.price_usd, Some(9_500));
    }

    #[test]
    fn test_upsert_same_batch_twice_is_idempotent() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let batch = vec![sample("https://a/1", 10_000), sample("https://a/2", 11_000)];
        storage.upsert_ads(&batch).unwrap();
        storage.upsert_ads(&batch).unwrap();

        let mut stored: Vec<_> = storage
            .list_ads()
            .unwrap()
            .into_iter()
            .map(|ad| ad.url)
            .collect();
        stored.sort();
        assert_eq!(stored, vec!["https://a/1", "https://a/2"]);
    }

    #[test]
    fn test_empty_upsert_is_noop() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert_eq!(storage.upsert_ads(&[]).unwrap(), 0);
    }

    #[test]
    fn test_load_known_urls() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .upsert_ads(&[sample("https://a/1", 10_000), sample("https://a/2", 11_000)])
            .unwrap();

        let known = storage.load_known_urls().unwrap();
        assert_eq!(known.len(), 2);
        assert!(known.contains("https://a/2"));
    }

    #[test]
    fn test_summarize_ads() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let mut promo = AdRecord::new("https://auto.ria.com/uk/newauto/auto-renault-1.html");
        promo.car_vin = Some("VF1RJL00000000001".to_string());
        storage
            .upsert_ads(&[sample("https://a/1", 10_000), sample("https://a/2", 20_000), promo])
            .unwrap();

        let summary = storage.summarize_ads().unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.with_phone, 2);
        assert_eq!(summary.with_vin, 1);
        assert_eq!(summary.promotional, 1);
        assert_eq!(summary.average_price_usd, Some(15_000.0));
    }

    #[test]
    fn test_summary_of_empty_store() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let summary = storage.summarize_ads().unwrap();
        assert_eq!(summary.total, 0);
        assert!(summary.average_price_usd.is_none());
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("abc123").unwrap();

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.finished_at.is_none());

        let counters = RunCounters {
            pages_visited: 2,
            ads_collected: 7,
            ads_skipped: 3,
            ads_failed: 0,
        };
        storage
            .finish_run(run_id, RunStatus::Interrupted, counters)
            .unwrap();

        let latest = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.id, run_id);
        assert_eq!(latest.status, RunStatus::Interrupted);
        assert_eq!(latest.counters, counters);
        assert_eq!(latest.config_hash, "abc123");
        assert!(latest.finished_at.is_some());
    }

    #[test]
    fn test_finish_unknown_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let result = storage.finish_run(42, RunStatus::Completed, RunCounters::default());
        assert!(matches!(result, Err(StorageError::RunNotFound(42))));
    }

    #[test]
    fn test_latest_run_when_none() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_latest_run().unwrap().is_none());
    }
}

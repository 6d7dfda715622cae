//! Statistics over the ad database
//!
//! Backs the `--stats` mode: aggregates come from the store in one query,
//! the last run is shown with its counters and duration.

use crate::storage::{AdStore, AdSummary, RunRecord};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Snapshot of the stored data
#[derive(Debug, Clone)]
pub struct CollectionStatistics {
    pub ads: AdSummary,
    pub last_run: Option<RunRecord>,
}

impl CollectionStatistics {
    /// Seconds between start and finish of the last run, if it finished
    pub fn last_run_seconds(&self) -> Option<i64> {
        let run = self.last_run.as_ref()?;
        let started = run.started_at.parse::<DateTime<Utc>>().ok()?;
        let finished = run.finished_at.as_ref()?.parse::<DateTime<Utc>>().ok()?;
        Some((finished - started).num_seconds())
    }
}

/// Loads statistics from storage
pub fn load_statistics(store: &dyn AdStore) -> Result<CollectionStatistics, HarvestError> {
    Ok(CollectionStatistics {
        ads: store.summarize_ads()?,
        last_run: store.get_latest_run()?,
    })
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Renders statistics as the plain-text report printed by `--stats`
pub fn format_statistics(stats: &CollectionStatistics) -> String {
    let ads = &stats.ads;
    let mut out = String::new();

    let _ = writeln!(out, "=== Collection Statistics ===\n");
    let _ = writeln!(out, "Ads:");
    let _ = writeln!(out, "  Total stored: {}", ads.total);
    let _ = writeln!(
        out,
        "  With phone: {} ({:.1}%)",
        ads.with_phone,
        percentage(ads.with_phone, ads.total)
    );
    let _ = writeln!(
        out,
        "  With VIN: {} ({:.1}%)",
        ads.with_vin,
        percentage(ads.with_vin, ads.total)
    );
    let _ = writeln!(out, "  New-car listings: {}", ads.promotional);
    match ads.average_price_usd {
        Some(price) => {
            let _ = writeln!(out, "  Average price: ${:.0}", price);
        }
        None => {
            let _ = writeln!(out, "  Average price: n/a");
        }
    }
    match ads.average_odometer {
        Some(km) => {
            let _ = writeln!(out, "  Average odometer: {:.0} km", km);
        }
        None => {
            let _ = writeln!(out, "  Average odometer: n/a");
        }
    }

    let _ = writeln!(out);
    match &stats.last_run {
        Some(run) => {
            let _ = writeln!(out, "Last run #{}:", run.id);
            let _ = writeln!(out, "  Status: {}", run.status.to_db_string());
            let _ = writeln!(out, "  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                let _ = writeln!(out, "  Finished: {}", finished);
            }
            if let Some(seconds) = stats.last_run_seconds() {
                let _ = writeln!(out, "  Duration: {}s", seconds);
            }
            let c = &run.counters;
            let _ = writeln!(out, "  Pages visited: {}", c.pages_visited);
            let _ = writeln!(
                out,
                "  Ads: {} collected, {} skipped, {} failed",
                c.ads_collected, c.ads_skipped, c.ads_failed
            );
        }
        None => {
            let _ = writeln!(out, "No runs recorded yet");
        }
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CollectionStatistics) {
    print!("{}", format_statistics(stats));
}

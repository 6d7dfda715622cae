//! Run coordinator
//!
//! Drives one collection run end to end: walks the frontier, hands each
//! page's ad links to the executor, keeps the periodic flusher alive while
//! collecting and performs the final flush on the way out. A run always
//! reaches `finish_run`, whether it completed, was interrupted or failed.

use crate::config::Config;
use crate::crawler::ad_fetcher::AdFetcher;
use crate::crawler::executor::{AdSource, Executor};
use crate::crawler::fetcher::build_http_client;
use crate::crawler::frontier::FrontierWalker;
use crate::model::KnownKeys;
use crate::persist::{FlushOutcome, PersistenceCoordinator};
use crate::phone::PhoneResolver;
use crate::state::{PipelineState, RunPhase};
use crate::storage::{RunCounters, RunStatus, SharedStore};
use crate::HarvestError;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a finished run reports back to the caller
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: i64,
    pub status: RunStatus,
    pub counters: RunCounters,
    /// Records durable at the end of the run
    pub persisted: usize,
    /// Records collected but not written, non-zero only if the final flush failed
    pub unflushed: usize,
    pub elapsed: Duration,
}

/// Main collection coordinator
pub struct Coordinator {
    config: Arc<Config>,
    config_hash: String,
    client: Client,
    source: Arc<dyn AdSource>,
    persistence: PersistenceCoordinator,
}

impl Coordinator {
    /// Builds the HTTP client, the phone resolver and the persistence path
    pub fn new(
        config: Config,
        config_hash: impl Into<String>,
        store: SharedStore,
    ) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.http)?;
        let resolver = PhoneResolver::new(client.clone(), &config.http.phone_endpoint)?;
        let source: Arc<dyn AdSource> = Arc::new(AdFetcher::new(client.clone(), resolver));
        let persistence = PersistenceCoordinator::new(store, Arc::new(PipelineState::new()));

        Ok(Self {
            config: Arc::new(config),
            config_hash: config_hash.into(),
            client,
            source,
            persistence,
        })
    }

    /// Replaces the per-ad unit, keeping traversal and persistence
    pub fn with_source(mut self, source: Arc<dyn AdSource>) -> Self {
        self.source = source;
        self
    }

    pub fn state(&self) -> &Arc<PipelineState> {
        self.persistence.state()
    }

    /// Runs one collection pass until the frontier ends or `cancel` fires
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary, HarvestError> {
        let started = Instant::now();
        let state = Arc::clone(self.persistence.state());
        state.reset();

        let run_id = {
            let mut store = self.persistence.store().lock().unwrap_or_else(|e| e.into_inner());
            store.create_run(&self.config_hash)?
        };
        info!(
            "Starting collection run {} from {}",
            run_id, self.config.collector.seed_url
        );

        state.transition(RunPhase::Running)?;
        let autosave_cancel = cancel.child_token();
        let autosave = self
            .config
            .collector
            .autosave_interval()
            .map(|period| self.persistence.spawn_autosave(period, autosave_cancel.clone()));

        let mut counters = RunCounters::default();
        let outcome = self.collect(&cancel, &mut counters).await;

        state.transition(RunPhase::Draining)?;
        autosave_cancel.cancel();
        if let Some(handle) = autosave {
            if let Err(e) = handle.await {
                warn!("Autosave task ended abnormally: {}", e);
            }
        }

        if let FlushOutcome::Failed { pending } = self.persistence.flush_pending_tail().await {
            error!("{} collected records could not be persisted", pending);
        }

        let status = match &outcome {
            Err(e) => {
                error!("Run {} failed: {}", run_id, e);
                RunStatus::Failed
            }
            Ok(()) if cancel.is_cancelled() => RunStatus::Interrupted,
            Ok(()) => RunStatus::Completed,
        };

        let finished = {
            let mut store = self.persistence.store().lock().unwrap_or_else(|e| e.into_inner());
            store.finish_run(run_id, status, counters)
        };
        state.transition(RunPhase::Idle)?;
        finished?;
        outcome?;

        let summary = RunSummary {
            run_id,
            status,
            counters,
            persisted: state.persisted(),
            unflushed: state.unflushed(),
            elapsed: started.elapsed(),
        };
        info!(
            "Run {} {}: {} pages, {} collected, {} skipped, {} failed in {:?}",
            run_id,
            status.to_db_string(),
            counters.pages_visited,
            counters.ads_collected,
            counters.ads_skipped,
            counters.ads_failed,
            summary.elapsed
        );
        Ok(summary)
    }

    async fn collect(
        &self,
        cancel: &CancellationToken,
        counters: &mut RunCounters,
    ) -> Result<(), HarvestError> {
        let known: Arc<KnownKeys> = Arc::new(self.persistence.load_known_keys()?);
        info!("{} ads already stored", known.len());

        let collector = &self.config.collector;
        let executor = Executor::new(
            Arc::clone(&self.source),
            collector.max_concurrent_requests as usize,
            collector.batch_size as usize,
            collector.batch_delay(),
        );
        let mut walker = FrontierWalker::new(self.client.clone(), collector.seed_url.clone());

        loop {
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Shutdown requested, leaving the frontier");
                    break;
                }
                page = walker.next_page() => page,
            };
            let Some(page) = page else {
                break;
            };

            counters.pages_visited += 1;
            let report = executor
                .run(&page.links, &known, &self.persistence, cancel)
                .await;
            counters.ads_collected += report.successful.len() as u64;
            counters.ads_skipped += report.skipped as u64;
            counters.ads_failed += report.errors as u64;

            info!(
                "Page {}: {} links, {} collected, {} skipped, {} failed ({} buffered, {} persisted)",
                page.number,
                page.links.len(),
                report.successful.len(),
                report.skipped,
                report.errors,
                self.state().buffered(),
                self.state().persisted()
            );

            if cancel.is_cancelled() || walker.is_exhausted() {
                break;
            }

            debug!("Waiting {:?} before the next page", collector.page_delay());
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(collector.page_delay()) => {}
            }
        }

        Ok(())
    }
}

/// Runs a complete collection with the production ad source
///
/// # Example
///
/// ```no_run
/// use ria_harvest::config::load_config_with_hash;
/// use ria_harvest::crawler::run_collection;
/// use ria_harvest::storage::open_shared;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let store = open_shared(Path::new(&config.output.database_path))?;
/// run_collection(config, hash, store, CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_collection(
    config: Config,
    config_hash: String,
    store: SharedStore,
    cancel: CancellationToken,
) -> Result<RunSummary, HarvestError> {
    Coordinator::new(config, config_hash, store)?.run(cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::model::AdRecord;
    use crate::storage::open_shared;
    use crate::storage::test_support::FlakyStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Returns a bare record for every URL without touching the network
    struct StaticSource;

    #[async_trait]
    impl AdSource for StaticSource {
        async fn fetch_ad(&self, url: &str) -> Result<AdRecord, HarvestError> {
            let mut record = AdRecord::new(url);
            record.title = Some("Test car".to_string());
            Ok(record)
        }
    }

    fn config(seed_url: &str, database_path: &str) -> Config {
        parse_config(&format!(
            r#"
[collector]
seed-url = "{}"
batch-delay-ms = 0
page-delay-ms = 0
autosave-interval-secs = 0

[output]
database-path = "{}"
"#,
            seed_url, database_path
        ))
        .unwrap()
    }

    fn listing(ads: &[&str], next: Option<&str>) -> String {
        let links: String = ads
            .iter()
            .map(|href| format!(r#"<section class="ticket-item"><a class="address" href="{}">ad</a></section>"#, href))
            .collect();
        let next = next
            .map(|href| format!(r#"<a class="page-link js-next" href="{}">next</a>"#, href))
            .unwrap_or_default();
        format!(
            r#"<html><body><div id="searchResults">{}</div>{}</body></html>"#,
            links, next
        )
    }

    #[tokio::test]
    async fn test_run_walks_pages_and_persists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                listing(&["/uk/auto_a_1.html", "/uk/auto_b_2.html"], Some("/search/2")),
                "text/html",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search/2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(listing(&["/uk/auto_c_3.html"], None), "text/html"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("ads.db");
        let store = open_shared(&db).unwrap();
        let config = config(&format!("{}/search", server.uri()), db.to_str().unwrap());

        let coordinator = Coordinator::new(config, "hash", store.clone())
            .unwrap()
            .with_source(Arc::new(StaticSource));
        let summary = coordinator.run(CancellationToken::new()).await.unwrap();

        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.counters.pages_visited, 2);
        assert_eq!(summary.counters.ads_collected, 3);
        assert_eq!(summary.persisted, 3);
        assert_eq!(summary.unflushed, 0);
        assert_eq!(coordinator.state().phase(), RunPhase::Idle);

        let guard = store.lock().unwrap();
        assert_eq!(guard.count_ads().unwrap(), 3);
        let run = guard.get_run(summary.run_id).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.counters, summary.counters);
    }

    #[tokio::test]
    async fn test_cancelled_run_is_interrupted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(listing(&["/uk/auto_a_1.html"], None), "text/html"),
            )
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("ads.db");
        let store = open_shared(&db).unwrap();
        let config = config(&format!("{}/search", server.uri()), db.to_str().unwrap());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = Coordinator::new(config, "hash", store.clone())
            .unwrap()
            .with_source(Arc::new(StaticSource))
            .run(cancel)
            .await
            .unwrap();

        assert_eq!(summary.status, RunStatus::Interrupted);
        assert_eq!(summary.counters, RunCounters::default());
        let guard = store.lock().unwrap();
        assert_eq!(
            guard.get_latest_run().unwrap().unwrap().status,
            RunStatus::Interrupted
        );
    }

    #[tokio::test]
    async fn test_unreachable_seed_completes_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("ads.db");
        let store = open_shared(&db).unwrap();
        let config = config("http://127.0.0.1:9/search", db.to_str().unwrap());

        let summary = run_collection(config, "hash".to_string(), store, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.counters.pages_visited, 0);
    }

    /// Cancels the run while fetching `last`, which still completes
    struct CancelOnLast {
        last: &'static str,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl AdSource for CancelOnLast {
        async fn fetch_ad(&self, url: &str) -> Result<AdRecord, HarvestError> {
            if url.ends_with(self.last) {
                self.cancel.cancel();
            }
            Ok(AdRecord::new(url))
        }
    }

    #[tokio::test]
    async fn test_shutdown_drain_writes_unflushed_tail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                listing(&["/uk/auto_a_1.html", "/uk/auto_b_2.html"], None),
                "text/html",
            ))
            .mount(&server)
            .await;

        let mut config = config(&format!("{}/search", server.uri()), "unused.db");
        config.collector.batch_size = 1;

        // Both per-batch flushes fail, the drain flush succeeds
        let flaky = FlakyStore::new(2, 0);
        let written = Arc::clone(&flaky.written);
        let store: SharedStore = Arc::new(Mutex::new(flaky));

        let cancel = CancellationToken::new();
        let coordinator = Coordinator::new(config, "hash", store.clone())
            .unwrap()
            .with_source(Arc::new(CancelOnLast {
                last: "auto_b_2.html",
                cancel: cancel.clone(),
            }));
        let summary = coordinator.run(cancel).await.unwrap();

        assert_eq!(summary.status, RunStatus::Interrupted);
        assert_eq!(summary.counters.ads_collected, 2);
        assert_eq!(summary.persisted, 2);
        assert_eq!(summary.persisted, coordinator.state().buffered());
        assert_eq!(summary.unflushed, 0);
        assert_eq!(*written.lock().unwrap(), vec![2]);

        let guard = store.lock().unwrap();
        assert_eq!(guard.count_ads().unwrap(), 2);
        assert_eq!(
            guard.get_run(summary.run_id).unwrap().status,
            RunStatus::Interrupted
        );
    }

    #[tokio::test]
    async fn test_failed_finish_returns_to_idle() {
        let config = config("http://127.0.0.1:9/search", "unused.db");
        let store: SharedStore = Arc::new(Mutex::new(FlakyStore::new(0, 1)));
        let coordinator = Coordinator::new(config, "hash", store)
            .unwrap()
            .with_source(Arc::new(StaticSource));

        let first = coordinator.run(CancellationToken::new()).await;
        assert!(matches!(first, Err(HarvestError::Storage(_))));
        assert_eq!(coordinator.state().phase(), RunPhase::Idle);

        let second = coordinator.run(CancellationToken::new()).await.unwrap();
        assert_eq!(second.status, RunStatus::Completed);
        assert_eq!(coordinator.state().phase(), RunPhase::Idle);
    }
}

//! Integration tests for the collection pipeline
//!
//! These tests use wiremock to stand in for the listing site and its phone
//! endpoint, and run full collection passes against a temporary database.

use ria_harvest::config::{CollectorConfig, Config, HttpConfig, OutputConfig};
use ria_harvest::crawler::Coordinator;
use ria_harvest::storage::{open_shared, RunStatus, SharedStore};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AUDI: &str = "/uk/auto_audi_a4_38444076.html";
const BMW: &str = "/uk/auto_bmw_x5_38444077.html";
const RENAULT: &str = "/uk/newauto/auto-renault-taliant-1999075.html";

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, db_path: &str) -> Config {
    Config {
        collector: CollectorConfig {
            seed_url: format!("{}/uk/search", base_url),
            max_concurrent_requests: 2,
            batch_size: 2,
            batch_delay_ms: 0,
            page_delay_ms: 0,
            autosave_interval_secs: 0,
            shutdown_grace_secs: 5,
        },
        http: HttpConfig {
            phone_endpoint: format!("{}/users/phones", base_url),
            ..HttpConfig::default()
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

fn listing_page(next: Option<&str>) -> String {
    let next = next
        .map(|href| format!(r#"<a class="page-link js-next" href="{}">Далі</a>"#, href))
        .unwrap_or_default();
    format!(
        r#"<html><body>
        <div id="catalogSearchAT">
            <section class="ticket-item"><a class="address" href="{AUDI}">Audi A4</a></section>
            <section class="ticket-item"><a class="address" href="{BMW}">BMW X5</a></section>
        </div>
        <a class="proposition_link" href="{RENAULT}">Renault Taliant</a>
        {next}
        </body></html>"#
    )
}

fn audi_page() -> String {
    r#"<html><body>
        <h1 class="head">Audi A4 2016</h1>
        <div class="price_value"><strong>14 900 $</strong></div>
        <div class="base-information"><span>185</span> тис. км пробіг</div>
        <span class="label-vin">WAUZZZ8K9GA123456</span>
        <script class="js-user-secure-38444076" data-hash="h4sh" data-expires="1700000000"></script>
    </body></html>"#
        .to_string()
}

fn bmw_page() -> String {
    r#"<html><body>
        <h1 class="head">BMW X5 2019</h1>
        <div class="price_value"><strong>45 000 $</strong></div>
    </body></html>"#
        .to_string()
}

fn renault_page() -> String {
    r#"<html><body>
        <h1 class="auto-head_title"><strong>Renault Taliant</strong><div class="auto-head_base">Zen 1.0</div></h1>
        <span class="conversion_phone_newcars">+38 (067) 555 44 33</span>
    </body></html>"#
        .to_string()
}

/// Mounts the listing and ad pages, each ad expected to be fetched `ad_fetches` times
async fn mount_site(server: &MockServer, ad_fetches: u64) {
    Mock::given(method("GET"))
        .and(path("/uk/search"))
        .respond_with(html(listing_page(None)))
        .mount(server)
        .await;
    for (route, body) in [(AUDI, audi_page()), (BMW, bmw_page()), (RENAULT, renault_page())] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(html(body))
            .expect(ad_fetches)
            .mount(server)
            .await;
    }
}

async fn mount_phone_endpoint(server: &MockServer, audi_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/users/phones/38444076"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"phones":[{"phoneFormatted":"(067) 123 45 67"}]}"#,
            "application/json",
        ))
        .expect(audi_calls)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/phones/38444077"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

fn test_store(dir: &tempfile::TempDir) -> (SharedStore, String) {
    let db_path = dir.path().join("ads.db");
    let store = open_shared(&db_path).expect("Failed to open test database");
    (store, db_path.to_string_lossy().into_owned())
}

#[tokio::test]
async fn test_full_run_collects_all_fields() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, 1).await;
    mount_phone_endpoint(&mock_server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let (store, db_path) = test_store(&dir);
    let config = create_test_config(&mock_server.uri(), &db_path);

    let summary = Coordinator::new(config, "test-hash", store.clone())
        .expect("Failed to create coordinator")
        .run(CancellationToken::new())
        .await
        .expect("Run failed");

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.counters.pages_visited, 1);
    assert_eq!(summary.counters.ads_collected, 3);
    assert_eq!(summary.counters.ads_failed, 0);
    assert_eq!(summary.persisted, 3);

    let guard = store.lock().unwrap();
    assert_eq!(guard.count_ads().unwrap(), 3);

    let audi = guard
        .get_ad(&format!("{}{}", mock_server.uri(), AUDI))
        .unwrap()
        .expect("Audi should be stored");
    assert_eq!(audi.title.as_deref(), Some("Audi A4 2016"));
    assert_eq!(audi.price_usd, Some(14_900));
    assert_eq!(audi.odometer, Some(185_000));
    assert_eq!(audi.car_vin.as_deref(), Some("WAUZZZ8K9GA123456"));
    assert_eq!(audi.phone_number, Some(671_234_567));
    assert!(audi.discovered_at.is_some());

    let bmw = guard
        .get_ad(&format!("{}{}", mock_server.uri(), BMW))
        .unwrap()
        .expect("BMW should be stored");
    assert_eq!(bmw.price_usd, Some(45_000));
    assert_eq!(bmw.phone_number, None);

    let renault = guard
        .get_ad(&format!("{}{}", mock_server.uri(), RENAULT))
        .unwrap()
        .expect("Renault should be stored");
    assert_eq!(renault.title.as_deref(), Some("Renault Taliant Zen 1.0"));
    assert_eq!(renault.phone_number, Some(380_675_554_433));
    assert_eq!(renault.odometer, Some(0));

    let run = guard.get_run(summary.run_id).unwrap();
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_second_run_skips_known_ads() {
    let mock_server = MockServer::start().await;
    // Every ad page is fetched exactly once across both runs
    mount_site(&mock_server, 1).await;
    mount_phone_endpoint(&mock_server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let (store, db_path) = test_store(&dir);
    let config = create_test_config(&mock_server.uri(), &db_path);

    let first = Coordinator::new(config.clone(), "test-hash", store.clone())
        .unwrap()
        .run(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.counters.ads_collected, 3);

    let second = Coordinator::new(config, "test-hash", store.clone())
        .unwrap()
        .run(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(second.status, RunStatus::Completed);
    assert_eq!(second.counters.ads_skipped, 3);
    assert_eq!(second.counters.ads_collected, 0);
    assert_ne!(first.run_id, second.run_id);

    let guard = store.lock().unwrap();
    assert_eq!(guard.count_ads().unwrap(), 3);
}

#[tokio::test]
async fn test_failed_ads_are_counted_not_fatal() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uk/search"))
        .respond_with(html(listing_page(Some("/uk/search/page-2"))))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uk/search/page-2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(AUDI))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(BMW))
        .respond_with(html(bmw_page()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(RENAULT))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"not":"html"}"#, "application/json"),
        )
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, db_path) = test_store(&dir);
    let config = create_test_config(&mock_server.uri(), &db_path);

    let summary = Coordinator::new(config, "test-hash", store.clone())
        .unwrap()
        .run(CancellationToken::new())
        .await
        .unwrap();

    // The second results page fails, which ends the walk after page one
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.counters.pages_visited, 1);
    assert_eq!(summary.counters.ads_collected, 1);
    assert_eq!(summary.counters.ads_failed, 2);
    assert_eq!(store.lock().unwrap().count_ads().unwrap(), 1);
}

#[tokio::test]
async fn test_run_follows_next_page_links() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uk/search"))
        .respond_with(html(format!(
            r#"<div id="catalogSearchAT"><a class="address" href="{BMW}">BMW</a></div>
               <a class="page-link js-next" href="/uk/search/page-2">Далі</a>"#
        )))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uk/search/page-2"))
        .respond_with(html(format!(
            r#"<div id="catalogSearchAT"><a class="address" href="{AUDI}">Audi</a></div>"#
        )))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(BMW))
        .respond_with(html(bmw_page()))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(AUDI))
        .respond_with(html(audi_page()))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_phone_endpoint(&mock_server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let (store, db_path) = test_store(&dir);
    let config = create_test_config(&mock_server.uri(), &db_path);

    let summary = Coordinator::new(config, "test-hash", store.clone())
        .unwrap()
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.counters.pages_visited, 2);
    assert_eq!(summary.counters.ads_collected, 2);
    let stored = store.lock().unwrap().list_ads().unwrap();
    assert_eq!(stored.len(), 2);
}

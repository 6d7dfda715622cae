use serde::Deserialize;
use std::time::Duration;

/// Browser identity sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Main configuration structure for ria-harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub collector: CollectorConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub output: OutputConfig,
}

/// Traversal and pacing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// First search results page
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Concurrency ceiling for ad fetches
    #[serde(rename = "max-concurrent-requests", default = "default_max_concurrent")]
    pub max_concurrent_requests: u32,

    /// Number of ad URLs scheduled together before a pause
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Pause between batches of the same page (milliseconds)
    #[serde(rename = "batch-delay-ms", default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Pause before advancing to the next listing page (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Periodic flush interval in seconds, 0 disables the flusher
    #[serde(rename = "autosave-interval-secs", default = "default_autosave_secs")]
    pub autosave_interval_secs: u64,

    /// How long the binary waits for the final flush after a signal
    #[serde(rename = "shutdown-grace-secs", default = "default_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl CollectorConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// `None` when the periodic flusher is disabled
    pub fn autosave_interval(&self) -> Option<Duration> {
        (self.autosave_interval_secs > 0).then(|| Duration::from_secs(self.autosave_interval_secs))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,

    /// Static cookie header sent with every request
    #[serde(default)]
    pub cookie: Option<String>,

    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Base URL of the phone lookup endpoint; the item id is appended
    #[serde(rename = "phone-endpoint", default = "default_phone_endpoint")]
    pub phone_endpoint: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            cookie: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            phone_endpoint: default_phone_endpoint(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_max_concurrent() -> u32 {
    5
}

fn default_batch_size() -> u32 {
    10
}

fn default_batch_delay_ms() -> u64 {
    1_000
}

fn default_page_delay_ms() -> u64 {
    2_000
}

fn default_autosave_secs() -> u64 {
    30
}

fn default_grace_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept_language() -> String {
    "uk-UA,uk;q=0.9,en-US;q=0.8,en;q=0.7".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_phone_endpoint() -> String {
    "https://auto.ria.com/users/phones".to_string()
}

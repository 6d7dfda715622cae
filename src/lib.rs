//! ria-harvest: a bounded-concurrency listing collector
//!
//! This crate walks the paginated search results of a car listing site,
//! fetches every ad it finds under a concurrency ceiling, extracts a fixed
//! set of fields with ordered fallback strategies, and persists the records
//! incrementally into SQLite with URL-keyed upserts.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod model;
pub mod output;
pub mod persist;
pub mod phone;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for ria-harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status_code} for {url}")]
    HttpStatus { url: String, status_code: u16 },

    #[error("Expected HTML from {url}, got {content_type}")]
    ContentMismatch { url: String, content_type: String },

    #[error("Invalid header value for {name}")]
    InvalidHeader { name: &'static str },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid run phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunPhase,
        to: state::RunPhase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for ria-harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{AdRecord, ListingVariant};
pub use state::RunPhase;

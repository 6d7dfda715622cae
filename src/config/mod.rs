//! Configuration module for ria-harvest
//!
//! Loads the TOML run configuration, applies defaults for the optional
//! `[http]` section and validates ranges before any work starts.
//!
//! # Example
//!
//! ```no_run
//! use ria_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Seed page: {}", config.collector.seed_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CollectorConfig, Config, HttpConfig, OutputConfig, DEFAULT_USER_AGENT};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

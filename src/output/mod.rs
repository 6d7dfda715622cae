//! Output module for reporting on collected data
//!
//! This module handles:
//! - Printing statistics over the stored ads and the last run
//! - Exporting stored ads as JSON

mod json;
pub mod stats;

pub use json::{ads_to_json, export_json};
pub use stats::{format_statistics, load_statistics, print_statistics, CollectionStatistics};

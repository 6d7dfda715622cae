//! Crawler module for listing traversal and ad collection
//!
//! This module contains the network-facing half of the pipeline:
//! - HTTP fetching with content-type checks
//! - Search result parsing and next-page discovery
//! - The frontier walker over paginated results
//! - Bounded concurrent execution of per-ad work
//! - Overall run coordination

mod ad_fetcher;
mod coordinator;
mod executor;
mod fetcher;
mod frontier;
mod listing;

pub use ad_fetcher::AdFetcher;
pub use coordinator::{run_collection, Coordinator, RunSummary};
pub use executor::{AdSource, BatchSink, ExecutionReport, Executor};
pub use fetcher::{build_http_client, fetch_html, fetch_url, FetchResult};
pub use frontier::{FrontierWalker, ListingPage};
pub use listing::{parse_listing, ListingLinks};

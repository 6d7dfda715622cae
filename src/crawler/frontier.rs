//! Frontier walker over paginated search results

use crate::crawler::fetcher::{fetch_url, FetchResult};
use crate::crawler::listing::parse_listing;
use reqwest::Client;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

/// One page of search results
#[derive(Debug, Clone)]
pub struct ListingPage {
    pub url: String,
    /// 1-based position in the walk
    pub number: u64,
    /// Ad URLs found on the page, de-duplicated
    pub links: Vec<String>,
    pub next_page: Option<String>,
}

/// Walks search results from the seed page along next-page links
///
/// The walk ends after the first page that fails to load, has no ad links,
/// has no next-page link, or whose next-page link leads back to a page
/// already walked. A page with links but no successor is still yielded.
pub struct FrontierWalker {
    client: Client,
    next: Option<String>,
    visited: HashSet<String>,
    pages_visited: u64,
}

impl FrontierWalker {
    pub fn new(client: Client, seed_url: impl Into<String>) -> Self {
        Self {
            client,
            next: Some(seed_url.into()),
            visited: HashSet::new(),
            pages_visited: 0,
        }
    }

    pub fn pages_visited(&self) -> u64 {
        self.pages_visited
    }

    pub fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }

    /// Fetches the current page and advances the cursor
    pub async fn next_page(&mut self) -> Option<ListingPage> {
        let url = self.next.take()?;
        self.visited.insert(url.clone());

        let (final_url, body) = match fetch_url(&self.client, &url).await {
            FetchResult::Success { final_url, body } => (final_url, body),
            FetchResult::HttpError { status_code } => {
                warn!("Listing page {} returned HTTP {}", url, status_code);
                return None;
            }
            FetchResult::ContentMismatch { content_type } => {
                warn!("Listing page {} is not HTML ({})", url, content_type);
                return None;
            }
            FetchResult::NetworkError { error } => {
                warn!("Listing page {} failed: {}", url, error);
                return None;
            }
        };

        // Relative links resolve against where redirects landed
        let base = match Url::parse(&final_url) {
            Ok(base) => base,
            Err(e) => {
                warn!("Invalid listing page URL {}: {}", final_url, e);
                return None;
            }
        };
        self.visited.insert(final_url);

        let links = parse_listing(&body, &base);
        self.pages_visited += 1;

        if links.ads.is_empty() {
            info!("No ads on {}, stopping", url);
            return None;
        }

        match &links.next_page {
            Some(next) if self.visited.contains(next) => {
                info!("Next page {} was already walked, stopping", next);
            }
            Some(next) => {
                debug!("Page {} -> {}", url, next);
                self.next = Some(next.clone());
            }
            None => info!("No next page after {}", url),
        }

        Some(ListingPage {
            url,
            number: self.pages_visited,
            links: links.ads,
            next_page: links.next_page,
        })
    }
}

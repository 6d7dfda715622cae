//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the collector:
//! - Building one shared client with browser-like default headers
//! - GET requests for listing and ad pages
//! - Error classification

use crate::config::HttpConfig;
use crate::HarvestError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE};
use reqwest::Client;
use std::time::Duration;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        body: String,
    },

    /// Response is not HTML
    ContentMismatch { content_type: String },

    /// Non-success HTTP status
    HttpError { status_code: u16 },

    /// Connection refused, timeout, body read failure
    NetworkError { error: String },
}

/// Builds the shared HTTP client
///
/// Every request carries the configured User-Agent, Accept and
/// Accept-Language headers, plus the static cookie when one is set.
pub fn build_http_client(config: &HttpConfig) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&config.accept_language)
            .map_err(|_| HarvestError::InvalidHeader { name: "accept-language" })?,
    );
    if let Some(cookie) = &config.cookie {
        headers.insert(
            COOKIE,
            HeaderValue::from_str(cookie).map_err(|_| HarvestError::InvalidHeader { name: "cookie" })?,
        );
    }

    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Fetches a URL and classifies the outcome
///
/// A missing Content-Type is treated as HTML; anything else must mention
/// `text/html`.
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                format!("Connection failed: {}", e)
            } else {
                e.to_string()
            };
            return FetchResult::NetworkError { error };
        }
    };

    let status = response.status();
    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.is_empty() && !content_type.contains("text/html") {
        return FetchResult::ContentMismatch { content_type };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success { final_url, body },
        Err(e) => FetchResult::NetworkError {
            error: e.to_string(),
        },
    }
}

/// Fetches an HTML page, mapping every failure to an error
pub async fn fetch_html(client: &Client, url: &str) -> Result<String, HarvestError> {
    match fetch_url(client, url).await {
        FetchResult::Success { body, .. } => Ok(body),
        FetchResult::ContentMismatch { content_type } => Err(HarvestError::ContentMismatch {
            url: url.to_string(),
            content_type,
        }),
        FetchResult::HttpError { status_code } => Err(HarvestError::HttpStatus {
            url: url.to_string(),
            status_code,
        }),
        FetchResult::NetworkError { error } => Err(HarvestError::Network {
            url: url.to_string(),
            message: error,
        }),
    }
}

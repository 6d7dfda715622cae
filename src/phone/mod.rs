//! Phone number resolution
//!
//! Listing pages do not carry the seller's phone in their markup. Instead
//! they embed a short-lived `hash`/`expires` pair; the number is fetched
//! from a separate endpoint keyed by the listing id. Every failure along the
//! way yields an empty list; phone lookups never fail an ad.

mod response;
mod token;

pub use response::{decode_phones, PhoneResponse};
pub use token::{find_token_pair, TokenPair};

use crate::HarvestError;
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use tracing::{debug, warn};
use url::Url;

static RE_ITEM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d+)\.html").expect("valid item id regex"));

/// Numeric listing id from a URL such as `.../auto_audi_a4_38444076.html`
pub fn item_id(ad_url: &str) -> Option<&str> {
    RE_ITEM_ID
        .captures(ad_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Digits of `raw` as an integer, e.g. `(067) 123-45-67` -> `671234567`
pub fn canonical_phone(raw: &str) -> Option<i64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Calls the phone endpoint for listings
#[derive(Clone)]
pub struct PhoneResolver {
    client: Client,
    endpoint: Url,
}

impl PhoneResolver {
    pub fn new(client: Client, endpoint: &str) -> Result<Self, HarvestError> {
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
        })
    }

    /// `{endpoint}/{id}?hash=..&expires=..`
    pub fn endpoint_url(&self, id: &str, token: &TokenPair) -> Result<Url, HarvestError> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{}/{}", base, id))?;
        url.query_pairs_mut()
            .append_pair("hash", &token.hash)
            .append_pair("expires", &token.expires);
        Ok(url)
    }

    /// Resolves phones for a listing whose page was already fetched
    pub async fn resolve(&self, ad_url: &str, token: Option<&TokenPair>) -> Vec<String> {
        let Some(token) = token else {
            debug!("No phone token on {}", ad_url);
            return Vec::new();
        };
        let Some(id) = item_id(ad_url) else {
            warn!("Could not extract listing id from {}", ad_url);
            return Vec::new();
        };
        let url = match self.endpoint_url(id, token) {
            Ok(url) => url,
            Err(e) => {
                warn!("Invalid phone endpoint for {}: {}", ad_url, e);
                return Vec::new();
            }
        };

        match self.request(url).await {
            Ok(phones) => {
                debug!("Resolved {} phone(s) for {}", phones.len(), ad_url);
                phones
            }
            Err(e) => {
                warn!("Phone lookup failed for {}: {}", ad_url, e);
                Vec::new()
            }
        }
    }

    async fn request(&self, url: Url) -> Result<Vec<String>, HarvestError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::HttpStatus {
                url: url.to_string(),
                status_code: status.as_u16(),
            });
        }
        let body = response.text().await?;
        Ok(decode_phones(&body)?)
    }
}

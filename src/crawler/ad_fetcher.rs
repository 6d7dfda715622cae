//! Fetch-and-extract unit for a single ad

use crate::crawler::executor::AdSource;
use crate::crawler::fetcher::fetch_html;
use crate::extract::extract_ad;
use crate::model::AdRecord;
use crate::phone::{canonical_phone, PhoneResolver};
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Loads an ad page, extracts its fields and fills in the phone number
///
/// The phone endpoint is only consulted when the page markup did not carry
/// a number, using the token found on the page that was just fetched.
#[derive(Clone)]
pub struct AdFetcher {
    client: Client,
    resolver: PhoneResolver,
}

impl AdFetcher {
    pub fn new(client: Client, resolver: PhoneResolver) -> Self {
        Self { client, resolver }
    }
}

#[async_trait]
impl AdSource for AdFetcher {
    async fn fetch_ad(&self, url: &str) -> Result<AdRecord, HarvestError> {
        let html = fetch_html(&self.client, url).await?;
        let extraction = extract_ad(url, &html);
        let mut record = extraction.record;

        if record.phone_number.is_none() {
            let phones = self.resolver.resolve(url, extraction.token.as_ref()).await;
            record.phone_number = phones.first().and_then(|raw| canonical_phone(raw));
        }

        debug!(
            "Collected {} ({} fields resolved)",
            url,
            record.resolved_fields()
        );
        Ok(record)
    }
}

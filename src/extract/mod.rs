//! Field extraction engine
//!
//! Turns one fetched listing page into a partial [`AdRecord`]. Each field is
//! resolved independently through its variant's fallback chain; a field no
//! strategy can resolve is left empty. Extraction never fails.

mod page;
mod promotional;
mod standard;
mod strategy;
mod text;

pub use page::Page;
pub use strategy::{resolve_field, FieldChains, Strategy, ODOMETER_KM_RANGE, PRICE_USD_RANGE};
pub use text::{parse_mileage, parse_price_usd};

use crate::model::{AdRecord, ListingVariant};
use crate::phone::{find_token_pair, TokenPair};
use tracing::debug;

/// What a listing page yields before phone resolution
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: AdRecord,
    pub variant: ListingVariant,
    /// Credentials for the phone endpoint, when the page carries them
    pub token: Option<TokenPair>,
}

/// Chains used for a listing variant
pub fn chains_for(variant: ListingVariant) -> &'static FieldChains {
    match variant {
        ListingVariant::Standard => &standard::STANDARD,
        ListingVariant::Promotional => &promotional::PROMOTIONAL,
    }
}

/// Extracts every field of a listing page
pub fn extract_ad(url: &str, html: &str) -> Extraction {
    let page = Page::parse(url, html);
    let variant = ListingVariant::classify(url);
    let chains = chains_for(variant);

    let record = AdRecord {
        url: url.to_string(),
        title: resolve_field("title", &page, chains.title),
        price_usd: resolve_field("price_usd", &page, chains.price_usd),
        odometer: resolve_field("odometer", &page, chains.odometer),
        username: resolve_field("username", &page, chains.username),
        phone_number: resolve_field("phone_number", &page, chains.phone_number),
        image_url: resolve_field("image_url", &page, chains.image_url),
        images_count: resolve_field("images_count", &page, chains.images_count),
        car_number: resolve_field("car_number", &page, chains.car_number),
        car_vin: resolve_field("car_vin", &page, chains.car_vin),
        discovered_at: None,
    };

    let token = find_token_pair(&page);
    debug!(
        "Extracted {}/9 fields from {} ({:?}, token: {})",
        record.resolved_fields(),
        url,
        variant,
        token.is_some()
    );

    Extraction {
        record,
        variant,
        token,
    }
}

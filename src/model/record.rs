use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// URLs already present in the store when a run starts
pub type KnownKeys = HashSet<String>;

/// Structured data extracted from one listing page
///
/// `url` is the natural key: collecting the same URL again must update the
/// stored row rather than add a second one. Every other field is resolved
/// independently and stays `None` when no extraction strategy matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdRecord {
    pub url: String,
    pub title: Option<String>,
    pub price_usd: Option<i64>,
    /// Kilometers
    pub odometer: Option<i64>,
    pub username: Option<String>,
    /// Digits only, e.g. `380671234567`
    pub phone_number: Option<i64>,
    /// Absolute URL of the first photo
    pub image_url: Option<String>,
    pub images_count: Option<i64>,
    pub car_number: Option<String>,
    /// Full VIN, a masked VIN, or the raw text of the VIN element
    pub car_vin: Option<String>,
    /// Set by the store when the row is written (RFC 3339)
    pub discovered_at: Option<String>,
}

impl AdRecord {
    /// Creates a record with only the URL populated
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Number of extracted fields that resolved to a value
    pub fn resolved_fields(&self) -> usize {
        [
            self.title.is_some(),
            self.price_usd.is_some(),
            self.odometer.is_some(),
            self.username.is_some(),
            self.phone_number.is_some(),
            self.image_url.is_some(),
            self.images_count.is_some(),
            self.car_number.is_some(),
            self.car_vin.is_some(),
        ]
        .iter()
        .filter(|resolved| **resolved)
        .count()
    }
}

/// Markup family of a listing page
///
/// The site renders used-car ads and new-car (dealer promotion) ads with
/// different templates, so each variant has its own extraction chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingVariant {
    Standard,
    Promotional,
}

impl ListingVariant {
    /// Classifies a listing by its URL shape
    pub fn classify(url: &str) -> Self {
        if url.contains("/newauto/") {
            Self::Promotional
        } else {
            Self::Standard
        }
    }
}

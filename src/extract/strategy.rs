//! Ordered fallback chains
//!
//! Every field is resolved by walking its chain front to back; the first
//! strategy that returns a value wins and the rest are never run.

use crate::extract::page::Page;
use std::fmt::Debug;
use std::ops::RangeInclusive;
use tracing::trace;

/// Accepted USD prices, applied to every price strategy
pub const PRICE_USD_RANGE: RangeInclusive<i64> = 1_000..=1_000_000;

/// Accepted odometer readings in kilometers
pub const ODOMETER_KM_RANGE: RangeInclusive<i64> = 0..=1_000_000;

/// One named way of pulling a value out of a page
pub struct Strategy<T> {
    pub name: &'static str,
    pub run: fn(&Page) -> Option<T>,
}

impl<T> Strategy<T> {
    pub const fn new(name: &'static str, run: fn(&Page) -> Option<T>) -> Self {
        Self { name, run }
    }
}

/// Runs `chain` in order and returns the first value produced
pub fn resolve_field<T: Debug>(field: &str, page: &Page, chain: &[Strategy<T>]) -> Option<T> {
    for strategy in chain {
        if let Some(value) = (strategy.run)(page) {
            trace!("{} resolved by {}: {:?}", field, strategy.name, value);
            return Some(value);
        }
    }
    trace!("{} unresolved after {} strategies", field, chain.len());
    None
}

/// The complete set of chains for one listing variant
pub struct FieldChains {
    pub title: &'static [Strategy<String>],
    pub price_usd: &'static [Strategy<i64>],
    pub odometer: &'static [Strategy<i64>],
    pub username: &'static [Strategy<String>],
    pub phone_number: &'static [Strategy<i64>],
    pub image_url: &'static [Strategy<String>],
    pub images_count: &'static [Strategy<i64>],
    pub car_number: &'static [Strategy<String>],
    pub car_vin: &'static [Strategy<String>],
}

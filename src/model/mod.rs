//! Record types produced by the collection pipeline

mod record;

pub use record::{AdRecord, KnownKeys, ListingVariant};

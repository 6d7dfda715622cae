//! Free-text number and code recognizers

use crate::extract::strategy::{ODOMETER_KM_RANGE, PRICE_USD_RANGE};
use regex::Regex;
use std::sync::LazyLock;

static RE_PRICE_DOLLAR_AFTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\$").expect("valid price regex"));
static RE_PRICE_DOLLAR_BEFORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").expect("valid price regex"));
static RE_PRICE_USD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:,\d+)*)USD").expect("valid price regex"));
static RE_DIGIT_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:,\d+)*").expect("valid digit regex"));

static RE_MILEAGE_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Пробіг[:\s]*(\d+)\s*(?:тис\.|тыс\.)\s*км").expect("valid mileage regex")
});
static RE_MILEAGE_THOUSANDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:тис\.|тыс\.|thousand)\s*(?:км|km)").expect("valid mileage regex")
});
static RE_MILEAGE_PLAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:\s\d{3})+|\d+)\s*(?:км|km)\b").expect("valid mileage regex")
});

static RE_VIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[A-HJ-NPR-Z0-9]{17}").expect("valid VIN regex"));
static RE_MASKED_VIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[A-HJ-NPR-Z0-9]{2,}[хx*]{3,}[A-HJ-NPR-Z0-9]*\d{2,}")
        .expect("valid masked VIN regex")
});

fn parse_grouped(digits: &str) -> Option<i64> {
    digits
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()
}

fn price_in_range(value: i64) -> Option<i64> {
    PRICE_USD_RANGE.contains(&value).then_some(value)
}

fn odometer_in_range(value: i64) -> Option<i64> {
    ODOMETER_KM_RANGE.contains(&value).then_some(value)
}

/// Finds a plausible USD price in whitespace-free text
///
/// Tries `N$`, then `$N`, then `N USD`; within each shape the first match
/// inside the accepted range wins.
pub fn parse_price_usd(compact: &str) -> Option<i64> {
    [&*RE_PRICE_DOLLAR_AFTER, &*RE_PRICE_DOLLAR_BEFORE, &*RE_PRICE_USD]
        .into_iter()
        .find_map(|re| {
            re.captures_iter(compact)
                .filter_map(|caps| parse_grouped(&caps[1]))
                .find_map(price_in_range)
        })
}

/// First in-range number in text already known to be a price
pub fn parse_price_digits(compact: &str) -> Option<i64> {
    RE_DIGIT_GROUP
        .find_iter(compact)
        .filter_map(|m| parse_grouped(m.as_str()))
        .find_map(price_in_range)
}

/// Finds a plausible mileage in kilometers
///
/// Thousands notation (`95 тис. км`, `95 thousand km`) is multiplied by
/// 1000; plain figures, including space-grouped ones like `95 000 км`, are
/// taken as-is.
pub fn parse_mileage(text: &str) -> Option<i64> {
    let thousands = [&*RE_MILEAGE_LABELLED, &*RE_MILEAGE_THOUSANDS]
        .into_iter()
        .find_map(|re| {
            re.captures_iter(text)
                .filter_map(|caps| caps[1].parse::<i64>().ok())
                .find_map(|value| odometer_in_range(value.checked_mul(1000)?))
        });

    thousands.or_else(|| {
        RE_MILEAGE_PLAIN
            .captures_iter(text)
            .filter_map(|caps| parse_grouped(&caps[1]))
            .find_map(odometer_in_range)
    })
}

/// Mileage from a `Пробіг N км` phrase, without unit scaling
pub fn parse_labelled_km(text: &str) -> Option<i64> {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"Пробіг\s*(\d+)\s*км").expect("valid mileage regex"));
    RE.captures(text)
        .and_then(|caps| caps[1].parse().ok())
        .and_then(odometer_in_range)
}

/// A 17-character VIN anywhere in `text`, upper-cased
pub fn find_vin(text: &str) -> Option<String> {
    RE_VIN.find(text).map(|m| m.as_str().to_uppercase())
}

/// A partially hidden VIN such as `WVWxxxxxxxx1234`
pub fn find_masked_vin(text: &str) -> Option<String> {
    RE_MASKED_VIN.find(text).map(|m| m.as_str().to_string())
}

/// Keeps ASCII digits only
pub fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

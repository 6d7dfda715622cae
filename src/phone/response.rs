//! Decoder for the phone endpoint's JSON body
//!
//! The endpoint has answered in several shapes over time: an object with a
//! `phones` array (of strings or of objects), an object with a single
//! `phone`, or a bare array. All of them normalize to a list of strings.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PhoneResponse {
    Listing { phones: Vec<PhoneEntry> },
    Single { phone: Value },
    Bare(Vec<PhoneEntry>),
    Unrecognized(Value),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PhoneEntry {
    Text(String),
    Record(PhoneFields),
    Other(Value),
}

/// Keys a phone object may carry, in preference order
#[derive(Debug, Deserialize)]
pub struct PhoneFields {
    #[serde(rename = "phoneFormatted")]
    phone_formatted: Option<Value>,
    phone: Option<Value>,
    number: Option<Value>,
    #[serde(rename = "phoneNumber")]
    phone_number: Option<Value>,
}

impl PhoneEntry {
    fn text(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Record(fields) => [
                &fields.phone_formatted,
                &fields.phone,
                &fields.number,
                &fields.phone_number,
            ]
            .into_iter()
            .flatten()
            .find_map(scalar_text),
            Self::Other(_) => None,
        }
    }
}

impl PhoneResponse {
    /// Normalized phone strings, in response order
    pub fn into_phones(self) -> Vec<String> {
        match self {
            Self::Listing { phones } | Self::Bare(phones) => {
                phones.iter().filter_map(PhoneEntry::text).collect()
            }
            Self::Single { phone } => scalar_text(&phone).into_iter().collect(),
            Self::Unrecognized(_) => Vec::new(),
        }
    }
}

/// Strings are kept when non-empty; numbers are rendered as written
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decodes a response body into phone strings
pub fn decode_phones(body: &str) -> Result<Vec<String>, serde_json::Error> {
    let response: PhoneResponse = serde_json::from_str(body)?;
    Ok(response.into_phones())
}

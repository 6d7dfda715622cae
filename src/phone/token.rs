//! Locating the hash/expires pair a listing page embeds for its phone lookup

use crate::extract::Page;
use regex::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;

/// Short-lived credentials accepted by the phone endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub hash: String,
    pub expires: String,
}

static RE_SCRIPT_HASH: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"hash["']?\s*:\s*["']([^'"]+)["']"#,
        r#"["']hash["']?\s*:\s*["']([^'"]+)["']"#,
        r#"hash\s*=\s*["']([^'"]+)["']"#,
        r#"data-hash\s*=\s*["']([^'"]+)["']"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid hash regex"))
    .collect()
});

static RE_SCRIPT_EXPIRES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"expires["']?\s*:\s*(\d+)"#,
        r#"["']expires["']?\s*:\s*(\d+)"#,
        r#"expires\s*=\s*(\d+)"#,
        r#"data-expires\s*=\s*["']?(\d+)["']?"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid expires regex"))
    .collect()
});

static RE_PHONE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)phone|contact").expect("valid class regex"));

/// Partial pair filled in across search passes
#[derive(Default)]
struct Found {
    hash: Option<String>,
    expires: Option<String>,
}

impl Found {
    fn complete(&self) -> bool {
        self.hash.is_some() && self.expires.is_some()
    }

    fn fill(&mut self, hash: Option<&str>, expires: Option<&str>) {
        if self.hash.is_none() {
            self.hash = hash.filter(|h| !h.is_empty()).map(str::to_string);
        }
        if self.expires.is_none() {
            self.expires = expires.filter(|e| !e.is_empty()).map(str::to_string);
        }
    }

    fn fill_from(&mut self, element: ElementRef<'_>) {
        let attrs = element.value();
        self.fill(attrs.attr("data-hash"), attrs.attr("data-expires"));
    }

    fn into_pair(self) -> Option<TokenPair> {
        Some(TokenPair {
            hash: self.hash?,
            expires: self.expires?,
        })
    }
}

/// Searches the page for a complete token pair
///
/// Passes run in order and keep whatever part an earlier pass found:
/// elements carrying both attributes, inline scripts, phone/contact
/// controls, then any element carrying either attribute.
pub fn find_token_pair(page: &Page) -> Option<TokenPair> {
    let mut found = Found::default();

    for element in page.select("[data-hash]") {
        let attrs = element.value();
        if let (Some(hash), Some(expires)) = (attrs.attr("data-hash"), attrs.attr("data-expires")) {
            if !hash.is_empty() && !expires.is_empty() {
                found.fill(Some(hash), Some(expires));
                break;
            }
        }
    }

    if !found.complete() {
        for script in page.select("script") {
            let body: String = script.text().collect();
            if found.hash.is_none() {
                found.hash = first_capture(&RE_SCRIPT_HASH, &body);
            }
            if found.expires.is_none() {
                found.expires = first_capture(&RE_SCRIPT_EXPIRES, &body);
            }
            if found.complete() {
                break;
            }
        }
    }

    if !found.complete() {
        let controls = page.select("button[class], a[class], span[class]");
        for element in controls.into_iter().filter(|el| {
            el.value()
                .attr("class")
                .map_or(false, |class| RE_PHONE_CLASS.is_match(class))
        }) {
            found.fill_from(element);
            if found.complete() {
                break;
            }
        }
    }

    if !found.complete() {
        if let Some(element) = page.first("[data-hash]") {
            found.fill(element.value().attr("data-hash"), None);
        }
        if let Some(element) = page.first("[data-expires]") {
            found.fill(None, element.value().attr("data-expires"));
        }
    }

    found.into_pair()
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(text).map(|caps| caps[1].to_string()))
}

//! Search results page parser
//!
//! Extracts the ad links and the next-page link from one page of search
//! results. Links come from four sources, unioned in this order and
//! de-duplicated by exact absolute URL:
//!
//! 1. the primary results container (`div#catalogSearchAT a.address`)
//! 2. the secondary results container, consulted only when the primary one
//!    is absent (`div#searchResults section.ticket-item* a.address`)
//! 3. promotional cards (`a.proposition_link` into `/newauto/`, and any
//!    link into `/newauto/auto-`)
//! 4. dealer catalog links shaped like `auto-...-<id>.html`

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static RE_CATALOG_AD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"auto-.*-\d+\.html").expect("valid catalog regex"));

/// Links found on one search results page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingLinks {
    /// Absolute ad URLs in first-seen order
    pub ads: Vec<String>,
    /// Absolute URL of the following results page
    pub next_page: Option<String>,
}

/// Parses a results page
///
/// # Example
///
/// ```no_run
/// use ria_harvest::crawler::parse_listing;
/// use url::Url;
///
/// let html = r#"<div id="catalogSearchAT"><a class="address" href="/uk/auto_bmw_x6_1.html"></a></div>"#;
/// let base = Url::parse("https://auto.ria.com/uk/search/").unwrap();
/// let links = parse_listing(html, &base);
/// assert_eq!(links.ads, vec!["https://auto.ria.com/uk/auto_bmw_x6_1.html"]);
/// ```
pub fn parse_listing(html: &str, base_url: &Url) -> ListingLinks {
    let document = Html::parse_document(html);
    let mut collector = LinkCollector::new(base_url);

    if let Some(primary) = first(&document, "div#catalogSearchAT") {
        for link in select_in(primary, "a.address") {
            collector.push(link);
        }
    } else if let Some(secondary) = first(&document, "div#searchResults") {
        for section in select_in(secondary, r#"section[class*="ticket-item"]"#) {
            if let Some(link) = select_in(section, "a.address").into_iter().next() {
                collector.push(link);
            }
        }
    }

    for link in select(&document, "a.proposition_link") {
        if href(link).map_or(false, |h| h.contains("/newauto/")) {
            collector.push(link);
        }
    }

    for link in select(&document, "a[href]") {
        if href(link).map_or(false, |h| h.contains("/newauto/auto-")) {
            collector.push(link);
        }
    }

    for link in select(&document, "a[href]") {
        let is_catalog_ad = href(link).map_or(false, |h| {
            RE_CATALOG_AD.is_match(h) && h.contains("/auto-") && !h.contains("/autosalons/")
        });
        if is_catalog_ad {
            collector.push(link);
        }
    }

    let next_page = first(&document, "a.page-link.js-next")
        .and_then(href)
        .and_then(|h| resolve_link(h, base_url));

    ListingLinks {
        ads: collector.links,
        next_page,
    }
}

struct LinkCollector<'a> {
    base_url: &'a Url,
    seen: HashSet<String>,
    links: Vec<String>,
}

impl<'a> LinkCollector<'a> {
    fn new(base_url: &'a Url) -> Self {
        Self {
            base_url,
            seen: HashSet::new(),
            links: Vec::new(),
        }
    }

    fn push(&mut self, element: ElementRef<'_>) {
        let Some(url) = href(element).and_then(|h| resolve_link(h, self.base_url)) else {
            return;
        };
        if self.seen.insert(url.clone()) {
            self.links.push(url);
        }
    }
}

fn href(element: ElementRef<'_>) -> Option<&str> {
    element.value().attr("href")
}

fn select<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn select_in<'a>(element: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => element.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    select(document, css).into_iter().next()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}

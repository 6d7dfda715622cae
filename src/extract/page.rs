//! Parsed listing document with the lookups extraction strategies share

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// A fetched listing page, parsed once and shared by every strategy
pub struct Page {
    url: String,
    base: Option<Url>,
    doc: Html,
    text: String,
    compact: String,
}

impl Page {
    pub fn parse(url: &str, html: &str) -> Self {
        let doc = Html::parse_document(html);
        let text = visible_text(&doc);
        let compact = text.chars().filter(|c| !c.is_whitespace()).collect();

        Self {
            url: url.to_string(),
            base: Url::parse(url).ok(),
            doc,
            text,
            compact,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn document(&self) -> &Html {
        &self.doc
    }

    /// Visible text, one space between text nodes
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Visible text with every whitespace character removed
    pub fn compact_text(&self) -> &str {
        &self.compact
    }

    /// All elements matching `css`, in document order
    ///
    /// An unparsable selector yields nothing.
    pub fn select(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(selector) => self.doc.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn first(&self, css: &str) -> Option<ElementRef<'_>> {
        let selector = Selector::parse(css).ok()?;
        self.doc.select(&selector).next()
    }

    /// Text of the first element matching `css`, if non-empty
    pub fn first_text(&self, css: &str) -> Option<String> {
        self.first(css).map(element_text).filter(|t| !t.is_empty())
    }

    /// Resolves `href` against the page URL
    pub fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        match &self.base {
            Some(base) => base.join(href).ok().map(String::from),
            None => Url::parse(href).ok().map(String::from),
        }
    }
}

/// Element text with whitespace runs collapsed to single spaces
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse(element.text())
}

/// Element text skipping any subtree whose element carries `class`
pub fn text_without(element: ElementRef<'_>, class: &str) -> String {
    let root = element.id();
    let parts = element.descendants().filter_map(|node| {
        let text = node.value().as_text()?;
        let hidden = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != root)
            .filter_map(|ancestor| ancestor.value().as_element())
            .any(|el| el.classes().any(|c| c == class));
        (!hidden).then_some(&**text)
    });
    collapse(parts)
}

/// True when any class of `element` matches `pattern`
pub fn class_matches(element: ElementRef<'_>, pattern: &regex::Regex) -> bool {
    element
        .value()
        .attr("class")
        .map_or(false, |classes| pattern.is_match(classes))
}

/// First run of ASCII digits in `text`
pub fn first_number(text: &str) -> Option<i64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// First URL of a `srcset` attribute
pub fn first_srcset_url(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .next()?
        .split_whitespace()
        .next()
        .filter(|url| !url.is_empty())
}

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for word in parts.flat_map(str::split_whitespace) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

fn visible_text(doc: &Html) -> String {
    let parts = doc.root_element().descendants().filter_map(|node| {
        let text = node.value().as_text()?;
        let in_code = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .map_or(false, |el| matches!(el.name(), "script" | "style" | "noscript"));
        (!in_code).then_some(&**text)
    });
    collapse(parts)
}

//! Chains for new-car dealer listings

use crate::extract::page::{element_text, first_number, first_srcset_url, Page};
use crate::extract::strategy::{FieldChains, Strategy};
use crate::extract::text::{digits_only, find_masked_vin, find_vin, parse_labelled_km, parse_price_usd};

pub static PROMOTIONAL: FieldChains = FieldChains {
    title: &[
        Strategy::new("h1.auto-head_title", title_from_head),
        Strategy::new("h1", |p| p.first_text("h1")),
    ],
    price_usd: &[Strategy::new("div.auto-price", |p| {
        let text: String = p
            .first("div.auto-price")
            .map(element_text)?
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        parse_price_usd(&text)
    })],
    odometer: &[
        Strategy::new("dealer-description", |p| {
            p.first("section.description_by_autosalon")
                .and_then(|section| parse_labelled_km(&element_text(section)))
        }),
        Strategy::new("new-vehicle", |_| Some(0)),
    ],
    username: &[Strategy::new("dealer-name", |p| {
        p.first_text("div.seller_info_name a strong.name")
    })],
    phone_number: &[Strategy::new("span.conversion_phone_newcars", |p| {
        let digits = digits_only(&element_text(p.first("span.conversion_phone_newcars")?));
        digits.parse().ok()
    })],
    image_url: &[
        Strategy::new("gallery-webp", image_from_gallery_webp),
        Strategy::new("gallery-img", image_from_gallery_img),
    ],
    images_count: &[Strategy::new("label.panoram-tab-item", |p| {
        p.first("label.panoram-tab-item")
            .and_then(|label| first_number(&element_text(label)))
    })],
    car_number: &[],
    car_vin: &[Strategy::new("section.vin_checked", vin_from_checked_section)],
};

const GALLERY: &str = "div.image-gallery-slide.center picture";

fn title_from_head(page: &Page) -> Option<String> {
    let head = page.first("h1.auto-head_title")?;
    let part = |css: &str| {
        let selector = scraper::Selector::parse(css).ok()?;
        let text = head.select(&selector).next().map(element_text);
        text.filter(|t| !t.is_empty())
    };

    let parts: Vec<String> = [part("strong"), part("div.auto-head_base")]
        .into_iter()
        .flatten()
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn image_from_gallery_webp(page: &Page) -> Option<String> {
    let source = page.first(&format!(r#"{} source[type="image/webp"]"#, GALLERY))?;
    let url = first_srcset_url(source.value().attr("srcset")?)?;
    page.resolve(url)
}

fn image_from_gallery_img(page: &Page) -> Option<String> {
    let img = page.first(&format!("{} img", GALLERY))?;
    page.resolve(img.value().attr("src")?)
}

fn vin_from_checked_section(page: &Page) -> Option<String> {
    page.select("section.vin_checked li")
        .into_iter()
        .map(element_text)
        .find_map(|text| find_vin(&text).or_else(|| find_masked_vin(&text)))
}

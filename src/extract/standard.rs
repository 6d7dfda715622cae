//! Chains for used-car listings

use crate::extract::page::{class_matches, element_text, first_number, first_srcset_url, text_without, Page};
use crate::extract::strategy::{FieldChains, Strategy};
use crate::extract::text::{find_vin, parse_mileage, parse_price_digits, parse_price_usd};
use regex::Regex;
use std::sync::LazyLock;

pub static STANDARD: FieldChains = FieldChains {
    title: &[
        Strategy::new("h1.head", |p| p.first_text("h1.head")),
        Strategy::new("h1.auto-head_title", |p| p.first_text("h1.auto-head_title")),
        Strategy::new("h1", |p| p.first_text("h1")),
        Strategy::new("div.title-class", title_from_classed_div),
        Strategy::new("early-heading-make", title_from_early_heading),
        Strategy::new("page-text-make", title_from_page_text),
    ],
    price_usd: &[
        Strategy::new(".price_value", price_from_price_value),
        Strategy::new("highlighted-price", price_from_highlighted),
        Strategy::new("page-text", |p| parse_price_usd(p.compact_text())),
    ],
    odometer: &[
        Strategy::new(".base-information", |p| mileage_from(p, ".base-information")),
        Strategy::new("mileage-class", mileage_from_classed),
        Strategy::new("page-text", |p| parse_mileage(p.text())),
    ],
    username: &[
        Strategy::new("a.sellerPro", username_from_seller_pro),
        Strategy::new("div.seller_info_name", |p| name_text(p, "div.seller_info_name")),
        Strategy::new("div.seller-info-name", |p| name_text(p, "div.seller-info-name")),
        Strategy::new("span.seller-name", |p| name_text(p, "span.seller-name")),
        Strategy::new("seller-name-class", username_from_classed_div),
        Strategy::new("profile-link", username_from_profile_link),
        Strategy::new("page-text-label", username_from_label),
    ],
    phone_number: &[],
    image_url: &[
        Strategy::new("photo-img", image_from_photo_img),
        Strategy::new("picture-webp", image_from_picture_webp),
        Strategy::new("picture-img", image_from_picture_img),
    ],
    images_count: &[Strategy::new("a.show-all", |p| {
        p.first("a.show-all.link-dotted")
            .and_then(|a| first_number(&element_text(a)))
    })],
    car_number: &[
        Strategy::new("span.state-num", plate_from_state_num),
        Strategy::new("div.car-number", |p| {
            p.first_text("div.car-number.ua span.common-text.ws-pre-wrap.badge")
        }),
    ],
    car_vin: &[
        Strategy::new("span.label-vin", |p| vin_from(p, "span.label-vin")),
        Strategy::new("span.vin-code", |p| vin_from(p, "span.vin-code")),
    ],
};

const KNOWN_MAKES: &[&str] = &[
    "kia", "toyota", "bmw", "mercedes", "audi", "volkswagen", "ford", "hyundai", "nissan", "honda",
];

static RE_TITLE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)title|head").expect("valid class regex"));
static RE_PRICE_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)color.*green|var\(--green\)").expect("valid style regex"));
static RE_PRICE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)green|price").expect("valid class regex"));
static RE_MILEAGE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)mileage|odometer").expect("valid class regex"));
static RE_SELLER_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)seller.*name|contact.*person").expect("valid class regex")
});
static RE_PROFILE_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/users/|/seller/|/profile/").expect("valid href regex"));
static RE_MAKE_MODEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b((?:Kia|Toyota|BMW|Mercedes-Benz|Mercedes|Audi|Volkswagen|Ford|Hyundai|Nissan|Honda|Mazda|Lexus|Renault|Peugeot|Citroen|Skoda|Seat|Volvo|Subaru|Mitsubishi|Suzuki|Infiniti|Chevrolet|Chrysler|Dodge|Jeep|Land Rover|Porsche|Fiat|Mini|Dacia|Lada|ZAZ|Chery|Geely|BYD|MG|SsangYong|Daewoo|Opel|Tesla)\s+[A-Za-z0-9\- ]+?(?:\s(?:19|20)\d{2})?)\b",
    )
    .expect("valid make regex")
});
static RE_SELLER_LABELS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["Продавець", "Контакт", "Власник", "Менеджер"]
        .iter()
        .map(|label| {
            Regex::new(&format!(r"{}[:\s]+([А-Яа-яІіЇїЄєҐґA-Za-z ]{{2,30}})", label))
                .expect("valid label regex")
        })
        .collect()
});

const SERVICE_WORDS: &[&str] = &[
    "показать", "показати", "телефон", "номер", "контакт", "інформація",
];

fn title_from_classed_div(page: &Page) -> Option<String> {
    page.select("div")
        .into_iter()
        .filter(|div| class_matches(*div, &RE_TITLE_CLASS))
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn title_from_early_heading(page: &Page) -> Option<String> {
    page.select("h1, h2, div")
        .into_iter()
        .take(10)
        .map(element_text)
        .find(|text| {
            let lower = text.to_lowercase();
            text.chars().count() > 10 && KNOWN_MAKES.iter().any(|make| lower.contains(make))
        })
}

fn title_from_page_text(page: &Page) -> Option<String> {
    RE_MAKE_MODEL
        .captures(page.text())
        .map(|caps| caps[1].trim().to_string())
        .filter(|title| title.chars().count() > 5)
}

fn price_from_price_value(page: &Page) -> Option<i64> {
    [".price_value strong", ".price_value"]
        .into_iter()
        .filter_map(|css| page.first(css))
        .map(|el| compact(&element_text(el)))
        .find_map(|text| parse_price_usd(&text).or_else(|| parse_price_digits(&text)))
}

fn price_from_highlighted(page: &Page) -> Option<i64> {
    let styled = page.select("span[style], strong[style], div[style]").into_iter().filter(|el| {
        el.value()
            .attr("style")
            .map_or(false, |style| RE_PRICE_STYLE.is_match(style))
    });
    let classed = page
        .select("span[class], strong[class], div[class]")
        .into_iter()
        .filter(|el| class_matches(*el, &RE_PRICE_CLASS));

    styled
        .chain(classed)
        .map(|el| compact(&element_text(el)))
        .filter(|text| text.contains('$') || text.contains("USD"))
        .find_map(|text| parse_price_digits(&text))
}

fn mileage_from(page: &Page, css: &str) -> Option<i64> {
    page.select(css)
        .into_iter()
        .map(element_text)
        .filter(|text| mentions_km(text))
        .find_map(|text| parse_mileage(&text))
}

fn mileage_from_classed(page: &Page) -> Option<i64> {
    page.select("div[class], span[class]")
        .into_iter()
        .filter(|el| class_matches(*el, &RE_MILEAGE_CLASS))
        .map(element_text)
        .filter(|text| mentions_km(text))
        .find_map(|text| parse_mileage(&text))
}

fn mentions_km(text: &str) -> bool {
    text.contains("км") || text.to_lowercase().contains("km")
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn plausible_name(text: String) -> Option<String> {
    let trimmed = text.trim();
    (trimmed.chars().count() > 1).then(|| trimmed.to_string())
}

fn name_text(page: &Page, css: &str) -> Option<String> {
    page.first(css).and_then(|el| plausible_name(element_text(el)))
}

fn username_from_seller_pro(page: &Page) -> Option<String> {
    let link = page.first("a.sellerPro")?;
    plausible_name(element_text(link)).or_else(|| {
        let img_selector = scraper::Selector::parse("img").ok()?;
        link.select(&img_selector).find_map(|img| {
            let attrs = img.value();
            attrs
                .attr("alt")
                .or_else(|| attrs.attr("title"))
                .and_then(|name| plausible_name(name.to_string()))
        })
    })
}

fn username_from_classed_div(page: &Page) -> Option<String> {
    page.select("div[class]")
        .into_iter()
        .filter(|el| class_matches(*el, &RE_SELLER_CLASS))
        .find_map(|el| plausible_name(element_text(el)))
}

fn username_from_profile_link(page: &Page) -> Option<String> {
    page.select("a[href]")
        .into_iter()
        .filter(|a| {
            a.value()
                .attr("href")
                .map_or(false, |href| RE_PROFILE_HREF.is_match(href))
        })
        .map(element_text)
        .find(|text| (2..50).contains(&text.chars().count()))
}

fn username_from_label(page: &Page) -> Option<String> {
    RE_SELLER_LABELS.iter().find_map(|re| {
        let name = re.captures(page.text())?[1].trim().to_string();
        let lower = name.to_lowercase();
        let service = SERVICE_WORDS.iter().any(|word| lower.contains(word));
        (name.chars().count() >= 2 && !service).then_some(name)
    })
}

fn is_listing_photo(src: &str) -> bool {
    (src.contains("photosnew") || src.contains("cdn"))
        && !src.contains("left-panel")
        && !src.contains("avatar")
}

fn is_generic_image(src: &str) -> bool {
    src.contains("left-panel") || src.contains("avatar")
}

fn image_from_photo_img(page: &Page) -> Option<String> {
    page.select("img").into_iter().find_map(|img| {
        let attrs = img.value();
        let src = attrs.attr("src").or_else(|| attrs.attr("data-src"))?;
        if is_listing_photo(src) {
            page.resolve(src)
        } else {
            None
        }
    })
}

fn image_from_picture_webp(page: &Page) -> Option<String> {
    let picture = page.first("picture")?;
    let source = scraper::Selector::parse(r#"source[type="image/webp"]"#).ok()?;
    let srcset = picture.select(&source).next()?.value().attr("srcset")?;
    let url = first_srcset_url(srcset)?;
    if is_generic_image(url) {
        return None;
    }
    page.resolve(url)
}

fn image_from_picture_img(page: &Page) -> Option<String> {
    let picture = page.first("picture")?;
    let img_selector = scraper::Selector::parse("img").ok()?;
    let img = picture.select(&img_selector).next()?;
    let src = img
        .value()
        .attr("src")
        .or_else(|| img.value().attr("data-src"))?;
    if is_generic_image(src) {
        return None;
    }
    page.resolve(src)
}

fn plate_from_state_num(page: &Page) -> Option<String> {
    page.first("span.state-num.ua")
        .map(|plate| text_without(plate, "popup"))
        .filter(|plate| !plate.is_empty())
}

fn vin_from(page: &Page, css: &str) -> Option<String> {
    let raw = element_text(page.first(css)?);
    if raw.is_empty() {
        return None;
    }
    Some(find_vin(&raw).unwrap_or(raw))
}

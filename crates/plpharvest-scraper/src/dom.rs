//! Last-resort product recovery from listing markup.
//!
//! Works on product-tile-like elements when no payload or API result is
//! available. Every field is best effort: brand and colour in particular are
//! guessed from the title text and may be wrong. A tile without a product
//! link is not a product and is skipped; nothing here fails the page.

use std::collections::HashSet;
use std::sync::LazyLock;

use plpharvest_core::ExtractionMethod;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

use crate::types::RawProduct;
use crate::urls::absolutize;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static TILE: LazyLock<Selector> = LazyLock::new(|| {
    selector(
        r#"article, [data-testid*="product-tile"], [data-auto-id*="productTile"], [class*="productTile"], [class*="product-tile"]"#,
    )
});
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("img"));

static PRICE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        r#"[data-testid="current-price"]"#,
        r#"[data-auto-id="productTilePrice"]"#,
        r#"[data-auto-id="productTileSaleAmount"]"#,
        r#"[class*="currentPrice"]"#,
        r#"[class*="price__current"]"#,
        r#"[class*="price"]"#,
    ]
    .into_iter()
    .map(selector)
    .collect()
});

static PREVIOUS_PRICE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        r#"[data-testid="previous-price"]"#,
        r#"[data-auto-id="productTileRRP"]"#,
        r#"[class*="previousPrice"]"#,
        "s",
        "del",
    ]
    .into_iter()
    .map(selector)
    .collect()
});

static TITLE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        r#"[data-auto-id="productTileDescription"]"#,
        r#"[class*="productDescription"]"#,
        r#"[class*="description"]"#,
        "h2",
        "h3",
    ]
    .into_iter()
    .map(selector)
    .collect()
});

static BADGE: LazyLock<Selector> = LazyLock::new(|| {
    selector(
        r#"[data-testid*="badge"], [data-auto-id*="Badge"], [class*="badge"], [class*="Badge"], [class*="overlay"]"#,
    )
});

static PRODUCT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:prd|grp)/").expect("valid regex"));
static PRODUCT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:/(?:prd|grp)/|[?&]productId=)(\d+)").expect("valid regex")
});
static CURRENCY_PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[£$€]\s?\d[\d,]*(?:\.\d+)?").expect("valid regex"));
static PRICE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\s,;:|-]*(?:now|was|price|from)?\s*[£$€]\s?\d[\d,]*(?:\.\d+)?.*$")
        .expect("valid regex")
});
static COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bin\s+([a-z][a-z/&\s-]*)").expect("valid regex"));

/// Words that end a colour phrase: materials, fits, and promotional noise.
const COLOR_STOP_WORDS: &[&str] = &[
    "and", "with", "for", "exclusive", "sale", "new", "only", "pack", "multipack", "cotton",
    "linen", "wool", "leather", "faux", "denim", "suede", "satin", "velvet", "jersey", "fleece",
    "nylon", "polyester", "silk", "knit", "organic", "recycled", "print", "stripe", "check",
    "co-ord", "part", "of", "a", "set",
];
const MAX_COLOR_WORDS: usize = 3;

/// Recovers products from listing markup.
///
/// Tiles are matched by tag, test identifier or class-name substring and
/// deduplicated by product URL. `page` scopes placeholder ids given to tiles
/// whose link carries no numeric id.
#[must_use]
pub fn extract_from_markup(markup: &str, site_base: &str, page: u32) -> Vec<RawProduct> {
    let document = Html::parse_document(markup);
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut products = Vec::new();

    for tile in document.select(&TILE) {
        let Some(href) = product_href(tile) else {
            continue;
        };
        let Some(url) = absolutize(site_base, href) else {
            continue;
        };
        if !seen_urls.insert(url.clone()) {
            continue;
        }
        let position = products.len() + 1;
        products.push(tile_to_raw(tile, url, page, position));
    }

    tracing::debug!(count = products.len(), "dom heuristic tiles");
    products
}

fn product_href(tile: ElementRef<'_>) -> Option<&str> {
    let own = (tile.value().name() == "a")
        .then(|| tile.value().attr("href"))
        .flatten();
    own.into_iter()
        .chain(tile.select(&LINK).filter_map(|a| a.value().attr("href")))
        .find(|href| PRODUCT_LINK_RE.is_match(href))
}

fn tile_to_raw(tile: ElementRef<'_>, url: String, page: u32, position: usize) -> RawProduct {
    let mut fields = Map::new();

    let id = PRODUCT_ID_RE
        .captures(&url)
        .map_or_else(|| format!("dom-p{page}-{position}"), |c| c[1].to_owned());
    fields.insert("id".to_owned(), Value::String(id));

    let tile_text = collapse_whitespace(&tile.text().collect::<Vec<_>>().join(" "));

    let title = first_text(tile, &TITLE)
        .or_else(|| link_label(tile))
        .map(|t| strip_price_suffix(&t))
        .filter(|t| !t.is_empty());
    if let Some(title) = &title {
        if let Some(color) = color_from_title(title) {
            fields.insert("colour".to_owned(), Value::String(color));
        }
        if let Some(brand) = brand_from_title(title) {
            fields.insert("brandName".to_owned(), Value::String(brand));
        }
        fields.insert("name".to_owned(), Value::String(title.clone()));
    }

    let price = first_matching(tile, &PRICE, has_digit).or_else(|| {
        CURRENCY_PRICE_RE
            .find(&tile_text)
            .map(|m| m.as_str().to_owned())
    });
    if let Some(price) = price {
        fields.insert("priceText".to_owned(), Value::String(price));
    }
    if let Some(previous) = first_matching(tile, &PREVIOUS_PRICE, has_digit) {
        fields.insert("wasPrice".to_owned(), Value::String(previous));
    }

    if let Some(image) = image_src(tile) {
        fields.insert("imageUrl".to_owned(), Value::String(image));
    }

    let badges = badges(tile);
    if !badges.is_empty() {
        fields.insert(
            "badges".to_owned(),
            Value::Array(badges.into_iter().map(Value::String).collect()),
        );
    }

    let lowered = tile_text.to_lowercase();
    if lowered.contains("out of stock") || lowered.contains("sold out") {
        fields.insert("isInStock".to_owned(), Value::Bool(false));
    }

    fields.insert("url".to_owned(), Value::String(url));
    RawProduct::new(ExtractionMethod::DomHeuristic, fields)
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn has_digit(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
}

fn first_text(tile: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    first_matching(tile, selectors, |text| !text.is_empty())
}

/// Text of the first element, across `selectors` in priority order, whose
/// text satisfies `accept`.
fn first_matching(
    tile: ElementRef<'_>,
    selectors: &[Selector],
    accept: impl Fn(&str) -> bool,
) -> Option<String> {
    selectors.iter().find_map(|sel| {
        tile.select(sel)
            .map(element_text)
            .find(|text| accept(text))
    })
}

fn link_label(tile: ElementRef<'_>) -> Option<String> {
    std::iter::once(tile)
        .chain(tile.select(&LINK))
        .find_map(|el| el.value().attr("aria-label"))
        .map(collapse_whitespace)
        .filter(|label| !label.is_empty())
}

fn strip_price_suffix(title: &str) -> String {
    PRICE_SUFFIX_RE.replace(title, "").trim().to_owned()
}

/// `"Relaxed shirt in washed black cotton"` → `"washed black"`.
fn color_from_title(title: &str) -> Option<String> {
    let caps = COLOR_RE.captures_iter(title).last()?;
    let words: Vec<&str> = caps[1]
        .split_whitespace()
        .take_while(|word| {
            let lower = word.to_lowercase();
            word.chars().next().is_some_and(char::is_alphabetic)
                && !COLOR_STOP_WORDS.contains(&lower.as_str())
        })
        .take(MAX_COLOR_WORDS)
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}

/// Leading all-caps tokens, e.g. `"DESIGN relaxed shirt"` → `"DESIGN"`.
fn brand_from_title(title: &str) -> Option<String> {
    let tokens: Vec<&str> = title
        .split_whitespace()
        .take_while(|token| {
            let letters = token.chars().filter(|c| c.is_alphabetic()).count();
            letters >= 2
                && token
                    .chars()
                    .all(|c| c.is_uppercase() || c.is_ascii_digit() || "&'-.".contains(c))
        })
        .collect();
    (!tokens.is_empty()).then(|| tokens.join(" "))
}

fn image_src(tile: ElementRef<'_>) -> Option<String> {
    tile.select(&IMAGE).find_map(|img| {
        let attrs = img.value();
        ["src", "data-src"]
            .iter()
            .filter_map(|name| attrs.attr(name))
            .map(str::trim)
            .chain(
                attrs
                    .attr("srcset")
                    .and_then(|set| set.split(',').next())
                    .and_then(|first| first.split_whitespace().next()),
            )
            .find(|src| !src.is_empty() && !src.starts_with("data:"))
            .map(str::to_owned)
    })
}

fn badges(tile: ElementRef<'_>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for text in tile.select(&BADGE).map(element_text) {
        if text.is_empty() || CURRENCY_PRICE_RE.is_match(&text) {
            continue;
        }
        if !out.iter().any(|b| b.eq_ignore_ascii_case(&text)) {
            out.push(text);
        }
    }
    out
}

#[cfg(test)]
#[path = "dom_test.rs"]
mod tests;

//! Normalization from any strategy's [`RawProduct`] to a
//! [`CanonicalProduct`].
//!
//! Every field has one ordered list of candidate keys; the first candidate
//! that yields a usable value wins. Prices prefer numeric fields and only
//! fall back to parsing display text. The normalizer never fails: a record
//! with no recoverable id comes back with an empty `id` and is discarded by
//! the caller.

use chrono::Utc;
use plpharvest_core::{CanonicalProduct, HarvestConfig};
use serde_json::Value;

use crate::parse_helpers::{parse_price_text, value_as_bool, value_as_f64, value_as_string};
use crate::types::RawProduct;
use crate::urls::{absolutize, normalize_image_url};

type Candidates = &'static [&'static [&'static str]];

const ID: Candidates = &[&["id"], &["productId"], &["product_id"]];
const TITLE: Candidates = &[&["name"], &["title"], &["productTitle"]];
const BRAND: Candidates = &[&["brandName"], &["brand", "name"], &["brand"]];
const CURRENCY: Candidates = &[&["currency"], &["price", "currency"]];
const PRICE_VALUE: Candidates = &[
    &["price", "current", "value"],
    &["price", "current"],
    &["price", "value"],
    &["price"],
    &["currentPrice"],
];
const PRICE_TEXT: Candidates = &[
    &["price", "current", "text"],
    &["price", "text"],
    &["priceText"],
    &["price"],
    &["currentPrice"],
];
const ORIGINAL_PRICE_VALUE: Candidates = &[
    &["price", "previous", "value"],
    &["price", "rrp", "value"],
    &["price", "was", "value"],
    &["price", "previous"],
    &["price", "rrp"],
    &["price", "was"],
    &["previousPrice"],
    &["wasPrice"],
    &["rrp"],
];
const ORIGINAL_PRICE_TEXT: Candidates = &[
    &["price", "previous", "text"],
    &["price", "rrp", "text"],
    &["price", "was", "text"],
    &["price", "previous"],
    &["price", "rrp"],
    &["price", "was"],
    &["previousPrice"],
    &["wasPrice"],
    &["rrp"],
];
const MARKED_DOWN: Candidates = &[&["price", "isMarkedDown"], &["isMarkedDown"]];
const IN_STOCK: Candidates = &[&["isInStock"], &["inStock"], &["available"]];
const URL: Candidates = &[&["url"], &["productUrl"], &["href"]];
const IMAGE: Candidates = &[
    &["imageUrl"],
    &["image"],
    &["images"],
    &["imageUrls"],
    &["media", "images"],
];
const COLOR: Candidates = &[&["colour"], &["color"], &["colourName"]];
const BADGE: Candidates = &[&["badge"], &["badges"]];
const DESCRIPTION: Candidates = &[&["description"]];

/// Site roots used to absolutize product and image links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteUrls {
    pub site_base: String,
    pub media_base: String,
}

impl SiteUrls {
    #[must_use]
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            site_base: config.site_base_url.clone(),
            media_base: config.media_base_url.clone(),
        }
    }

    /// Fallback product page for an id with no link.
    #[must_use]
    pub fn product_url(&self, id: &str) -> String {
        format!("{}/prd/{id}", self.site_base.trim_end_matches('/'))
    }
}

/// Maps a raw product into the canonical schema.
#[must_use]
pub fn normalize_product(raw: &RawProduct, source_url: &str, urls: &SiteUrls) -> CanonicalProduct {
    let id = first(raw, ID, value_as_string).unwrap_or_default();

    let price_text = first(raw, PRICE_TEXT, as_text);
    let price_value = first(raw, PRICE_VALUE, value_as_f64)
        .or_else(|| price_text.as_deref().and_then(parse_price_text));
    let original_price_value = first(raw, ORIGINAL_PRICE_VALUE, value_as_f64).or_else(|| {
        first(raw, ORIGINAL_PRICE_TEXT, as_text)
            .as_deref()
            .and_then(parse_price_text)
    });

    let flagged = first(raw, MARKED_DOWN, value_as_bool).unwrap_or(false);
    let reduced = matches!(
        (original_price_value, price_value),
        (Some(previous), Some(current)) if previous > current
    );

    let currency = first(raw, CURRENCY, value_as_string)
        .or_else(|| price_text.as_deref().and_then(currency_from_symbol));

    let url = first(raw, URL, as_text)
        .and_then(|href| absolutize(&urls.site_base, &href))
        .or_else(|| (!id.is_empty()).then(|| urls.product_url(&id)))
        .unwrap_or_default();

    let image_url = first(raw, IMAGE, image_candidate)
        .and_then(|src| normalize_image_url(&src, &urls.media_base));

    CanonicalProduct {
        title: first(raw, TITLE, as_text),
        brand: first(raw, BRAND, as_text),
        currency,
        price_value,
        price_text,
        original_price_value,
        is_marked_down: flagged || reduced,
        is_in_stock: stock_flag(raw).unwrap_or(true),
        url,
        image_url,
        color: first(raw, COLOR, as_text),
        badge: first(raw, BADGE, badge_text),
        description: first(raw, DESCRIPTION, as_text),
        source_url: source_url.to_owned(),
        extraction_method: raw.method,
        scraped_at: Utc::now(),
        id,
    }
}

/// The stock flag when the record states one; `None` means "not said".
pub(crate) fn stock_flag(raw: &RawProduct) -> Option<bool> {
    first(raw, IN_STOCK, value_as_bool)
}

/// Resolves the first candidate path whose value `read` accepts.
fn first<T>(raw: &RawProduct, candidates: Candidates, read: fn(&Value) -> Option<T>) -> Option<T> {
    candidates
        .iter()
        .find_map(|path| raw.get_path(path).and_then(read))
}

/// Strings only; numbers are not display text.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(_) => value_as_string(value),
        _ => None,
    }
}

/// An image field may be a URL string, an object with `url`, or an array
/// of either.
fn image_candidate(value: &Value) -> Option<String> {
    match value {
        Value::String(_) => as_text(value),
        Value::Object(map) => map.get("url").and_then(as_text),
        Value::Array(items) => items.first().and_then(image_candidate),
        _ => None,
    }
}

/// A badge may be a string, an object with a text-ish key, or an array of
/// either; arrays are joined with `", "` after dropping repeats.
fn badge_text(value: &Value) -> Option<String> {
    match value {
        Value::String(_) => as_text(value),
        Value::Object(map) => ["text", "label", "name", "type"]
            .iter()
            .find_map(|key| map.get(*key).and_then(as_text)),
        Value::Array(items) => {
            let mut parts: Vec<String> = Vec::new();
            for part in items.iter().filter_map(badge_text) {
                if !parts.contains(&part) {
                    parts.push(part);
                }
            }
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

fn currency_from_symbol(text: &str) -> Option<String> {
    let code = if text.contains('£') {
        "GBP"
    } else if text.contains('€') {
        "EUR"
    } else if text.contains('$') {
        "USD"
    } else {
        return None;
    };
    Some(code.to_owned())
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;

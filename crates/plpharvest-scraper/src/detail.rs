//! Product detail pages (the second hop of two-hop mode).
//!
//! A detail page describes one product. It is read from schema.org JSON-LD
//! first, then from a `product` object in the page payloads. Whatever is
//! found only fills gaps in the listing record that led here.

use std::sync::LazyLock;

use plpharvest_core::{CanonicalProduct, ExtractionMethod};
use regex::Regex;
use serde_json::{Map, Value};

use crate::normalize::{normalize_product, stock_flag, SiteUrls};
use crate::parse_helpers::value_at_path;
use crate::payload::{extract_primary_payload, extract_secondary_payload, parse_json_two_stage};
use crate::types::RawProduct;

static LD_JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

const PAYLOAD_PRODUCT_PATHS: &[&[&str]] = &[
    &["product"],
    &["productDetails", "product"],
    &["props", "pageProps", "product"],
    &["props", "pageProps", "initialState", "product"],
];

/// Extracts the single product described by a detail page.
#[must_use]
pub fn extract_detail_product(markup: &str) -> Option<RawProduct> {
    if let Some(product) = jsonld_product(markup) {
        tracing::debug!("detail product from json-ld");
        return Some(product);
    }

    [extract_primary_payload(markup), extract_secondary_payload(markup)]
        .into_iter()
        .flatten()
        .find_map(|payload| {
            PAYLOAD_PRODUCT_PATHS
                .iter()
                .filter_map(|path| value_at_path(&payload, path))
                .find_map(|node| RawProduct::from_value(ExtractionMethod::PrimaryPayload, node.clone()))
        })
}

/// Fills the listing record's missing fields from a detail-page product.
///
/// `id`, `url`, `source_url` and `extraction_method` are never changed.
/// Stock is taken from the detail page only when it states it.
#[must_use]
pub fn merge_detail(
    listing: &CanonicalProduct,
    detail: &RawProduct,
    urls: &SiteUrls,
) -> CanonicalProduct {
    let found = normalize_product(detail, &listing.source_url, urls);
    let mut merged = listing.clone();

    fill(&mut merged.title, found.title);
    fill(&mut merged.brand, found.brand);
    fill(&mut merged.currency, found.currency);
    fill(&mut merged.price_value, found.price_value);
    fill(&mut merged.price_text, found.price_text);
    fill(&mut merged.original_price_value, found.original_price_value);
    fill(&mut merged.image_url, found.image_url);
    fill(&mut merged.color, found.color);
    fill(&mut merged.badge, found.badge);
    fill(&mut merged.description, found.description);

    if let Some(in_stock) = stock_flag(detail) {
        merged.is_in_stock = in_stock;
    }
    merged.is_marked_down = listing.is_marked_down
        || found.is_marked_down
        || matches!(
            (merged.original_price_value, merged.price_value),
            (Some(previous), Some(current)) if previous > current
        );
    merged
}

fn fill<T>(slot: &mut Option<T>, candidate: Option<T>) {
    if slot.is_none() {
        *slot = candidate;
    }
}

fn jsonld_product(markup: &str) -> Option<RawProduct> {
    LD_JSON_RE
        .captures_iter(markup)
        .filter_map(|cap| parse_json_two_stage(cap.get(1)?.as_str().trim()))
        .flat_map(jsonld_nodes)
        .find(is_product_node)
        .map(|node| jsonld_to_raw(&node))
}

/// Top-level object, array, or `@graph` container members.
fn jsonld_nodes(value: Value) -> Vec<Value> {
    let mut nodes = match value {
        Value::Array(items) => items,
        other => vec![other],
    };
    let graph: Vec<Value> = nodes
        .iter()
        .filter_map(|node| node.get("@graph").and_then(Value::as_array))
        .flatten()
        .cloned()
        .collect();
    nodes.extend(graph);
    nodes
}

fn is_product_node(node: &Value) -> bool {
    match node.get("@type") {
        Some(Value::String(t)) => t.eq_ignore_ascii_case("Product"),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t.eq_ignore_ascii_case("Product")),
        _ => false,
    }
}

/// Rewrites a schema.org `Product` into the keys the normalizer reads.
fn jsonld_to_raw(node: &Value) -> RawProduct {
    let mut fields = Map::new();
    let mut copy = |from: &str, to: &str| {
        if let Some(value) = node.get(from).filter(|v| !v.is_null()) {
            fields.insert(to.to_owned(), value.clone());
        }
    };
    copy("productID", "id");
    copy("sku", "productId");
    copy("name", "name");
    copy("brand", "brand");
    copy("description", "description");
    copy("image", "image");
    copy("color", "colour");
    copy("url", "url");

    let offer = match node.get("offers") {
        Some(Value::Array(offers)) => offers.first(),
        other => other,
    };
    if let Some(offer) = offer {
        if let Some(price) = offer.get("price").or_else(|| offer.get("lowPrice")) {
            fields.insert("price".to_owned(), price.clone());
        }
        if let Some(currency) = offer.get("priceCurrency") {
            fields.insert("currency".to_owned(), currency.clone());
        }
        if let Some(availability) = offer.get("availability").and_then(Value::as_str) {
            let in_stock = availability.ends_with("InStock") || availability.ends_with("LimitedAvailability");
            fields.insert("isInStock".to_owned(), Value::Bool(in_stock));
        }
    }

    RawProduct::new(ExtractionMethod::PrimaryPayload, fields)
}

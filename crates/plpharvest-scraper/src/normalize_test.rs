use plpharvest_core::ExtractionMethod;
use serde_json::json;

use super::*;

fn urls() -> SiteUrls {
    SiteUrls {
        site_base: "https://www.example.com".to_owned(),
        media_base: "https://images.example-media.com/products".to_owned(),
    }
}

fn raw(method: ExtractionMethod, value: Value) -> RawProduct {
    RawProduct::from_value(method, value).unwrap()
}

const SOURCE: &str = "https://www.example.com/search/?q=men";

// -----------------------------------------------------------------------
// API-shaped records
// -----------------------------------------------------------------------

fn api_record() -> RawProduct {
    raw(
        ExtractionMethod::Api,
        json!({
            "id": 204_561_234,
            "name": "DESIGN relaxed oxford shirt in white",
            "brandName": "DESIGN",
            "colour": "WHITE",
            "url": "design/design-relaxed-oxford-shirt/prd/204561234#colourWayId-1",
            "imageUrl": "images.example-media.com/products/design-shirt/204561234-1-white",
            "isSellingFast": false,
            "price": {
                "current": {"value": 22.0, "text": "£22.00"},
                "previous": {"value": 30.0, "text": "£30.00"},
                "rrp": {"value": null, "text": ""},
                "isMarkedDown": false,
                "currency": "GBP"
            }
        }),
    )
}

#[test]
fn numeric_id_becomes_string() {
    let product = normalize_product(&api_record(), SOURCE, &urls());
    assert_eq!(product.id, "204561234");
    assert!(product.has_identity());
}

#[test]
fn numeric_price_wins_and_text_is_kept() {
    let product = normalize_product(&api_record(), SOURCE, &urls());
    assert_eq!(product.price_value, Some(22.0));
    assert_eq!(product.price_text.as_deref(), Some("£22.00"));
    assert_eq!(product.original_price_value, Some(30.0));
    assert_eq!(product.currency.as_deref(), Some("GBP"));
}

#[test]
fn previous_above_current_marks_down_despite_false_flag() {
    let product = normalize_product(&api_record(), SOURCE, &urls());
    assert!(product.is_marked_down);
}

#[test]
fn relative_url_and_schemeless_image_are_absolutized() {
    let product = normalize_product(&api_record(), SOURCE, &urls());
    assert_eq!(
        product.url,
        "https://www.example.com/design/design-relaxed-oxford-shirt/prd/204561234#colourWayId-1"
    );
    assert_eq!(
        product.image_url.as_deref(),
        Some("https://images.example-media.com/products/design-shirt/204561234-1-white")
    );
}

#[test]
fn method_source_and_defaults_are_carried() {
    let product = normalize_product(&api_record(), SOURCE, &urls());
    assert_eq!(product.extraction_method, ExtractionMethod::Api);
    assert_eq!(product.source_url, SOURCE);
    assert!(product.is_in_stock);
    assert_eq!(product.brand.as_deref(), Some("DESIGN"));
    assert_eq!(product.color.as_deref(), Some("WHITE"));
    assert!(product.description.is_none());
}

// -----------------------------------------------------------------------
// Alternative key shapes
// -----------------------------------------------------------------------

#[test]
fn text_price_is_parsed_when_no_numeric_field() {
    let record = raw(
        ExtractionMethod::DomHeuristic,
        json!({"id": "9", "title": "Jeans", "priceText": "£1,049.50", "wasPrice": "£1,200.00"}),
    );
    let product = normalize_product(&record, SOURCE, &urls());
    assert_eq!(product.price_value, Some(1049.5));
    assert_eq!(product.original_price_value, Some(1200.0));
    assert_eq!(product.currency.as_deref(), Some("GBP"));
    assert!(product.is_marked_down);
}

#[test]
fn bare_numeric_price_and_explicit_flag() {
    let record = raw(
        ExtractionMethod::PrimaryPayload,
        json!({"productId": "77", "price": 15, "isMarkedDown": true, "inStock": false}),
    );
    let product = normalize_product(&record, SOURCE, &urls());
    assert_eq!(product.price_value, Some(15.0));
    assert!(product.price_text.is_none());
    assert!(product.is_marked_down);
    assert!(!product.is_in_stock);
}

#[test]
fn missing_url_falls_back_to_product_path() {
    let record = raw(ExtractionMethod::PrimaryPayload, json!({"id": 5}));
    let product = normalize_product(&record, SOURCE, &urls());
    assert_eq!(product.url, "https://www.example.com/prd/5");
}

#[test]
fn brand_object_image_array_and_badge_list() {
    let record = raw(
        ExtractionMethod::SecondaryPayload,
        json!({
            "id": "8",
            "productTitle": "Trainers",
            "brand": {"name": "Runner"},
            "images": [{"url": "//images.example-media.com/products/t/8-1?$XXL$"}],
            "badges": [{"text": "NEW"}, "MORE COLOURS", {"label": "NEW"}],
            "colourName": "Black"
        }),
    );
    let product = normalize_product(&record, SOURCE, &urls());
    assert_eq!(product.title.as_deref(), Some("Trainers"));
    assert_eq!(product.brand.as_deref(), Some("Runner"));
    assert_eq!(
        product.image_url.as_deref(),
        Some("https://images.example-media.com/products/t/8-1")
    );
    assert_eq!(product.badge.as_deref(), Some("NEW, MORE COLOURS"));
    assert_eq!(product.color.as_deref(), Some("Black"));
}

#[test]
fn relative_image_path_is_placed_under_media_base() {
    let record = raw(
        ExtractionMethod::PrimaryPayload,
        json!({"id": "3", "imageUrls": ["shirt/3-1-blue"]}),
    );
    let product = normalize_product(&record, SOURCE, &urls());
    assert_eq!(
        product.image_url.as_deref(),
        Some("https://images.example-media.com/products/shirt/3-1-blue")
    );
}

// -----------------------------------------------------------------------
// Totality
// -----------------------------------------------------------------------

#[test]
fn record_without_id_normalizes_to_empty_identity() {
    let record = raw(ExtractionMethod::DomHeuristic, json!({"name": "Mystery"}));
    let product = normalize_product(&record, SOURCE, &urls());
    assert!(!product.has_identity());
    assert!(product.url.is_empty());
    assert!(product.price_value.is_none());
    assert!(!product.is_marked_down);
}

#[test]
fn unparsable_price_text_stays_null() {
    let record = raw(
        ExtractionMethod::DomHeuristic,
        json!({"id": "1", "priceText": "Price on request"}),
    );
    let product = normalize_product(&record, SOURCE, &urls());
    assert!(product.price_value.is_none());
    assert_eq!(product.price_text.as_deref(), Some("Price on request"));
    assert!(product.currency.is_none());
}

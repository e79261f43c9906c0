use serde_json::json;

use super::*;

const SITE: &str = "https://www.example.com";

fn tile(id: u32, title: &str, price: &str) -> String {
    format!(
        r#"<article id="product-{id}" class="productTile_abc">
            <a class="productLink_x" href="/design/item/prd/{id}#colourWayId-1" aria-label="{title}, Price {price}">
                <div class="image_x"><img src="//images.example-media.com/products/item/{id}-1?$n_480w$" alt=""></div>
                <p class="productDescription_y">{title}</p>
                <p class="container_z"><span data-auto-id="productTilePrice" class="price_a">{price}</span></p>
            </a>
        </article>"#
    )
}

fn page(tiles: &[String]) -> String {
    format!(
        "<html><body><section>{}</section></body></html>",
        tiles.concat()
    )
}

// -----------------------------------------------------------------------
// Tile discovery
// -----------------------------------------------------------------------

#[test]
fn extracts_tiles_in_document_order() {
    let html = page(&[
        tile(101, "DESIGN oxford shirt in white", "£22.00"),
        tile(102, "Slim jeans in mid blue", "£35.00"),
    ]);
    let products = extract_from_markup(&html, SITE, 1);
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].fields["id"], json!("101"));
    assert_eq!(products[1].fields["id"], json!("102"));
    assert!(products
        .iter()
        .all(|p| p.method == ExtractionMethod::DomHeuristic));
}

#[test]
fn tile_without_product_link_is_skipped() {
    let html = page(&[
        r#"<article><a href="/help/delivery">Delivery info</a><span class="price">£5</span></article>"#
            .to_owned(),
        tile(7, "Tee", "£8.00"),
    ]);
    let products = extract_from_markup(&html, SITE, 1);
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].fields["id"], json!("7"));
}

#[test]
fn nested_tile_matches_are_deduplicated_by_url() {
    let html = page(&[format!(
        r#"<div data-testid="product-tile-wrapper">{}</div>"#,
        tile(55, "Hoodie", "£30.00")
    )]);
    assert_eq!(extract_from_markup(&html, SITE, 1).len(), 1);
}

#[test]
fn group_link_without_numeric_id_gets_page_scoped_placeholder() {
    let html = page(&[
        tile(1, "Shirt", "£10.00"),
        r#"<div class="product-tile"><a href="/grp/summer-edit">Summer edit</a></div>"#.to_owned(),
    ]);
    let products = extract_from_markup(&html, SITE, 4);
    assert_eq!(products.len(), 2);
    assert_eq!(products[1].fields["id"], json!("dom-p4-2"));
    assert_eq!(
        products[1].fields["url"],
        json!("https://www.example.com/grp/summer-edit")
    );
}

#[test]
fn markup_without_tiles_is_empty() {
    assert!(extract_from_markup("<html><body><p>No results</p></body></html>", SITE, 1).is_empty());
}

// -----------------------------------------------------------------------
// Field recovery
// -----------------------------------------------------------------------

#[test]
fn recovers_price_title_url_and_image() {
    let html = page(&[tile(101, "DESIGN oxford shirt in white", "£22.00")]);
    let product = &extract_from_markup(&html, SITE, 1)[0];
    assert_eq!(product.fields["priceText"], json!("£22.00"));
    assert_eq!(product.fields["name"], json!("DESIGN oxford shirt in white"));
    assert_eq!(
        product.fields["url"],
        json!("https://www.example.com/design/item/prd/101#colourWayId-1")
    );
    assert_eq!(
        product.fields["imageUrl"],
        json!("//images.example-media.com/products/item/101-1?$n_480w$")
    );
}

#[test]
fn previous_price_and_badges_are_collected() {
    let html = page(&[r#"<article>
        <a href="/x/prd/9"><h2>Bomber jacket in khaki</h2></a>
        <span data-testid="current-price">£40.00</span>
        <del>£60.00</del>
        <div class="badge_a">SELLING FAST</div>
        <div class="overlay_b">Selling fast</div>
        <div class="badge_c">MORE COLOURS</div>
    </article>"#
        .to_owned()]);
    let product = &extract_from_markup(&html, SITE, 1)[0];
    assert_eq!(product.fields["priceText"], json!("£40.00"));
    assert_eq!(product.fields["wasPrice"], json!("£60.00"));
    assert_eq!(product.fields["badges"], json!(["SELLING FAST", "MORE COLOURS"]));
}

#[test]
fn price_falls_back_to_tile_text() {
    let html = page(&[r#"<li class="product-tile">
        <a href="/x/prd/3">Runner trainers</a>
        <div>Now £1,250.00 only</div>
    </li>"#
        .to_owned()]);
    let product = &extract_from_markup(&html, SITE, 1)[0];
    assert_eq!(product.fields["priceText"], json!("£1,250.00"));
}

#[test]
fn aria_label_title_has_price_suffix_stripped() {
    let html = page(&[r#"<div data-auto-id="productTile">
        <a href="/x/prd/12" aria-label="Cargo trousers in stone, Price £32.00"></a>
    </div>"#
        .to_owned()]);
    let product = &extract_from_markup(&html, SITE, 1)[0];
    assert_eq!(product.fields["name"], json!("Cargo trousers in stone"));
    assert_eq!(product.fields["colour"], json!("stone"));
}

#[test]
fn lazy_image_uses_data_src_over_placeholder() {
    let html = page(&[r#"<article>
        <a href="/x/prd/4">Cap</a>
        <img src="data:image/gif;base64,R0lGOD" data-src="//cdn.example.com/cap.jpg">
    </article>"#
        .to_owned()]);
    let product = &extract_from_markup(&html, SITE, 1)[0];
    assert_eq!(product.fields["imageUrl"], json!("//cdn.example.com/cap.jpg"));
}

#[test]
fn sold_out_tile_is_marked_out_of_stock() {
    let html = page(&[r#"<article><a href="/x/prd/6">Scarf</a><span>Sold out</span></article>"#
        .to_owned()]);
    let product = &extract_from_markup(&html, SITE, 1)[0];
    assert_eq!(product.fields["isInStock"], json!(false));
}

// -----------------------------------------------------------------------
// Title heuristics
// -----------------------------------------------------------------------

#[test]
fn color_stops_at_material_and_punctuation() {
    assert_eq!(
        color_from_title("Relaxed shirt in washed black cotton").as_deref(),
        Some("washed black")
    );
    assert_eq!(
        color_from_title("3 pack T-shirts in black, white and grey").as_deref(),
        Some("black")
    );
    assert!(color_from_title("Skinny jeans").is_none());
    assert!(color_from_title("Shirt in linen").is_none());
}

#[test]
fn brand_is_leading_uppercase_tokens_or_nothing() {
    assert_eq!(
        brand_from_title("DESIGN STUDIO relaxed shirt").as_deref(),
        Some("DESIGN STUDIO")
    );
    assert!(brand_from_title("Relaxed shirt in white").is_none());
}

#[test]
fn price_suffix_variants() {
    assert_eq!(strip_price_suffix("Chinos - £25.00"), "Chinos");
    assert_eq!(strip_price_suffix("Chinos Now $19.99 Was $30"), "Chinos");
    assert_eq!(strip_price_suffix("Chinos"), "Chinos");
}

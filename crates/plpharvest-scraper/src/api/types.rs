//! Wire types for the listing search API.
//!
//! ## Observed shape
//!
//! `products` is an array of flat product objects (`id` numeric, `name`,
//! `brandName`, `colour`, `url` relative to the site root, `imageUrl`
//! without a scheme, `price.current.value`/`price.current.text`).
//! `itemCount` is the total across all pages. Keyword searches that map to
//! a category answer with `redirectUrl` and no products.

use serde::Deserialize;
use serde_json::Value;

/// Top-level search response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub products: Vec<Value>,
    #[serde(default)]
    pub item_count: Option<u64>,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

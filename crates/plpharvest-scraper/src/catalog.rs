//! Locates the products array and pagination block inside a parsed payload.
//!
//! Payload layouts drift between deployments, so each source carries an
//! ordered list of known path variants. The first path holding a non-empty
//! array wins; nothing found is an empty result, not an error.

use plpharvest_core::{ExtractionMethod, PaginationInfo};
use serde_json::Value;

use crate::parse_helpers::{value_as_u64, value_at_path};
use crate::types::RawProduct;

/// Ordered path variants for one payload source.
#[derive(Debug, Clone, Copy)]
pub struct PathSet {
    /// Paths to a products array, most specific first.
    pub products: &'static [&'static [&'static str]],
    /// Paths to a dedicated pagination object.
    pub pagination: &'static [&'static [&'static str]],
}

/// Catalog script block / global assignment on listing pages.
pub const PRIMARY_PATHS: PathSet = PathSet {
    products: &[
        &["listing", "products"],
        &["search", "products"],
        &["searchResults", "products"],
        &["props", "pageProps", "products"],
        &["pageProps", "products"],
        &["products"],
    ],
    pagination: &[
        &["listing", "pagination"],
        &["search", "pagination"],
        &["searchResults", "pagination"],
        &["props", "pageProps", "pagination"],
        &["pageProps", "pagination"],
        &["pagination"],
    ],
};

/// Framework hydration container (`__NEXT_DATA__`).
pub const SECONDARY_PATHS: PathSet = PathSet {
    products: &[
        &["props", "pageProps", "initialState", "search", "products"],
        &["props", "pageProps", "searchResult", "products"],
        &["props", "pageProps", "listing", "products"],
        &["props", "pageProps", "data", "products"],
        &["props", "pageProps", "products"],
    ],
    pagination: &[
        &["props", "pageProps", "initialState", "search", "pagination"],
        &["props", "pageProps", "searchResult", "pagination"],
        &["props", "pageProps", "listing", "pagination"],
        &["props", "pageProps", "pagination"],
    ],
};

const PAGE_KEYS: &[&str] = &["page", "currentPage", "pageNumber"];
const PAGE_SIZE_KEYS: &[&str] = &["pageSize", "limit", "perPage", "itemsPerPage"];
const TOTAL_PAGES_KEYS: &[&str] = &["totalPages", "pageCount", "numberOfPages"];
const TOTAL_RESULTS_KEYS: &[&str] = &["totalResults", "itemCount", "totalCount", "total"];

/// Returns the first non-empty products array found at `paths.products`,
/// wrapped as [`RawProduct`]s tagged with `method`.
///
/// Non-object entries in the array are skipped.
#[must_use]
pub fn locate_products(payload: &Value, paths: &PathSet, method: ExtractionMethod) -> Vec<RawProduct> {
    for path in paths.products {
        let Some(Value::Array(items)) = value_at_path(payload, path) else {
            continue;
        };
        let products: Vec<RawProduct> = items
            .iter()
            .filter_map(|item| RawProduct::from_value(method, item.clone()))
            .collect();
        if !products.is_empty() {
            tracing::debug!(path = %path.join("."), count = products.len(), "located products");
            return products;
        }
    }
    Vec::new()
}

/// Reads pagination metadata from a payload.
///
/// Looks at dedicated pagination objects first, then at the object that
/// holds the products array (search responses put `itemCount`/`offset`
/// next to `products`). `current_page` stands in when the block carries
/// totals but no page number or offset. Returns `None` when no pagination
/// field is present anywhere.
#[must_use]
pub fn locate_pagination(
    payload: &Value,
    paths: &PathSet,
    current_page: u32,
) -> Option<PaginationInfo> {
    let containers = paths.products.iter().filter_map(|path| {
        let (_, parent) = path.split_last()?;
        if parent.is_empty() {
            Some(payload)
        } else {
            value_at_path(payload, parent)
        }
    });

    paths
        .pagination
        .iter()
        .filter_map(|path| value_at_path(payload, path))
        .chain(containers)
        .find_map(|block| pagination_from_block(block, current_page))
}

fn first_u64(block: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| block.get(*key).and_then(value_as_u64))
}

fn pagination_from_block(block: &Value, current_page: u32) -> Option<PaginationInfo> {
    if !block.is_object() {
        return None;
    }

    let page = first_u64(block, PAGE_KEYS).and_then(|p| u32::try_from(p).ok());
    let page_size = first_u64(block, PAGE_SIZE_KEYS)
        .and_then(|s| u32::try_from(s).ok())
        .filter(|s| *s > 0);
    let mut total_pages = first_u64(block, TOTAL_PAGES_KEYS).and_then(|t| u32::try_from(t).ok());
    let total_results = first_u64(block, TOTAL_RESULTS_KEYS);
    let offset = block.get("offset").and_then(value_as_u64);

    if page.is_none() && page_size.is_none() && total_pages.is_none() && total_results.is_none() {
        return None;
    }

    let page = page
        .or_else(|| {
            let size = u64::from(page_size?);
            u32::try_from(offset? / size + 1).ok()
        })
        .unwrap_or(current_page)
        .max(1);

    if total_pages.is_none() {
        if let (Some(results), Some(size)) = (total_results, page_size) {
            total_pages = u32::try_from(results.div_ceil(u64::from(size))).ok();
        }
    }

    Some(PaginationInfo {
        page,
        page_size,
        total_pages,
        total_results,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn locate_products_first_non_empty_path_wins() {
        let payload = json!({
            "listing": {"products": []},
            "search": {"products": [{"id": 1}, {"id": 2}]},
            "products": [{"id": 99}]
        });
        let products = locate_products(&payload, &PRIMARY_PATHS, ExtractionMethod::PrimaryPayload);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].fields["id"], json!(1));
        assert_eq!(products[0].method, ExtractionMethod::PrimaryPayload);
    }

    #[test]
    fn locate_products_bare_top_level_array() {
        let payload = json!({"products": [{"id": "a"}]});
        let products = locate_products(&payload, &PRIMARY_PATHS, ExtractionMethod::PrimaryPayload);
        assert_eq!(products.len(), 1);
    }

    #[test]
    fn locate_products_skips_non_object_entries() {
        let payload = json!({"products": [1, "x", {"id": 3}, null]});
        let products = locate_products(&payload, &PRIMARY_PATHS, ExtractionMethod::PrimaryPayload);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].fields["id"], json!(3));
    }

    #[test]
    fn locate_products_nothing_found_is_empty() {
        let payload = json!({"other": {"items": [{"id": 1}]}});
        assert!(locate_products(&payload, &PRIMARY_PATHS, ExtractionMethod::PrimaryPayload).is_empty());
    }

    #[test]
    fn secondary_paths_find_hydration_products() {
        let payload = json!({"props": {"pageProps": {"searchResult": {"products": [{"id": 5}]}}}});
        let products =
            locate_products(&payload, &SECONDARY_PATHS, ExtractionMethod::SecondaryPayload);
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].method, ExtractionMethod::SecondaryPayload);
    }

    #[test]
    fn pagination_from_dedicated_block() {
        let payload = json!({
            "search": {
                "products": [{"id": 1}],
                "pagination": {"currentPage": 2, "pageSize": 72, "totalPages": 5, "totalResults": 350}
            }
        });
        let info = locate_pagination(&payload, &PRIMARY_PATHS, 1).unwrap();
        assert_eq!(
            info,
            PaginationInfo {
                page: 2,
                page_size: Some(72),
                total_pages: Some(5),
                total_results: Some(350),
            }
        );
    }

    #[test]
    fn pagination_from_container_offset_and_item_count() {
        let payload = json!({"products": [{"id": 1}], "itemCount": 150, "offset": 144, "limit": 72});
        let info = locate_pagination(&payload, &PRIMARY_PATHS, 1).unwrap();
        assert_eq!(info.page, 3);
        assert_eq!(info.page_size, Some(72));
        assert_eq!(info.total_pages, Some(3));
        assert_eq!(info.total_results, Some(150));
        assert!(info.is_last_page());
    }

    #[test]
    fn pagination_uses_current_page_when_block_has_only_totals() {
        let payload = json!({"pagination": {"totalPages": 9}});
        let info = locate_pagination(&payload, &PRIMARY_PATHS, 4).unwrap();
        assert_eq!(info.page, 4);
        assert_eq!(info.total_pages, Some(9));
    }

    #[test]
    fn pagination_absent_returns_none() {
        let payload = json!({"products": [{"id": 1}]});
        assert!(locate_pagination(&payload, &PRIMARY_PATHS, 1).is_none());
    }
}

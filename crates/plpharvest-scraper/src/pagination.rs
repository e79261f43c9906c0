//! Next-page decisions for listing pages.

use plpharvest_core::PaginationInfo;

use crate::urls::{query_param, with_page};

/// Page number carried by a listing URL's `page` parameter, defaulting to 1.
#[must_use]
pub fn page_from_url(url: &str) -> u32 {
    query_param(url, "page")
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(1)
        .max(1)
}

/// Pagination for a page: the extracted block when there is one, otherwise
/// the URL's page number with unknown totals.
#[must_use]
pub fn resolve_pagination(current_url: &str, extracted: Option<PaginationInfo>) -> PaginationInfo {
    extracted.unwrap_or_else(|| PaginationInfo::from_page(page_from_url(current_url)))
}

/// Computes the URL of the listing page after `current_url`.
///
/// Returns `None` when the page produced no products or when `pagination`
/// says the current page is the last one. Otherwise the `page` parameter of
/// `current_url` is set to `pagination.page + 1`.
#[must_use]
pub fn next_listing_url(
    current_url: &str,
    pagination: &PaginationInfo,
    products_on_page: usize,
) -> Option<String> {
    if products_on_page == 0 || pagination.is_last_page() {
        return None;
    }
    let next = pagination.page.checked_add(1)?;
    match with_page(current_url, next) {
        Ok(url) => Some(url),
        Err(err) => {
            tracing::warn!(url = current_url, error = %err, "cannot build next page url");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "https://www.example.com/search/?q=men&page=3";

    #[test]
    fn last_page_stops() {
        let info = PaginationInfo {
            total_pages: Some(3),
            ..PaginationInfo::from_page(3)
        };
        assert!(next_listing_url(LISTING, &info, 72).is_none());
    }

    #[test]
    fn unknown_total_increments_page() {
        let info = PaginationInfo::from_page(3);
        assert_eq!(
            next_listing_url(LISTING, &info, 10).as_deref(),
            Some("https://www.example.com/search/?q=men&page=4")
        );
    }

    #[test]
    fn empty_page_stops() {
        let info = PaginationInfo::from_page(1);
        assert!(next_listing_url(LISTING, &info, 0).is_none());
    }

    #[test]
    fn extracted_page_number_wins_over_url() {
        let info = PaginationInfo {
            total_pages: Some(10),
            ..PaginationInfo::from_page(5)
        };
        assert_eq!(
            next_listing_url(LISTING, &info, 1).as_deref(),
            Some("https://www.example.com/search/?q=men&page=6")
        );
    }

    #[test]
    fn page_from_url_defaults_to_one() {
        assert_eq!(page_from_url("https://www.example.com/search/?q=men"), 1);
        assert_eq!(page_from_url("https://www.example.com/search/?page=0"), 1);
        assert_eq!(page_from_url("https://www.example.com/search/?page=abc"), 1);
        assert_eq!(page_from_url(LISTING), 3);
    }

    #[test]
    fn resolve_pagination_falls_back_to_url() {
        assert_eq!(resolve_pagination(LISTING, None).page, 3);
        let extracted = PaginationInfo::from_page(7);
        assert_eq!(resolve_pagination(LISTING, Some(extracted)).page, 7);
    }
}

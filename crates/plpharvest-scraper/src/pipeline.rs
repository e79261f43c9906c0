//! The extraction waterfall for listing pages.
//!
//! Strategies run in the fixed order of [`WATERFALL`]; the first one that
//! returns a non-empty product list wins and the rest are never tried.

use plpharvest_core::{ExtractionMethod, HarvestConfig};

use crate::api::{ApiQuery, ListingApi};
use crate::catalog::{locate_pagination, locate_products, PathSet, PRIMARY_PATHS, SECONDARY_PATHS};
use crate::dom::extract_from_markup;
use crate::pagination::page_from_url;
use crate::payload::{extract_primary_payload, extract_secondary_payload};
use crate::types::{ExtractionResult, Miss};

/// Strategy order, most trusted first.
pub const WATERFALL: [ExtractionMethod; 4] = [
    ExtractionMethod::PrimaryPayload,
    ExtractionMethod::Api,
    ExtractionMethod::SecondaryPayload,
    ExtractionMethod::DomHeuristic,
];

/// Runs the waterfall over one listing page.
pub struct ExtractionPipeline<A> {
    api: A,
    site_base: String,
    keyword: String,
    sort: String,
}

impl<A: ListingApi> ExtractionPipeline<A> {
    #[must_use]
    pub fn new(api: A, site_base: &str, keyword: &str, sort: &str) -> Self {
        Self {
            api,
            site_base: site_base.to_owned(),
            keyword: keyword.to_owned(),
            sort: sort.to_owned(),
        }
    }

    #[must_use]
    pub fn from_config(api: A, config: &HarvestConfig) -> Self {
        Self::new(api, &config.site_base_url, &config.keyword, &config.sort_by)
    }

    /// Returns the first non-empty result, or `None` if every strategy
    /// missed.
    pub async fn run(&self, url: &str, markup: &str) -> Option<ExtractionResult> {
        for method in WATERFALL {
            match self.attempt(method, url, markup).await {
                Ok(result) => {
                    tracing::debug!(
                        url,
                        method = %result.method,
                        count = result.products.len(),
                        "extraction succeeded"
                    );
                    return Some(result);
                }
                Err(miss) => {
                    tracing::debug!(url, method = %method, reason = %miss, "extraction missed");
                }
            }
        }
        None
    }

    /// Runs a single strategy.
    ///
    /// # Errors
    ///
    /// Returns the [`Miss`] explaining why the strategy produced nothing.
    pub async fn attempt(
        &self,
        method: ExtractionMethod,
        url: &str,
        markup: &str,
    ) -> Result<ExtractionResult, Miss> {
        let page = page_from_url(url);
        match method {
            ExtractionMethod::PrimaryPayload => {
                let payload = extract_primary_payload(markup).ok_or(Miss::NoPayload)?;
                from_payload(&payload, &PRIMARY_PATHS, method, page)
            }
            ExtractionMethod::SecondaryPayload => {
                let payload = extract_secondary_payload(markup).ok_or(Miss::NoPayload)?;
                from_payload(&payload, &SECONDARY_PATHS, method, page)
            }
            ExtractionMethod::Api => {
                let query = ApiQuery::for_listing_url(url, &self.keyword, &self.sort);
                let listing = self.api.fetch_listing(&query).await;
                if listing.is_empty() {
                    return Err(Miss::ApiEmpty);
                }
                Ok(ExtractionResult {
                    method,
                    products: listing.products,
                    pagination: listing.pagination,
                })
            }
            ExtractionMethod::DomHeuristic => {
                let products = extract_from_markup(markup, &self.site_base, page);
                if products.is_empty() {
                    return Err(Miss::NoTiles);
                }
                Ok(ExtractionResult {
                    method,
                    products,
                    pagination: None,
                })
            }
        }
    }
}

fn from_payload(
    payload: &serde_json::Value,
    paths: &PathSet,
    method: ExtractionMethod,
    page: u32,
) -> Result<ExtractionResult, Miss> {
    let products = locate_products(payload, paths, method);
    if products.is_empty() {
        return Err(Miss::NoProducts);
    }
    Ok(ExtractionResult {
        method,
        products,
        pagination: locate_pagination(payload, paths, page),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::DisabledApi;

    const URL: &str = "https://www.example.com/search/?q=men&page=2";

    fn pipeline() -> ExtractionPipeline<DisabledApi> {
        ExtractionPipeline::new(DisabledApi, "https://www.example.com", "men", "pricedesc")
    }

    #[test]
    fn waterfall_order_is_fixed() {
        assert_eq!(
            WATERFALL,
            [
                ExtractionMethod::PrimaryPayload,
                ExtractionMethod::Api,
                ExtractionMethod::SecondaryPayload,
                ExtractionMethod::DomHeuristic,
            ]
        );
    }

    #[tokio::test]
    async fn primary_payload_wins_over_tiles() {
        let html = format!(
            r#"<script id="plp-state">{}</script><article><a href="/x/prd/9">Tile</a></article>"#,
            json!({"search": {"products": [{"id": 1}, {"id": 2}], "pagination": {"totalPages": 4}}})
        );
        let result = pipeline().run(URL, &html).await.unwrap();
        assert_eq!(result.method, ExtractionMethod::PrimaryPayload);
        assert_eq!(result.products.len(), 2);
        let pagination = result.pagination.unwrap();
        assert_eq!(pagination.page, 2);
        assert_eq!(pagination.total_pages, Some(4));
    }

    #[tokio::test]
    async fn empty_primary_payload_falls_through_to_secondary() {
        let html = format!(
            r#"<script id="plp-state">{}</script><script id="__NEXT_DATA__">{}</script>"#,
            json!({"products": []}),
            json!({"props": {"pageProps": {"products": [{"id": "s1"}]}}})
        );
        let result = pipeline().run(URL, &html).await.unwrap();
        assert_eq!(result.method, ExtractionMethod::SecondaryPayload);
        assert_eq!(result.products[0].fields["id"], json!("s1"));
    }

    #[tokio::test]
    async fn tiles_are_the_last_resort() {
        let html = r#"<article><a href="/x/prd/9">Tile</a></article>"#;
        let result = pipeline().run(URL, html).await.unwrap();
        assert_eq!(result.method, ExtractionMethod::DomHeuristic);
        assert!(result.pagination.is_none());
    }

    #[tokio::test]
    async fn nothing_anywhere_is_none() {
        assert!(pipeline().run(URL, "<html></html>").await.is_none());
    }

    #[tokio::test]
    async fn attempt_reports_each_miss() {
        let p = pipeline();
        let html = "<html></html>";
        assert_eq!(
            p.attempt(ExtractionMethod::PrimaryPayload, URL, html).await,
            Err(Miss::NoPayload)
        );
        assert_eq!(
            p.attempt(ExtractionMethod::Api, URL, html).await,
            Err(Miss::ApiEmpty)
        );
        assert_eq!(
            p.attempt(ExtractionMethod::DomHeuristic, URL, html).await,
            Err(Miss::NoTiles)
        );
    }
}

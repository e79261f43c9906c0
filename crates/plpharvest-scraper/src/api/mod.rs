//! Client for the site's internal listing search API.
//!
//! The API is the second waterfall strategy and is independent of page
//! markup: it is addressed by keyword or category id plus a 0-based page
//! index. Any transport failure, non-2xx status or malformed body degrades
//! to an empty listing at the [`ListingApi`] seam after bounded retries.

mod types;

use std::future::Future;
use std::time::Duration;

use plpharvest_core::{ExtractionMethod, HarvestConfig, PaginationInfo};
use reqwest::Client;

use crate::error::ScraperError;
use crate::pagination::page_from_url;
use crate::rate_limit::retry_with_backoff;
use crate::types::RawProduct;
use crate::urls::query_param;

pub use types::SearchResponse;

/// Fixed page size requested from the API.
pub const API_PAGE_SIZE: u32 = 72;

const STORE: &str = "COM";
const LANG: &str = "en-GB";
const CURRENCY: &str = "GBP";
const COUNTRY: &str = "GB";

/// What to ask the API for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiQuery {
    pub keyword: Option<String>,
    /// Category id; selects the category endpoint instead of keyword search.
    pub category_id: Option<String>,
    /// 0-based page index.
    pub page_index: u32,
    pub sort: Option<String>,
}

impl ApiQuery {
    /// Derives the query for a listing URL: `q` and `cid` come from the URL,
    /// the page index from its `page` parameter. `fallback_keyword` is used
    /// when the URL names neither a keyword nor a category.
    #[must_use]
    pub fn for_listing_url(url: &str, fallback_keyword: &str, sort: &str) -> Self {
        let category_id = query_param(url, "cid");
        let keyword = query_param(url, "q").or_else(|| {
            let fallback = fallback_keyword.trim();
            (category_id.is_none() && !fallback.is_empty()).then(|| fallback.to_owned())
        });
        let sort = query_param(url, "sort")
            .or_else(|| (!sort.trim().is_empty()).then(|| sort.trim().to_owned()));
        Self {
            keyword,
            category_id,
            page_index: page_from_url(url) - 1,
            sort,
        }
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page_index) * u64::from(API_PAGE_SIZE)
    }
}

/// Products and authoritative pagination from one API call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiListing {
    pub products: Vec<RawProduct>,
    pub pagination: Option<PaginationInfo>,
}

impl ApiListing {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// The listing API as seen by the extraction pipeline.
///
/// Implementations never fail: errors are logged and reported as an empty
/// listing so the waterfall can move on.
pub trait ListingApi: Send + Sync {
    fn fetch_listing(&self, query: &ApiQuery) -> impl Future<Output = ApiListing> + Send;
}

/// A [`ListingApi`] that always answers with nothing. Used when the API
/// strategy is switched off and in tests that only exercise page markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledApi;

impl ListingApi for DisabledApi {
    async fn fetch_listing(&self, _query: &ApiQuery) -> ApiListing {
        ApiListing::default()
    }
}

/// HTTP client for the listing search API.
///
/// 429 responses, network failures and 5xx statuses are retried with
/// exponential backoff up to `max_retries` additional attempts.
pub struct ListingApiClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl ListingApiClient {
    /// Creates a client with a request timeout, `User-Agent`, and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(10)))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            max_retries,
            backoff_base_secs,
        })
    }

    /// Builds a client from the run configuration.
    ///
    /// # Errors
    ///
    /// See [`ListingApiClient::new`].
    pub fn from_config(config: &HarvestConfig) -> Result<Self, ScraperError> {
        Self::new(
            &config.api_base_url,
            config.api_timeout_secs,
            &config.user_agent,
            config.api_max_retries,
            config.api_retry_backoff_base_secs,
        )
    }

    fn endpoint(&self, query: &ApiQuery) -> String {
        match query.category_id.as_deref() {
            Some(cid) => format!("{}/categories/{cid}", self.base_url),
            None => format!("{}/", self.base_url),
        }
    }

    fn params(query: &ApiQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("offset", query.offset().to_string()),
            ("limit", API_PAGE_SIZE.to_string()),
            ("store", STORE.to_owned()),
            ("lang", LANG.to_owned()),
            ("currency", CURRENCY.to_owned()),
            ("country", COUNTRY.to_owned()),
        ];
        if query.category_id.is_none() {
            if let Some(keyword) = &query.keyword {
                params.push(("q", keyword.clone()));
            }
        }
        if let Some(sort) = &query.sort {
            params.push(("sort", sort.clone()));
        }
        params
    }

    /// Fetches one page of listing results, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`]: HTTP 429 after all retries.
    /// - [`ScraperError::UnexpectedStatus`]: any other non-2xx status.
    /// - [`ScraperError::Http`]: network failure or timeout after all retries.
    /// - [`ScraperError::Deserialize`]: the body is not the expected JSON.
    pub async fn fetch_listing_page(&self, query: &ApiQuery) -> Result<ApiListing, ScraperError> {
        let url = self.endpoint(query);
        let params = Self::params(query);

        let response = retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            let params = &params;
            async move {
                let response = self.client.get(&url).query(params).send().await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.trim().parse::<u64>().ok())
                        .unwrap_or(0);
                    return Err(ScraperError::RateLimited {
                        url,
                        retry_after_secs,
                    });
                }
                if !status.is_success() {
                    return Err(ScraperError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<SearchResponse>(&body).map_err(|e| {
                    ScraperError::Deserialize {
                        context: format!("listing search response from {url}"),
                        source: e,
                    }
                })
            }
        })
        .await?;

        if response.products.is_empty() {
            if let Some(redirect) = &response.redirect_url {
                tracing::debug!(redirect, "listing api answered with a redirect only");
            }
        }

        Ok(listing_from_response(query, response))
    }
}

impl ListingApi for ListingApiClient {
    async fn fetch_listing(&self, query: &ApiQuery) -> ApiListing {
        match self.fetch_listing_page(query).await {
            Ok(listing) => listing,
            Err(err) => {
                tracing::warn!(
                    keyword = query.keyword.as_deref().unwrap_or_default(),
                    category = query.category_id.as_deref().unwrap_or_default(),
                    page_index = query.page_index,
                    error = %err,
                    "listing api unavailable, continuing without it"
                );
                ApiListing::default()
            }
        }
    }
}

/// The API's own counters are exact, so its pagination is built from the
/// query offset and `itemCount` rather than guessed from the page URL.
fn listing_from_response(query: &ApiQuery, response: SearchResponse) -> ApiListing {
    let products: Vec<RawProduct> = response
        .products
        .into_iter()
        .filter_map(|value| RawProduct::from_value(ExtractionMethod::Api, value))
        .collect();

    let total_pages = response
        .item_count
        .and_then(|count| u32::try_from(count.div_ceil(u64::from(API_PAGE_SIZE))).ok());
    let pagination = PaginationInfo {
        page: query.page_index.saturating_add(1),
        page_size: Some(API_PAGE_SIZE),
        total_pages,
        total_results: response.item_count,
    };

    ApiListing {
        products,
        pagination: Some(pagination),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn query_reads_keyword_and_page_from_url() {
        let query = ApiQuery::for_listing_url(
            "https://www.example.com/search/?q=black+jeans&page=3",
            "men",
            "pricedesc",
        );
        assert_eq!(query.keyword.as_deref(), Some("black jeans"));
        assert_eq!(query.page_index, 2);
        assert_eq!(query.offset(), 144);
        assert_eq!(query.sort.as_deref(), Some("pricedesc"));
        assert!(query.category_id.is_none());
    }

    #[test]
    fn query_falls_back_to_configured_keyword() {
        let query = ApiQuery::for_listing_url("https://www.example.com/men/", "men", "");
        assert_eq!(query.keyword.as_deref(), Some("men"));
        assert_eq!(query.page_index, 0);
        assert!(query.sort.is_none());
    }

    #[test]
    fn category_url_selects_category_endpoint() {
        let query = ApiQuery::for_listing_url(
            "https://www.example.com/men/jeans/cat/?cid=4208&sort=priceasc",
            "men",
            "pricedesc",
        );
        assert_eq!(query.category_id.as_deref(), Some("4208"));
        assert!(query.keyword.is_none());
        assert_eq!(query.sort.as_deref(), Some("priceasc"));

        let client = ListingApiClient::new("https://api.test/v2/", 5, "test", 0, 0).unwrap();
        assert_eq!(client.endpoint(&query), "https://api.test/v2/categories/4208");
        let params = ListingApiClient::params(&query);
        assert!(params.iter().all(|(key, _)| *key != "q"));
    }

    #[test]
    fn pagination_is_derived_from_item_count() {
        let query = ApiQuery {
            keyword: Some("men".to_owned()),
            category_id: None,
            page_index: 1,
            sort: None,
        };
        let response: SearchResponse = serde_json::from_value(json!({
            "products": [{"id": 1}, {"id": 2}, "junk"],
            "itemCount": 145
        }))
        .unwrap();
        let listing = listing_from_response(&query, response);
        assert_eq!(listing.products.len(), 2);
        assert_eq!(listing.products[0].method, ExtractionMethod::Api);
        assert_eq!(
            listing.pagination,
            Some(PaginationInfo {
                page: 2,
                page_size: Some(72),
                total_pages: Some(3),
                total_results: Some(145),
            })
        );
    }
}
